//! Match scorer: (profile, posting) -> score + explanation
//!
//! Pure and total: a missing profile field degrades the relevant component
//! score to 0 instead of erroring. Posting-side gaps (no salary range, no
//! required level) score a neutral 50 for that component.

use std::collections::HashSet;

use crate::config::MatchWeights;
use crate::error::EngineResult;
use shared::{
    CandidateProfile, ComponentScores, JobPosting, MatchQuality, MatchResult,
};

/// Skill synonym groups: mentioning any member implies the whole group.
const SKILL_SYNONYMS: &[(&str, &[&str])] = &[
    ("javascript", &["js", "node.js", "nodejs", "react", "angular", "vue"]),
    ("python", &["django", "flask", "fastapi", "pandas", "numpy"]),
    ("java", &["spring", "hibernate", "maven", "gradle"]),
    ("sql", &["mysql", "postgresql", "sqlite", "oracle"]),
    ("aws", &["amazon web services", "ec2", "s3", "lambda"]),
    ("docker", &["containerization", "kubernetes", "k8s"]),
    ("machine learning", &["ml", "deep learning", "tensorflow", "pytorch"]),
    ("frontend", &["front-end", "ui", "css", "html", "sass"]),
    ("backend", &["back-end", "server-side", "api", "microservices"]),
    ("devops", &["ci/cd", "jenkins", "terraform", "github actions"]),
];

/// Preferred skills count at half the weight of required ones.
const PREFERRED_WEIGHT: f64 = 0.5;

/// Component score when the posting carries no data for that component.
const NEUTRAL_SCORE: f64 = 50.0;

/// Scores job postings against a candidate profile
#[derive(Debug, Clone)]
pub struct MatchEngine {
    weights: MatchWeights,
}

impl MatchEngine {
    pub fn new(weights: MatchWeights) -> EngineResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Score one (profile, posting) pair. Never fails.
    pub fn score(&self, profile: &CandidateProfile, posting: &JobPosting) -> MatchResult {
        let components = ComponentScores {
            skills: skills_score(profile, posting),
            experience: experience_score(profile, posting),
            location: location_score(profile, posting),
            salary: salary_score(profile, posting),
        };

        let overall = self.weights.skills * components.skills
            + self.weights.experience * components.experience
            + self.weights.location * components.location
            + self.weights.salary * components.salary;
        let overall = overall.clamp(0.0, 100.0);

        MatchResult {
            overall_score: overall,
            components,
            factors: explain(&components),
            quality: MatchQuality::from_score(overall),
        }
    }

    /// Score a batch of postings and return the best matches, highest first.
    pub fn rank_jobs(
        &self,
        profile: &CandidateProfile,
        postings: &[JobPosting],
        limit: usize,
    ) -> Vec<(JobPosting, MatchResult)> {
        let mut ranked: Vec<(JobPosting, MatchResult)> = postings
            .iter()
            .map(|posting| (posting.clone(), self.score(profile, posting)))
            .collect();

        ranked.sort_by(|a, b| {
            b.1.overall_score
                .partial_cmp(&a.1.overall_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(limit);
        ranked
    }
}

/// Expand one skill into its synonym group (lowercased).
fn expand_one(skill: &str) -> HashSet<String> {
    let normalized = skill.trim().to_lowercase();
    let mut expanded = HashSet::new();
    expanded.insert(normalized.clone());

    for (main, synonyms) in SKILL_SYNONYMS {
        if normalized == *main || synonyms.contains(&normalized.as_str()) {
            expanded.insert((*main).to_string());
            expanded.extend(synonyms.iter().map(|s| (*s).to_string()));
        }
    }
    expanded
}

fn expand_all(skills: &[String]) -> HashSet<String> {
    skills.iter().flat_map(|s| expand_one(s)).collect()
}

/// Weighted overlap of synonym-expanded skill sets.
///
/// Monotone: adding a matched skill to the profile never lowers the score.
fn skills_score(profile: &CandidateProfile, posting: &JobPosting) -> f64 {
    if profile.skills.is_empty() {
        return 0.0;
    }
    let n_required = posting.required_skills.len();
    let n_preferred = posting.preferred_skills.len();
    if n_required == 0 && n_preferred == 0 {
        return NEUTRAL_SCORE;
    }

    let candidate = expand_all(&profile.skills);
    let matched = |skill: &String| !expand_one(skill).is_disjoint(&candidate);

    let matched_required = posting.required_skills.iter().filter(|s| matched(s)).count();
    let matched_preferred = posting.preferred_skills.iter().filter(|s| matched(s)).count();

    let hit = matched_required as f64 + PREFERRED_WEIGHT * matched_preferred as f64;
    let total = n_required as f64 + PREFERRED_WEIGHT * n_preferred as f64;
    100.0 * hit / total
}

/// Distance between experience bands: exact = 100, one off = 50, else 0.
fn experience_score(profile: &CandidateProfile, posting: &JobPosting) -> f64 {
    let required = match posting.experience_level {
        Some(level) => level,
        None => return NEUTRAL_SCORE,
    };
    let candidate = match profile.experience_level {
        Some(level) => level,
        None => return 0.0,
    };

    match (candidate.rank() - required.rank()).abs() {
        0 => 100.0,
        1 => 50.0,
        _ => 0.0,
    }
}

/// 100 when remote-eligible or co-located, decaying linearly to 0 at the
/// radius boundary.
fn location_score(profile: &CandidateProfile, posting: &JobPosting) -> f64 {
    let job_location = match &posting.location {
        Some(location) => location,
        None => return NEUTRAL_SCORE,
    };
    let prefs = match &profile.location {
        Some(prefs) => prefs,
        None => return 0.0,
    };

    if job_location.remote && prefs.remote_ok {
        return 100.0;
    }

    let (job_lat, job_lon) = match (job_location.latitude, job_location.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return 0.0,
    };
    if prefs.radius_km <= 0.0 {
        return 0.0;
    }

    let distance = haversine_km(prefs.latitude, prefs.longitude, job_lat, job_lon);
    if distance >= prefs.radius_km {
        0.0
    } else {
        100.0 * (1.0 - distance / prefs.radius_km)
    }
}

/// 100 when the posting range contains the candidate's minimum; partial
/// overlap scores the covered share of the posting range; disjoint below the
/// minimum scores 0.
fn salary_score(profile: &CandidateProfile, posting: &JobPosting) -> f64 {
    let range = match posting.salary {
        Some(range) => range,
        None => return NEUTRAL_SCORE,
    };
    let minimum = match profile.salary_min {
        Some(minimum) => minimum,
        None => return 0.0,
    };

    if range.max < minimum {
        return 0.0;
    }
    if minimum <= range.min {
        return 100.0;
    }
    // minimum falls inside the range: score the share at or above it
    let span = (range.max - range.min) as f64;
    if span <= 0.0 {
        return 100.0;
    }
    100.0 * (range.max - minimum) as f64 / span
}

/// Great-circle distance in kilometres.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Human-readable contributing factors, strongest signal first.
fn explain(components: &ComponentScores) -> Vec<String> {
    let mut factors = Vec::with_capacity(4);

    factors.push(if components.skills >= 80.0 {
        "Skills are an excellent match for the role's requirements".to_string()
    } else if components.skills >= 60.0 {
        "Skills align with most of the job requirements".to_string()
    } else if components.skills >= 40.0 {
        "Some relevant skills, with gaps against the requirements".to_string()
    } else {
        "Required skills do not closely match the current skillset".to_string()
    });

    factors.push(if components.experience >= 100.0 {
        "Experience level matches the position exactly".to_string()
    } else if components.experience >= 50.0 {
        "Experience is within one level of the position".to_string()
    } else {
        "Experience level is a significant mismatch".to_string()
    });

    factors.push(if components.location >= 90.0 {
        "Location is ideal for the stated preferences".to_string()
    } else if components.location >= 50.0 {
        "Location is workable but may require commuting".to_string()
    } else {
        "Location may not be convenient".to_string()
    });

    factors.push(if components.salary >= 100.0 {
        "Posted salary range meets the minimum expectation".to_string()
    } else if components.salary >= 50.0 {
        "Posted salary range partially covers the minimum expectation".to_string()
    } else {
        "Posted salary falls short of the minimum expectation".to_string()
    });

    factors
}
