use super::{sample_posting, sample_profile};
use crate::config::MatchWeights;
use crate::core::matching::MatchEngine;
use shared::{ExperienceLevel, JobId, MatchQuality, SalaryRange};

fn engine() -> MatchEngine {
    MatchEngine::new(MatchWeights::default()).unwrap()
}

#[test]
fn test_full_match_scores_excellent() {
    // Arrange
    let profile = sample_profile();
    let posting = sample_posting();

    // Act
    let result = engine().score(&profile, &posting);

    // Assert: all four components are perfect for this pair
    assert_eq!(result.components.skills, 100.0);
    assert_eq!(result.components.experience, 100.0);
    assert_eq!(result.components.location, 100.0);
    assert_eq!(result.components.salary, 100.0);
    assert_eq!(result.overall_score, 100.0);
    assert_eq!(result.quality, MatchQuality::Excellent);
    assert_eq!(result.factors.len(), 4);
}

#[test]
fn test_synonyms_bridge_skill_names() {
    // Arrange: profile says "react", posting requires "javascript"
    let mut profile = sample_profile();
    profile.skills = vec!["react".to_string()];
    let mut posting = sample_posting();
    posting.required_skills = vec!["javascript".to_string()];
    posting.preferred_skills.clear();

    // Act
    let result = engine().score(&profile, &posting);

    // Assert
    assert_eq!(result.components.skills, 100.0);
}

#[test]
fn test_adding_matched_skill_never_lowers_overall_score() {
    // Arrange: profile covers one of the posting's two required skills
    let engine = engine();
    let mut profile = sample_profile();
    profile.skills = vec!["python".to_string()];
    let posting = sample_posting();
    let base = engine.score(&profile, &posting).overall_score;

    // Act: cover the second required skill as well
    profile.skills.push("sql".to_string());
    let improved = engine.score(&profile, &posting).overall_score;

    // Assert: the extra match can only help
    assert!(improved >= base);
    assert!(improved > base, "covering a required skill must raise the score");

    // Adding a skill the posting never mentions changes nothing
    profile.skills.push("basket weaving".to_string());
    let unrelated = engine.score(&profile, &posting).overall_score;
    assert_eq!(unrelated, improved);
}

#[test]
fn test_empty_profile_skills_score_zero() {
    let mut profile = sample_profile();
    profile.skills.clear();

    let result = engine().score(&profile, &sample_posting());

    assert_eq!(result.components.skills, 0.0);
}

#[test]
fn test_preferred_skills_weigh_half() {
    // Arrange: one required hit, preferred miss
    let mut profile = sample_profile();
    profile.skills = vec!["python".to_string()];
    let mut posting = sample_posting();
    posting.required_skills = vec!["python".to_string()];
    posting.preferred_skills = vec!["golang".to_string()];

    let result = engine().score(&profile, &posting);

    // 100 * 1 / (1 + 0.5)
    assert!((result.components.skills - 66.666).abs() < 0.01);
}

#[test]
fn test_posting_gaps_score_neutral_and_profile_gaps_score_zero() {
    // Posting without salary data: neutral
    let mut posting = sample_posting();
    posting.salary = None;
    let neutral = engine().score(&sample_profile(), &posting);
    assert_eq!(neutral.components.salary, 50.0);

    // Profile without a salary floor: zero
    let mut profile = sample_profile();
    profile.salary_min = None;
    let zero = engine().score(&profile, &sample_posting());
    assert_eq!(zero.components.salary, 0.0);
}

#[test]
fn test_experience_one_band_off_scores_half() {
    let mut posting = sample_posting();
    posting.experience_level = Some(ExperienceLevel::Lead);

    let result = engine().score(&sample_profile(), &posting);

    assert_eq!(result.components.experience, 50.0);
}

#[test]
fn test_experience_two_bands_off_scores_zero() {
    let mut posting = sample_posting();
    posting.experience_level = Some(ExperienceLevel::Entry);

    let result = engine().score(&sample_profile(), &posting);

    assert_eq!(result.components.experience, 0.0);
}

#[test]
fn test_onsite_outside_radius_scores_zero() {
    // Arrange: on-site posting in New York, candidate anchored to SF
    let mut posting = sample_posting();
    if let Some(loc) = posting.location.as_mut() {
        loc.remote = false;
        loc.latitude = Some(40.7128);
        loc.longitude = Some(-74.0060);
    }

    let result = engine().score(&sample_profile(), &posting);

    assert_eq!(result.components.location, 0.0);
}

#[test]
fn test_onsite_nearby_decays_with_distance() {
    // Oakland is roughly 13 km from the SF anchor; inside the 50 km radius
    let mut posting = sample_posting();
    if let Some(loc) = posting.location.as_mut() {
        loc.remote = false;
        loc.latitude = Some(37.8044);
        loc.longitude = Some(-122.2712);
    }

    let result = engine().score(&sample_profile(), &posting);

    assert!(result.components.location > 50.0);
    assert!(result.components.location < 100.0);
}

#[test]
fn test_salary_partial_overlap() {
    // Floor of 150k inside a 130-160k range covers a third of the span
    let mut profile = sample_profile();
    profile.salary_min = Some(150_000);

    let result = engine().score(&profile, &sample_posting());

    assert!((result.components.salary - 33.333).abs() < 0.01);
}

#[test]
fn test_salary_below_floor_scores_zero() {
    let mut posting = sample_posting();
    posting.salary = Some(SalaryRange {
        min: 80_000,
        max: 100_000,
    });

    let result = engine().score(&sample_profile(), &posting);

    assert_eq!(result.components.salary, 0.0);
}

#[test]
fn test_rank_jobs_orders_and_truncates() {
    // Arrange: one perfect posting, one with no skill overlap
    let profile = sample_profile();
    let good = sample_posting();
    let mut bad = sample_posting();
    bad.id = JobId::new("job-200");
    bad.required_skills = vec!["cobol".to_string()];
    bad.preferred_skills.clear();

    // Act
    let ranked = engine().rank_jobs(&profile, &[bad.clone(), good.clone()], 1);

    // Assert: best first, limit applied
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].0.id, good.id);
}

#[test]
fn test_invalid_weights_rejected() {
    let weights = MatchWeights {
        skills: 0.9,
        experience: 0.3,
        location: 0.1,
        salary: 0.1,
    };
    assert!(MatchEngine::new(weights).is_err());
}
