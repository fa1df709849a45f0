//! Service implementations
//!
//! Real implementations of the collaborator traits: durable queue backing,
//! profile and posting suppliers, a scripted automation driver for local
//! runs, and a logging notifier.

pub mod driver;
pub mod job_source;
pub mod notifier;
pub mod profile_store;
pub mod queue_store;
pub mod repository;

// Re-export all service implementations
pub use driver::ScriptedDriver;
pub use job_source::StaticJobSource;
pub use notifier::LogNotifier;
pub use profile_store::InMemoryProfileStore;
pub use queue_store::{BulkEnqueueReport, QueueStore};
pub use repository::{FileQueueRepository, MemoryQueueRepository};
