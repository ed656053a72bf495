pub mod fixtures;
pub mod model;
pub mod registry;

pub use fixtures::{TaskFixture, families, fixture};
pub use model::{Attachment, EvaluationRecord, EvaluationStatus, Submission, TaskRecord, TaskRequest};
pub use registry::{Completion, RegistryConfig, TaskRegistry};
