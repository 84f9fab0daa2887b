pub mod entities;
pub mod links;
pub mod partition;
pub mod platform;
pub mod ports;
pub mod repositories;
pub mod schedule;
pub mod services;
pub mod sqlx_impls;

pub use entities::{
    CheckedLink, ExecutionStatus, InvalidLink, LinkStatus, ScheduledTask, SubmissionRecord,
    SubmissionSource, SubmissionStatus, TaskExecution, TaskStatus,
};
pub use links::{parse_batch, NormalizedBatch};
pub use partition::{classify_batch, partition, ClassifiedLink, SubmissionPartition};
pub use platform::Platform;
pub use schedule::CronPlanner;
