mod execution;
mod runner;
mod scheduled_task;
mod statistics;
mod submission;

#[cfg(test)]
pub(crate) mod test_support;

pub use execution::ExecutionRecorder;
pub use runner::{RunMode, TaskRunner};
pub use scheduled_task::{NewTask, ScheduledTaskService, TaskUpdate};
pub use statistics::{PlatformInvalidCount, StatisticsOverview, StatisticsService};
pub use submission::SubmissionService;
