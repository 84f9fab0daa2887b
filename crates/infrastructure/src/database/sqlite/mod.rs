mod execution_repository;
mod invalid_link_repository;
mod statistics_repository;
mod submission_repository;
mod task_repository;

#[cfg(test)]
mod repository_tests;

pub use execution_repository::SqliteTaskExecutionRepository;
pub use invalid_link_repository::SqliteInvalidLinkRepository;
pub use statistics_repository::SqliteStatisticsRepository;
pub use submission_repository::SqliteSubmissionRepository;
pub use task_repository::SqliteScheduledTaskRepository;
