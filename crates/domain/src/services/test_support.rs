//! 服务层测试用的内存仓储和桩实现

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pancheck_core::{PanCheckError, PanCheckResult};

use crate::entities::{InvalidLink, ScheduledTask, SubmissionRecord, TaskExecution};
use crate::partition::ClassifiedLink;
use crate::platform::Platform;
use crate::ports::{BatchOutcome, LinkValidator, SourceFetcher};
use crate::repositories::{
    InvalidLinkRepository, PageQuery, ScheduledTaskRepository, SubmissionRepository,
    TaskExecutionRepository, TaskFilter,
};

fn page_slice<T: Clone>(items: &[T], page: &PageQuery) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let slice = items
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    (slice, total)
}

#[derive(Default)]
pub struct InMemorySubmissions {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl InMemorySubmissions {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissions {
    async fn create(&self, record: &SubmissionRecord) -> PanCheckResult<SubmissionRecord> {
        let mut records = self.records.lock().unwrap();
        let mut stored = record.clone();
        stored.id = records.len() as i64 + 1;
        records.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &SubmissionRecord) -> PanCheckResult<()> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(PanCheckError::submission_not_found(record.id)),
        }
    }

    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<SubmissionRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list(&self, page: &PageQuery) -> PanCheckResult<(Vec<SubmissionRecord>, i64)> {
        Ok(page_slice(&self.records.lock().unwrap(), page))
    }
}

#[derive(Default)]
pub struct InMemoryInvalidLinks {
    links: Mutex<Vec<InvalidLink>>,
}

impl InMemoryInvalidLinks {
    pub fn len(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn seed(&self, link: InvalidLink) {
        self.links.lock().unwrap().push(link);
    }
}

#[async_trait]
impl InvalidLinkRepository for InMemoryInvalidLinks {
    async fn find_by_urls(&self, urls: &[String]) -> PanCheckResult<Vec<InvalidLink>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| urls.contains(&l.url))
            .cloned()
            .collect())
    }

    async fn upsert_many(&self, links: &[InvalidLink]) -> PanCheckResult<()> {
        let mut stored = self.links.lock().unwrap();
        for link in links {
            stored.retain(|l| l.url != link.url);
            let mut entry = link.clone();
            entry.id = stored.len() as i64 + 1;
            stored.push(entry);
        }
        Ok(())
    }

    async fn list_rate_limited(
        &self,
        platform: Option<Platform>,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<InvalidLink>, i64)> {
        let links = self.links.lock().unwrap();
        let filtered: Vec<InvalidLink> = links
            .iter()
            .filter(|l| l.is_rate_limited)
            .filter(|l| platform.map_or(true, |p| l.platform == p))
            .cloned()
            .collect();
        Ok(page_slice(&filtered, page))
    }

    async fn delete_rate_limited(&self) -> PanCheckResult<u64> {
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|l| !l.is_rate_limited);
        Ok((before - links.len()) as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> PanCheckResult<u64> {
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|l| l.created_at >= cutoff);
        Ok((before - links.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryTasks {
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl InMemoryTasks {
    pub fn seed(&self, task: ScheduledTask) -> i64 {
        let mut tasks = self.tasks.lock().unwrap();
        let mut stored = task;
        stored.id = tasks.len() as i64 + 1;
        let id = stored.id;
        tasks.push(stored);
        id
    }

    pub fn get(&self, id: i64) -> Option<ScheduledTask> {
        self.tasks.lock().unwrap().iter().find(|t| t.id == id).cloned()
    }
}

#[async_trait]
impl ScheduledTaskRepository for InMemoryTasks {
    async fn create(&self, task: &ScheduledTask) -> PanCheckResult<ScheduledTask> {
        let mut tasks = self.tasks.lock().unwrap();
        let mut stored = task.clone();
        stored.id = tasks.len() as i64 + 1;
        tasks.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, task: &ScheduledTask) -> PanCheckResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(PanCheckError::task_not_found(task.id)),
        }
    }

    async fn delete(&self, id: i64) -> PanCheckResult<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() < before)
    }

    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<ScheduledTask>> {
        Ok(self.get(id))
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> PanCheckResult<bool> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.name == name && Some(t.id) != exclude_id))
    }

    async fn list(
        &self,
        filter: &TaskFilter,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<ScheduledTask>, i64)> {
        let tasks = self.tasks.lock().unwrap();
        let filtered: Vec<ScheduledTask> = tasks
            .iter()
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| {
                filter.tags.is_empty() || t.tags.iter().any(|tag| filter.tags.contains(tag))
            })
            .cloned()
            .collect();
        Ok(page_slice(&filtered, page))
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> PanCheckResult<Vec<ScheduledTask>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                t.status == crate::entities::TaskStatus::Active && t.past_deadline(now)
            })
            .cloned()
            .collect())
    }

    async fn all_tags(&self) -> PanCheckResult<Vec<String>> {
        let mut tags: Vec<String> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .flat_map(|t| t.tags.clone())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

#[derive(Default)]
pub struct InMemoryExecutions {
    executions: Mutex<Vec<TaskExecution>>,
}

impl InMemoryExecutions {
    pub fn len(&self) -> usize {
        self.executions.lock().unwrap().len()
    }

    pub fn get(&self, id: i64) -> Option<TaskExecution> {
        self.executions
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }
}

#[async_trait]
impl TaskExecutionRepository for InMemoryExecutions {
    async fn create(&self, execution: &TaskExecution) -> PanCheckResult<TaskExecution> {
        let mut executions = self.executions.lock().unwrap();
        let mut stored = execution.clone();
        stored.id = executions.len() as i64 + 1;
        executions.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, execution: &TaskExecution) -> PanCheckResult<()> {
        let mut executions = self.executions.lock().unwrap();
        match executions.iter_mut().find(|e| e.id == execution.id) {
            Some(existing) => {
                *existing = execution.clone();
                Ok(())
            }
            None => Err(PanCheckError::execution_not_found(execution.id)),
        }
    }

    async fn find_by_id(&self, id: i64) -> PanCheckResult<Option<TaskExecution>> {
        Ok(self.get(id))
    }

    async fn list_by_task(
        &self,
        task_id: i64,
        page: &PageQuery,
    ) -> PanCheckResult<(Vec<TaskExecution>, i64)> {
        let executions = self.executions.lock().unwrap();
        let filtered: Vec<TaskExecution> = executions
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect();
        Ok(page_slice(&filtered, page))
    }
}

/// 返回固定结果的检测服务桩
#[derive(Default)]
pub struct StubValidator {
    outcome: Mutex<BatchOutcome>,
    last_batch: AtomicUsize,
}

impl StubValidator {
    pub fn new(outcome: BatchOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            last_batch: AtomicUsize::new(0),
        }
    }

    pub fn last_batch_size(&self) -> usize {
        self.last_batch.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkValidator for StubValidator {
    async fn check_batch(
        &self,
        links: &[ClassifiedLink],
        _timeout: Duration,
    ) -> PanCheckResult<BatchOutcome> {
        self.last_batch.store(links.len(), Ordering::SeqCst);
        Ok(self.outcome.lock().unwrap().clone())
    }
}

/// 始终失败的检测服务桩
pub struct FailingValidator;

#[async_trait]
impl LinkValidator for FailingValidator {
    async fn check_batch(
        &self,
        _links: &[ClassifiedLink],
        _timeout: Duration,
    ) -> PanCheckResult<BatchOutcome> {
        Err(PanCheckError::upstream("检测服务连接失败"))
    }
}

/// 返回固定文本的取数管道桩
pub struct StubFetcher {
    pub text: String,
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch_links(
        &self,
        _fetch_command: &str,
        _transform_script: Option<&str>,
    ) -> PanCheckResult<String> {
        Ok(self.text.clone())
    }
}

/// 始终失败的取数管道桩
pub struct FailingFetcher;

#[async_trait]
impl SourceFetcher for FailingFetcher {
    async fn fetch_links(
        &self,
        _fetch_command: &str,
        _transform_script: Option<&str>,
    ) -> PanCheckResult<String> {
        Err(PanCheckError::upstream("取数管道不可达"))
    }
}
