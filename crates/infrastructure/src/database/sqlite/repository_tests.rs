use chrono::{Duration, TimeZone, Utc};

use pancheck_domain::entities::{
    ExecutionStatus, InvalidLink, ScheduledTask, SubmissionRecord, SubmissionSource,
    SubmissionStatus, TaskExecution, TaskStatus,
};
use pancheck_domain::partition::classify_batch;
use pancheck_domain::platform::Platform;
use pancheck_domain::repositories::{
    InvalidLinkRepository, PageQuery, ScheduledTaskRepository, StatisticsRepository,
    SubmissionRepository, TaskExecutionRepository, TaskFilter, TimeGranularity,
};

use super::{
    SqliteInvalidLinkRepository, SqliteScheduledTaskRepository, SqliteStatisticsRepository,
    SqliteSubmissionRepository, SqliteTaskExecutionRepository,
};
use crate::database::Database;

async fn test_db() -> Database {
    Database::connect_in_memory().await.unwrap()
}

fn sample_submission() -> SubmissionRecord {
    let links = classify_batch(&[
        "https://pan.baidu.com/s/abc".to_string(),
        "https://pan.quark.cn/s/def".to_string(),
    ]);
    SubmissionRecord::new(
        SubmissionSource::Manual,
        Some("10.0.0.1".to_string()),
        vec![Platform::Baidu],
        links,
        1,
        0,
        Utc::now(),
    )
}

fn sample_task(name: &str) -> ScheduledTask {
    let now = Utc::now();
    ScheduledTask {
        id: 0,
        name: name.to_string(),
        description: Some("每日资源巡检".to_string()),
        tags: vec!["daily".to_string(), "movie".to_string()],
        fetch_command: "curl https://source.example.com/links".to_string(),
        transform_script: None,
        cron_expression: "0 0 3 * * *".to_string(),
        selected_platforms: vec![Platform::Baidu, Platform::Quark],
        auto_destroy_at: None,
        status: TaskStatus::Stopped,
        last_run_at: None,
        next_run_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn sample_invalid_link(url: &str, rate_limited: bool) -> InvalidLink {
    InvalidLink {
        id: 0,
        url: url.to_string(),
        platform: Platform::Baidu,
        failure_reason: "分享已取消".to_string(),
        is_rate_limited: rate_limited,
        check_duration_ms: Some(320),
        submission_id: Some(1),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_submission_create_and_roundtrip() {
    let db = test_db().await;
    let repo = SqliteSubmissionRepository::new(db.pool().clone());

    let created = repo.create(&sample_submission()).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.status, SubmissionStatus::Pending);
    assert_eq!(created.total_links(), 2);
    assert_eq!(created.duplicate_count, 1);

    let found = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.links, created.links);
    assert_eq!(found.client_ip.as_deref(), Some("10.0.0.1"));
}

#[tokio::test]
async fn test_submission_update_persists_link_results() {
    let db = test_db().await;
    let repo = SqliteSubmissionRepository::new(db.pool().clone());

    let mut record = repo.create(&sample_submission()).await.unwrap();
    record.mark_valid("https://pan.baidu.com/s/abc");
    record.mark_invalid("https://pan.quark.cn/s/def", "分享不存在");
    record.finish_check(950, Utc::now());
    repo.update(&record).await.unwrap();

    let found = repo.find_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(found.status, SubmissionStatus::Checked);
    assert_eq!(found.valid_count(), 1);
    assert_eq!(found.invalid_count(), 1);
    assert_eq!(found.total_duration_ms, Some(950));
}

#[tokio::test]
async fn test_submission_update_missing_returns_not_found() {
    let db = test_db().await;
    let repo = SqliteSubmissionRepository::new(db.pool().clone());

    let mut record = sample_submission();
    record.id = 9999;
    assert!(repo.update(&record).await.is_err());
}

#[tokio::test]
async fn test_submission_list_pagination() {
    let db = test_db().await;
    let repo = SqliteSubmissionRepository::new(db.pool().clone());

    for _ in 0..5 {
        repo.create(&sample_submission()).await.unwrap();
    }

    let page = PageQuery {
        page: 2,
        page_size: 2,
    };
    let (records, total) = repo.list(&page).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_task_create_and_find() {
    let db = test_db().await;
    let repo = SqliteScheduledTaskRepository::new(db.pool().clone());

    let created = repo.create(&sample_task("每日巡检")).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.tags, vec!["daily", "movie"]);
    assert_eq!(created.selected_platforms, vec![Platform::Baidu, Platform::Quark]);

    let found = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.name, "每日巡检");
    assert_eq!(found.status, TaskStatus::Stopped);
}

#[tokio::test]
async fn test_task_exists_by_name_with_exclusion() {
    let db = test_db().await;
    let repo = SqliteScheduledTaskRepository::new(db.pool().clone());

    let created = repo.create(&sample_task("每日巡检")).await.unwrap();

    assert!(repo.exists_by_name("每日巡检", None).await.unwrap());
    assert!(!repo.exists_by_name("每日巡检", Some(created.id)).await.unwrap());
    assert!(!repo.exists_by_name("不存在的任务", None).await.unwrap());
}

#[tokio::test]
async fn test_task_update_and_delete() {
    let db = test_db().await;
    let repo = SqliteScheduledTaskRepository::new(db.pool().clone());

    let mut task = repo.create(&sample_task("每日巡检")).await.unwrap();
    task.enable(Utc::now() + Duration::hours(1), Utc::now()).unwrap();
    repo.update(&task).await.unwrap();

    let found = repo.find_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(found.status, TaskStatus::Active);
    assert!(found.next_run_at.is_some());

    assert!(repo.delete(task.id).await.unwrap());
    assert!(!repo.delete(task.id).await.unwrap());
    assert!(repo.find_by_id(task.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_task_list_filters_by_status_and_tags() {
    let db = test_db().await;
    let repo = SqliteScheduledTaskRepository::new(db.pool().clone());

    let mut active = sample_task("活跃任务");
    active.status = TaskStatus::Active;
    active.tags = vec!["movie".to_string()];
    repo.create(&active).await.unwrap();

    let mut stopped = sample_task("停用任务");
    stopped.tags = vec!["music".to_string()];
    repo.create(&stopped).await.unwrap();

    let page = PageQuery::default();

    let filter = TaskFilter {
        status: Some(TaskStatus::Active),
        ..Default::default()
    };
    let (tasks, total) = repo.list(&filter, &page).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(tasks[0].name, "活跃任务");

    // 标签集合命中任意一个即可
    let filter = TaskFilter {
        tags: vec!["music".to_string(), "game".to_string()],
        ..Default::default()
    };
    let (tasks, total) = repo.list(&filter, &page).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(tasks[0].name, "停用任务");

    let (_, total) = repo.list(&TaskFilter::default(), &page).await.unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_task_find_expired_only_active_past_deadline() {
    let db = test_db().await;
    let repo = SqliteScheduledTaskRepository::new(db.pool().clone());
    let now = Utc::now();

    let mut due = sample_task("已到期");
    due.status = TaskStatus::Active;
    due.auto_destroy_at = Some(now - Duration::minutes(5));
    repo.create(&due).await.unwrap();

    let mut not_due = sample_task("未到期");
    not_due.status = TaskStatus::Active;
    not_due.auto_destroy_at = Some(now + Duration::hours(1));
    repo.create(&not_due).await.unwrap();

    let mut stopped = sample_task("已停用");
    stopped.auto_destroy_at = Some(now - Duration::minutes(5));
    repo.create(&stopped).await.unwrap();

    let expired = repo.find_expired(now).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].name, "已到期");
}

#[tokio::test]
async fn test_task_all_tags_deduplicated_sorted() {
    let db = test_db().await;
    let repo = SqliteScheduledTaskRepository::new(db.pool().clone());

    let mut a = sample_task("任务A");
    a.tags = vec!["movie".to_string(), "daily".to_string()];
    repo.create(&a).await.unwrap();

    let mut b = sample_task("任务B");
    b.tags = vec!["movie".to_string(), "anime".to_string()];
    repo.create(&b).await.unwrap();

    let tags = repo.all_tags().await.unwrap();
    assert_eq!(tags, vec!["anime", "daily", "movie"]);
}

#[tokio::test]
async fn test_execution_create_update_list() {
    let db = test_db().await;
    let repo = SqliteTaskExecutionRepository::new(db.pool().clone());
    let now = Utc::now();

    let mut exec = repo.create(&TaskExecution::start(7, now)).await.unwrap();
    assert!(exec.id > 0);
    assert_eq!(exec.status, ExecutionStatus::Running);

    exec.finish_success(10, 10, 6, 4, now + Duration::seconds(3))
        .unwrap();
    repo.update(&exec).await.unwrap();

    let found = repo.find_by_id(exec.id).await.unwrap().unwrap();
    assert_eq!(found.status, ExecutionStatus::Success);
    assert_eq!(found.valid_count, 6);
    assert_eq!(found.duration_ms, Some(3000));

    repo.create(&TaskExecution::start(7, now + Duration::minutes(1)))
        .await
        .unwrap();
    repo.create(&TaskExecution::start(8, now)).await.unwrap();

    let (executions, total) = repo.list_by_task(7, &PageQuery::default()).await.unwrap();
    assert_eq!(total, 2);
    // 最近一次执行排在最前
    assert_eq!(executions[0].started_at, now + Duration::minutes(1));
}

#[tokio::test]
async fn test_execution_update_missing_returns_not_found() {
    let db = test_db().await;
    let repo = SqliteTaskExecutionRepository::new(db.pool().clone());

    let mut exec = TaskExecution::start(1, Utc::now());
    exec.id = 4242;
    assert!(repo.update(&exec).await.is_err());
}

#[tokio::test]
async fn test_invalid_link_upsert_overwrites_by_url() {
    let db = test_db().await;
    let repo = SqliteInvalidLinkRepository::new(db.pool().clone());

    let url = "https://pan.baidu.com/s/gone";
    repo.upsert_many(&[sample_invalid_link(url, false)])
        .await
        .unwrap();

    let mut updated = sample_invalid_link(url, true);
    updated.failure_reason = "访问被限流".to_string();
    repo.upsert_many(&[updated]).await.unwrap();

    let found = repo.find_by_urls(&[url.to_string()]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].is_rate_limited);
    assert_eq!(found[0].failure_reason, "访问被限流");
}

#[tokio::test]
async fn test_invalid_link_find_by_urls_subset() {
    let db = test_db().await;
    let repo = SqliteInvalidLinkRepository::new(db.pool().clone());

    repo.upsert_many(&[
        sample_invalid_link("https://pan.baidu.com/s/a", false),
        sample_invalid_link("https://pan.baidu.com/s/b", false),
    ])
    .await
    .unwrap();

    let found = repo
        .find_by_urls(&[
            "https://pan.baidu.com/s/a".to_string(),
            "https://pan.baidu.com/s/missing".to_string(),
        ])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].url, "https://pan.baidu.com/s/a");

    assert!(repo.find_by_urls(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_link_rate_limited_listing_and_cleanup() {
    let db = test_db().await;
    let repo = SqliteInvalidLinkRepository::new(db.pool().clone());

    let mut quark = sample_invalid_link("https://pan.quark.cn/s/x", true);
    quark.platform = Platform::Quark;
    repo.upsert_many(&[
        sample_invalid_link("https://pan.baidu.com/s/a", true),
        quark,
        sample_invalid_link("https://pan.baidu.com/s/b", false),
    ])
    .await
    .unwrap();

    let page = PageQuery::default();
    let (links, total) = repo.list_rate_limited(None, &page).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(links.len(), 2);

    let (links, total) = repo
        .list_rate_limited(Some(Platform::Quark), &page)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(links[0].platform, Platform::Quark);

    let removed = repo.delete_rate_limited().await.unwrap();
    assert_eq!(removed, 2);
    let (_, total) = repo.list_rate_limited(None, &page).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_invalid_link_delete_older_than() {
    let db = test_db().await;
    let repo = SqliteInvalidLinkRepository::new(db.pool().clone());
    let now = Utc::now();

    let mut stale = sample_invalid_link("https://pan.baidu.com/s/old", false);
    stale.created_at = now - Duration::hours(48);
    let fresh = sample_invalid_link("https://pan.baidu.com/s/new", false);
    repo.upsert_many(&[stale, fresh]).await.unwrap();

    let removed = repo.delete_older_than(now - Duration::hours(24)).await.unwrap();
    assert_eq!(removed, 1);

    let remaining = repo
        .find_by_urls(&["https://pan.baidu.com/s/new".to_string()])
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn test_statistics_counters() {
    let db = test_db().await;
    let pool = db.pool().clone();
    let submissions = SqliteSubmissionRepository::new(pool.clone());
    let invalid_links = SqliteInvalidLinkRepository::new(pool.clone());
    let tasks = SqliteScheduledTaskRepository::new(pool.clone());
    let stats = SqliteStatisticsRepository::new(pool);

    let mut checked = submissions.create(&sample_submission()).await.unwrap();
    checked.finish_check(500, Utc::now());
    submissions.update(&checked).await.unwrap();
    submissions.create(&sample_submission()).await.unwrap();

    invalid_links
        .upsert_many(&[
            sample_invalid_link("https://pan.baidu.com/s/a", true),
            sample_invalid_link("https://pan.baidu.com/s/b", false),
        ])
        .await
        .unwrap();
    tasks.create(&sample_task("每日巡检")).await.unwrap();

    assert_eq!(stats.count_submissions().await.unwrap(), 2);
    assert_eq!(
        stats
            .count_submissions_by_status(SubmissionStatus::Checked)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        stats
            .count_submissions_by_status(SubmissionStatus::Pending)
            .await
            .unwrap(),
        1
    );
    assert_eq!(stats.count_invalid_links().await.unwrap(), 2);
    assert_eq!(stats.count_rate_limited_links().await.unwrap(), 1);
    assert_eq!(stats.count_tasks().await.unwrap(), 1);
}

#[tokio::test]
async fn test_statistics_invalid_counts_grouped_by_platform() {
    let db = test_db().await;
    let invalid_links = SqliteInvalidLinkRepository::new(db.pool().clone());
    let stats = SqliteStatisticsRepository::new(db.pool().clone());

    let mut quark = sample_invalid_link("https://pan.quark.cn/s/x", false);
    quark.platform = Platform::Quark;
    invalid_links
        .upsert_many(&[
            sample_invalid_link("https://pan.baidu.com/s/a", false),
            sample_invalid_link("https://pan.baidu.com/s/b", false),
            quark,
        ])
        .await
        .unwrap();

    let counts = stats.invalid_counts_by_platform().await.unwrap();
    assert_eq!(counts.len(), 2);
    assert!(counts.contains(&(Platform::Baidu, 2)));
    assert!(counts.contains(&(Platform::Quark, 1)));
}

#[tokio::test]
async fn test_statistics_time_series_buckets_by_day() {
    let db = test_db().await;
    let submissions = SqliteSubmissionRepository::new(db.pool().clone());
    let stats = SqliteStatisticsRepository::new(db.pool().clone());

    for (day, hour) in [(20, 9), (20, 21), (22, 12)] {
        let mut record = sample_submission();
        record.created_at = Utc.with_ymd_and_hms(2026, 8, day, hour, 0, 0).unwrap();
        record.updated_at = record.created_at;
        submissions.create(&record).await.unwrap();
    }

    let series = stats
        .submission_time_series(None, None, TimeGranularity::Day)
        .await
        .unwrap();
    assert_eq!(
        series
            .iter()
            .map(|p| (p.bucket.as_str(), p.count))
            .collect::<Vec<_>>(),
        vec![("2026-08-20", 2), ("2026-08-22", 1)]
    );

    // 起止时间裁剪
    let series = stats
        .submission_time_series(
            Some(Utc.with_ymd_and_hms(2026, 8, 21, 0, 0, 0).unwrap()),
            None,
            TimeGranularity::Day,
        )
        .await
        .unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].bucket, "2026-08-22");

    // 小时粒度同一天分成两个桶
    let series = stats
        .submission_time_series(
            None,
            Some(Utc.with_ymd_and_hms(2026, 8, 21, 0, 0, 0).unwrap()),
            TimeGranularity::Hour,
        )
        .await
        .unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].bucket, "2026-08-20 09:00");
}
