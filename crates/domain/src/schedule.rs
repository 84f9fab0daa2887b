use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

use pancheck_core::{PanCheckError, PanCheckResult};

/// CRON表达式解析和触发时间计算
pub struct CronPlanner {
    schedule: Schedule,
}

impl CronPlanner {
    pub fn new(cron_expr: &str) -> PanCheckResult<Self> {
        let schedule = Schedule::from_str(cron_expr).map_err(|e| PanCheckError::InvalidCron {
            expr: cron_expr.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { schedule })
    }

    /// 校验CRON表达式是否有效
    pub fn validate_expression(cron_expr: &str) -> PanCheckResult<()> {
        Schedule::from_str(cron_expr).map_err(|e| PanCheckError::InvalidCron {
            expr: cron_expr.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// 计算from之后的下一次触发时间
    pub fn next_execution_time(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }
}
