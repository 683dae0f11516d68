use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use common::error::{AppError, Res};
use db::{job, models::job::Job};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

pub const PROVISION_SERVER: &str = "provision_server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionPayload {
    pub server_id: i64,
}

impl ProvisionPayload {
    pub fn from_job(job: &Job) -> Res<Self> {
        serde_json::from_value(job.payload.clone()).map_err(AppError::from)
    }
}

/// Producer side of the job queue, used by the billing flows.
#[allow(async_fn_in_trait)]
pub trait JobQueue {
    /// Queues a provisioning run for the server. A run that is already queued
    /// or in flight for the same server is not duplicated.
    async fn enqueue_provision(&self, server_id: i64) -> Res<()>;
}

/// Consumer side of the job queue, driven by the worker.
#[allow(async_fn_in_trait)]
pub trait JobSource {
    /// Puts back jobs left `running` since before `locked_before`.
    async fn requeue_stale(&self, locked_before: NaiveDateTime) -> Res<u64>;
    /// Locks the next ready job and counts the attempt.
    async fn claim(&self) -> Res<Option<Job>>;
    async fn complete(&self, job_id: i64) -> Res<()>;
    async fn retry(&self, job_id: i64, error: &str, retry_at: NaiveDateTime) -> Res<()>;
    async fn fail(&self, job_id: i64, error: &str) -> Res<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(NaiveDateTime),
    GiveUp,
}

/// Decides what happens to a job whose `attempts`-th run just failed.
pub fn next_attempt(
    attempts: i32,
    max_attempts: i32,
    backoff_secs: i64,
    now: NaiveDateTime,
) -> RetryDecision {
    if attempts >= max_attempts {
        RetryDecision::GiveUp
    } else {
        RetryDecision::Retry(now + Duration::seconds(backoff_secs))
    }
}

/// Postgres-backed queue over the `jobs` table.
#[derive(Clone)]
pub struct PgQueue {
    pool: Arc<PgPool>,
    max_attempts: i32,
}

impl PgQueue {
    pub fn new(pool: Arc<PgPool>, max_attempts: i32) -> Self {
        Self { pool, max_attempts }
    }
}

impl JobQueue for PgQueue {
    async fn enqueue_provision(&self, server_id: i64) -> Res<()> {
        let payload = serde_json::to_value(ProvisionPayload { server_id })?;
        match job::insert_unique_job(&*self.pool, PROVISION_SERVER, payload, self.max_attempts)
            .await?
        {
            Some(job) => info!("Queued provisioning job {} for server {}", job.id, server_id),
            None => debug!("Provisioning for server {} is already pending", server_id),
        }
        Ok(())
    }
}

impl JobSource for PgQueue {
    async fn requeue_stale(&self, locked_before: NaiveDateTime) -> Res<u64> {
        job::requeue_stale_jobs(&*self.pool, locked_before).await
    }

    async fn claim(&self) -> Res<Option<Job>> {
        job::claim_next_job(&*self.pool).await
    }

    async fn complete(&self, job_id: i64) -> Res<()> {
        job::complete_job(&*self.pool, job_id).await
    }

    async fn retry(&self, job_id: i64, error: &str, retry_at: NaiveDateTime) -> Res<()> {
        job::retry_job(&*self.pool, job_id, error, retry_at).await
    }

    async fn fail(&self, job_id: i64, error: &str) -> Res<()> {
        job::fail_job(&*self.pool, job_id, error).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn retries_with_fixed_backoff_until_exhausted() {
        assert_eq!(
            next_attempt(1, 5, 60, now()),
            RetryDecision::Retry(now() + Duration::seconds(60))
        );
        assert_eq!(
            next_attempt(4, 5, 60, now()),
            RetryDecision::Retry(now() + Duration::seconds(60))
        );
        assert_eq!(next_attempt(5, 5, 60, now()), RetryDecision::GiveUp);
        assert_eq!(next_attempt(6, 5, 60, now()), RetryDecision::GiveUp);
    }

    #[test]
    fn payload_is_read_from_job_row() {
        let job = Job {
            id: 1,
            kind: PROVISION_SERVER.to_string(),
            payload: serde_json::json!({ "server_id": 42 }),
            status: "running".to_string(),
            attempts: 1,
            max_attempts: 5,
            last_error: None,
            available_at: now(),
            locked_at: Some(now()),
            created_at: now(),
            updated_at: now(),
        };
        assert_eq!(
            ProvisionPayload::from_job(&job).unwrap(),
            ProvisionPayload { server_id: 42 }
        );
    }
}
