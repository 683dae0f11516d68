use chrono::NaiveDateTime;
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, types::JsonValue};

use crate::models::job::Job;

/// Inserts a job unless an identical one is still queued or running.
/// Returns `None` when the job was already pending.
pub async fn insert_unique_job<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    kind: &str,
    payload: JsonValue,
    max_attempts: i32,
) -> Res<Option<Job>> {
    sqlx::query_as::<_, Job>(
        r#"
        INSERT INTO jobs (kind, payload, max_attempts)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (
            SELECT 1 FROM jobs
            WHERE kind = $1 AND payload = $2 AND status IN ('queued', 'running')
        )
        RETURNING *
        "#,
    )
    .bind(kind)
    .bind(payload)
    .bind(max_attempts)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Claims the oldest ready job. Concurrent workers skip rows another worker
/// has locked, so each job is handed to one worker at a time.
pub async fn claim_next_job<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Option<Job>> {
    sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs
        SET status = 'running', locked_at = NOW(), attempts = attempts + 1, updated_at = NOW()
        WHERE id = (
            SELECT id FROM jobs
            WHERE status = 'queued' AND available_at <= NOW()
            ORDER BY available_at, id
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        RETURNING *
        "#,
    )
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn complete_job<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
) -> Res<()> {
    sqlx::query(
        "UPDATE jobs SET status = 'done', locked_at = NULL, last_error = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Puts a failed job back in the queue, available again at `retry_at`.
pub async fn retry_job<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    error: &str,
    retry_at: NaiveDateTime,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'queued', locked_at = NULL, last_error = $2, available_at = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(error)
    .bind(retry_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn fail_job<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    id: i64,
    error: &str,
) -> Res<()> {
    sqlx::query(
        "UPDATE jobs SET status = 'failed', locked_at = NULL, last_error = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(error)
    .execute(executor)
    .await?;
    Ok(())
}

/// Re-queues jobs whose worker disappeared while running them.
pub async fn requeue_stale_jobs<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    locked_before: NaiveDateTime,
) -> Res<u64> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'queued', locked_at = NULL, updated_at = NOW()
        WHERE status = 'running' AND locked_at < $1
        "#,
    )
    .bind(locked_before)
    .execute(executor)
    .await
    .map(|res| res.rows_affected())
    .map_err(AppError::from)
}
