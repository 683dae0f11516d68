use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDateTime, Utc};
use common::error::Res;
use db::models::job::Job;
use provisioner::{
    JobQueue, JobSource,
    queue::{PROVISION_SERVER, ProvisionPayload},
};

#[derive(Default)]
struct State {
    jobs: Vec<Job>,
    next_id: i64,
}

/// In-memory job queue following the same status transitions as the
/// `jobs` table.
#[derive(Clone)]
pub struct MemoryQueue {
    state: Arc<Mutex<State>>,
    max_attempts: i32,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(5)
    }
}

impl MemoryQueue {
    pub fn new(max_attempts: i32) -> Self {
        Self {
            state: Arc::default(),
            max_attempts,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("queue mutex poisoned")
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.state().jobs.clone()
    }

    pub fn job(&self, id: i64) -> Option<Job> {
        self.state().jobs.iter().find(|j| j.id == id).cloned()
    }

    /// Server ids of every provisioning job ever queued, in order.
    pub fn enqueued_servers(&self) -> Vec<i64> {
        self.state()
            .jobs
            .iter()
            .filter_map(|j| ProvisionPayload::from_job(j).ok())
            .map(|p| p.server_id)
            .collect()
    }

    /// Makes every queued job ready now, skipping the retry backoff.
    pub fn skip_backoff(&self) {
        let past = now() - chrono::Duration::seconds(1);
        for job in self.state().jobs.iter_mut() {
            if job.status == "queued" {
                job.available_at = past;
            }
        }
    }

    /// Marks a job as running with an old lock, as if its worker died.
    pub fn abandon(&self, id: i64, locked_at: NaiveDateTime) {
        self.update(id, |j| {
            j.status = "running".to_string();
            j.locked_at = Some(locked_at);
        });
    }

    fn update(&self, id: i64, apply: impl FnOnce(&mut Job)) {
        if let Some(job) = self.state().jobs.iter_mut().find(|j| j.id == id) {
            apply(job);
            job.updated_at = now();
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl JobQueue for MemoryQueue {
    async fn enqueue_provision(&self, server_id: i64) -> Res<()> {
        let payload = serde_json::to_value(ProvisionPayload { server_id })?;
        let mut state = self.state();
        let pending = state.jobs.iter().any(|j| {
            j.kind == PROVISION_SERVER
                && j.payload == payload
                && (j.status == "queued" || j.status == "running")
        });
        if pending {
            return Ok(());
        }
        state.next_id += 1;
        let job = Job {
            id: state.next_id,
            kind: PROVISION_SERVER.to_string(),
            payload,
            status: "queued".to_string(),
            attempts: 0,
            max_attempts: self.max_attempts,
            last_error: None,
            available_at: now() - chrono::Duration::seconds(1),
            locked_at: None,
            created_at: now(),
            updated_at: now(),
        };
        state.jobs.push(job);
        Ok(())
    }
}

impl JobSource for MemoryQueue {
    async fn requeue_stale(&self, locked_before: NaiveDateTime) -> Res<u64> {
        let mut count = 0;
        for job in self.state().jobs.iter_mut() {
            if job.status == "running" && job.locked_at.is_some_and(|at| at < locked_before) {
                job.status = "queued".to_string();
                job.locked_at = None;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn claim(&self) -> Res<Option<Job>> {
        let now = now();
        let mut state = self.state();
        let Some(job) = state
            .jobs
            .iter_mut()
            .filter(|j| j.status == "queued" && j.available_at <= now)
            .min_by_key(|j| (j.available_at, j.id))
        else {
            return Ok(None);
        };
        job.status = "running".to_string();
        job.locked_at = Some(now);
        job.attempts += 1;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn complete(&self, job_id: i64) -> Res<()> {
        self.update(job_id, |j| {
            j.status = "done".to_string();
            j.locked_at = None;
            j.last_error = None;
        });
        Ok(())
    }

    async fn retry(&self, job_id: i64, error: &str, retry_at: NaiveDateTime) -> Res<()> {
        self.update(job_id, |j| {
            j.status = "queued".to_string();
            j.locked_at = None;
            j.last_error = Some(error.to_string());
            j.available_at = retry_at;
        });
        Ok(())
    }

    async fn fail(&self, job_id: i64, error: &str) -> Res<()> {
        self.update(job_id, |j| {
            j.status = "failed".to_string();
            j.locked_at = None;
            j.last_error = Some(error.to_string());
        });
        Ok(())
    }
}
