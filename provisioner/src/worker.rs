use std::{sync::Arc, time::Duration};

use chrono::Utc;
use common::{catalog::Catalog, env_config::WorkerConfig, error::Res};
use db::{ServerStore, UserStore, models::job::Job};
use log::{error, info, warn};
use panel::PanelApi;

use crate::{
    job::provision_server,
    queue::{JobSource, PROVISION_SERVER, ProvisionPayload, RetryDecision, next_attempt},
};

/// Result of one polling round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Completed(i64),
    Retrying(i64),
    Failed(i64),
}

/// Runs queued jobs one at a time.
pub struct Worker<Q, S, P> {
    queue: Q,
    store: S,
    panel: P,
    catalog: Arc<Catalog>,
    config: WorkerConfig,
}

impl<Q, S, P> Worker<Q, S, P>
where
    Q: JobSource,
    S: ServerStore + UserStore,
    P: PanelApi,
{
    pub fn new(queue: Q, store: S, panel: P, catalog: Arc<Catalog>, config: WorkerConfig) -> Self {
        Self {
            queue,
            store,
            panel,
            catalog,
            config,
        }
    }

    /// Polls forever. Queue errors are logged and the loop keeps going.
    pub async fn run(self) {
        info!(
            "Provisioning worker started (poll every {}s)",
            self.config.poll_interval_secs
        );
        let idle = Duration::from_secs(self.config.poll_interval_secs);
        loop {
            match self.tick().await {
                Ok(Tick::Idle) => tokio::time::sleep(idle).await,
                Ok(_) => {}
                Err(e) => {
                    error!("Worker tick failed: {}", e);
                    tokio::time::sleep(idle).await;
                }
            }
        }
    }

    /// Re-queues stale jobs, then claims and runs at most one job.
    pub async fn tick(&self) -> Res<Tick> {
        let now = Utc::now().naive_utc();
        let locked_before = now - chrono::Duration::seconds(self.config.lock_timeout_secs);
        let requeued = self.queue.requeue_stale(locked_before).await?;
        if requeued > 0 {
            warn!("Re-queued {} stale job(s)", requeued);
        }

        match self.queue.claim().await? {
            Some(job) => self.execute(job).await,
            None => Ok(Tick::Idle),
        }
    }

    async fn execute(&self, job: Job) -> Res<Tick> {
        info!(
            "Running job {} ({}) attempt {}/{}",
            job.id, job.kind, job.attempts, job.max_attempts
        );
        let result = match job.kind.as_str() {
            PROVISION_SERVER => match ProvisionPayload::from_job(&job) {
                Ok(payload) => {
                    provision_server(&self.store, &self.panel, &self.catalog, payload.server_id)
                        .await
                        .map(|outcome| info!("Job {} finished: {:?}", job.id, outcome))
                }
                Err(e) => Err(e),
            },
            other => {
                error!("Job {} has unknown kind '{}'", job.id, other);
                self.queue
                    .fail(job.id, &format!("unknown job kind '{}'", other))
                    .await?;
                return Ok(Tick::Failed(job.id));
            }
        };

        let error = match result {
            Ok(()) => {
                self.queue.complete(job.id).await?;
                return Ok(Tick::Completed(job.id));
            }
            Err(e) => e.to_string(),
        };

        let now = Utc::now().naive_utc();
        match next_attempt(job.attempts, job.max_attempts, self.config.backoff_secs, now) {
            RetryDecision::Retry(at) => {
                warn!("Job {} failed, retrying at {}: {}", job.id, at, error);
                self.queue.retry(job.id, &error, at).await?;
                Ok(Tick::Retrying(job.id))
            }
            RetryDecision::GiveUp => {
                error!(
                    "Job {} failed after {} attempts: {}",
                    job.id, job.attempts, error
                );
                self.queue.fail(job.id, &error).await?;
                Ok(Tick::Failed(job.id))
            }
        }
    }
}
