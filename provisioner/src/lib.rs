//! Background provisioning: the `provision_server` job, the Postgres job
//! queue and the worker that drains it.

pub mod environment;
pub mod job;
pub mod queue;
pub mod worker;

pub use job::{ProvisionOutcome, provision_server};
pub use queue::{JobQueue, JobSource, PgQueue};
pub use worker::{Tick, Worker};
