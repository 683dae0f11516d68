//! Shared test doubles for the provisioning and billing crates.
//!
//! - **MemoryStore**: `ServerStore` + `UserStore` over in-memory maps
//! - **FakePanel**: `PanelApi` that records calls and keeps created servers
//! - **MemoryQueue**: `JobQueue` + `JobSource` with the same retry bookkeeping as the jobs table
//! - **FakeBilling**: `BillingGateway` with scripted subscriptions and sessions
//! - **factory**: default users, servers and a catalog matching them
//!
//! All doubles are cheap to clone and share state between clones, so a test
//! can hand one copy to the code under test and inspect the other.

pub mod billing;
pub mod factory;
pub mod panel;
pub mod queue;
pub mod store;

pub use billing::{BillingCall, FakeBilling, subscription};
pub use panel::{FakePanel, PanelCall};
pub use queue::MemoryQueue;
pub use store::MemoryStore;
