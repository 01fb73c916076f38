//! leo cloud core
//!
//! Provider-independent building blocks for ephemeral cloud tasks: a task
//! owns a chain of provider resources that are created in dependency order,
//! observed while the task runs, and deleted in reverse order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    leo CLI                       │
//! │         (leo create / read / delete)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  leo-cloud                       │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait Resource { create, read,           │   │
//! │  │                   update, delete }        │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Status/Event │  │  Identifier  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │     azure     │
//! │   provider    │
//! └───────────────┘
//! ```

pub mod alias;
pub mod deadline;
pub mod error;
pub mod identifier;
pub mod operation;
pub mod resource;
pub mod script;
pub mod status;
pub mod task;

// Re-exports
pub use alias::Aliases;
pub use deadline::within;
pub use error::{CloudError, Result};
pub use identifier::Identifier;
pub use operation::{Completed, Operation};
pub use resource::{Resource, Shared, ignore_not_found, ready, shared};
pub use script::{MachineScript, ScriptRenderer};
pub use status::{Event, Status, StatusCode, TaskStatus, aggregate};
pub use task::{
    Environment, Firewall, FirewallRule, Lifecycle, LogBlock, Observe, Size, Spot, Task,
    Variables,
};
