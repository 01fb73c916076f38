//! Azure provider for leo tasks
//!
//! Each task lives in its own resource group holding a storage account for
//! reports, a virtual network with a firewall-backed subnet, and a virtual
//! machine scale set running the task script. Resource Manager is reached
//! through [`ProviderApi`]; [`AzCli`] implements it on top of the `az` CLI.
//!
//! ```no_run
//! use leo_cloud::{Identifier, Lifecycle};
//! use leo_cloud_azure::{AzCli, Client, Task};
//! use std::sync::Arc;
//!
//! # async fn example() -> leo_cloud::Result<()> {
//! let client = Client::new(Arc::new(AzCli::new()), "us-east")
//!     .with_public_key_file("/home/me/.ssh/id_ed25519.pub");
//! let mut task = Task::new(
//!     Arc::new(client),
//!     Identifier::new("training"),
//!     leo_cloud::Task::default(),
//! );
//! task.create().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod az;
pub mod client;
pub mod error;
pub mod image;
pub mod model;
pub mod resources;
pub mod task;

#[cfg(test)]
mod testing;

pub use api::{Blob, BlobStorage, Page, ProviderApi};
pub use az::{AzAccount, AzCli};
pub use client::Client;
pub use error::AzureError;
pub use image::{ImageReference, azure_aliases};
pub use task::Task;
