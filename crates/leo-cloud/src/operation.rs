//! Long-running provider operations
//!
//! Submitting a change returns an [`Operation`]; waiting for it is a separate
//! step so that callers decide how long they are willing to block.

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Operation: Send {
    /// Block until the provider reports the operation as finished
    async fn wait(&mut self) -> Result<()>;
}

/// Operation that finished at submission time
pub struct Completed;

#[async_trait]
impl Operation for Completed {
    async fn wait(&mut self) -> Result<()> {
        Ok(())
    }
}
