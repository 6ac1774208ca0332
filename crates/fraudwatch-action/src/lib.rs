//! Response actions for alarmed monitors.
//!
//! An alarmed monitor names an action chain; the [`dispatch`] worker
//! resolves the chain to ordered steps and invokes an [`ActionExecutor`]
//! for each. Chain execution is serialized process-wide: executors touch
//! shared external resources (one outbound mail session, the local process
//! table), and a non-interleaved action trace per episode is what makes the
//! log readable during an incident.

pub mod dispatch;
pub mod error;
pub mod executor;

#[cfg(test)]
mod tests;

pub use dispatch::{ActionDispatcher, DispatcherHandle};
pub use error::DispatchError;

use async_trait::async_trait;

/// Performs the concrete side effect of an action step.
///
/// Implementations carry their own credentials; the dispatcher only resolves
/// recipients and parameters from the configured data groups.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Delivers one alert email to `recipients`.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery to any recipient fails; the dispatcher
    /// logs it and continues with the remaining chain steps.
    async fn send_email(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> anyhow::Result<()>;

    /// Runs a local command with a single argument string.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be spawned or exits
    /// non-zero.
    async fn run_command(&self, name: &str, arguments: &str) -> anyhow::Result<()>;
}
