//! The action-chain dispatcher: a single-worker serial-execution component.
//!
//! Monitors do not run chains themselves; they submit a request through a
//! cloneable [`DispatcherHandle`] and await the reply. One spawned
//! worker task owns the receiving end and processes requests strictly one at
//! a time, which is what guarantees that action traces from concurrently
//! alarming monitors never interleave.

use crate::error::DispatchError;
use crate::ActionExecutor;
use fraudwatch_common::types::{AlertContext, AlertDetail};
use fraudwatch_config::{ActionStep, ConfigSnapshot, ACTION_EMAIL, ACTION_LOCAL_COMMANDS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

const REQUEST_QUEUE_DEPTH: usize = 32;

struct DispatchRequest {
    chain_name: String,
    skip_non_recurrent: bool,
    context: AlertContext,
    reply: oneshot::Sender<Result<(), DispatchError>>,
}

/// Cloneable submission side of the dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<DispatchRequest>,
}

impl DispatcherHandle {
    /// Submits one chain execution and waits for it to finish.
    ///
    /// `skip_non_recurrent` is true when the submitting monitor was already
    /// alarmed on its previous tick, i.e. this is a continuation of an
    /// episode rather than its onset.
    pub async fn dispatch(
        &self,
        chain_name: &str,
        skip_non_recurrent: bool,
        context: AlertContext,
    ) -> Result<(), DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DispatchRequest {
                chain_name: chain_name.to_string(),
                skip_non_recurrent,
                context,
                reply,
            })
            .await
            .map_err(|_| DispatchError::WorkerUnavailable)?;
        rx.await.map_err(|_| DispatchError::WorkerUnavailable)?
    }
}

pub struct ActionDispatcher {
    config: Arc<ConfigSnapshot>,
    executor: Arc<dyn ActionExecutor>,
    /// Upper bound on one executor invocation, so a stuck executor cannot
    /// starve every other monitor's ability to alert.
    step_timeout: Duration,
    rx: mpsc::Receiver<DispatchRequest>,
}

impl ActionDispatcher {
    pub fn new(
        config: Arc<ConfigSnapshot>,
        executor: Arc<dyn ActionExecutor>,
        step_timeout: Duration,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        (
            Self {
                config,
                executor,
                step_timeout,
                rx,
            },
            DispatcherHandle { tx },
        )
    }

    /// Worker loop; runs until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("action dispatch worker started");
        while let Some(request) = self.rx.recv().await {
            let result = self
                .run_chain(
                    &request.chain_name,
                    request.skip_non_recurrent,
                    &request.context,
                )
                .await;
            if let Err(e) = &result {
                tracing::error!(chain = %request.chain_name, error = %e, "action chain aborted");
            }
            // The requesting monitor may have given up waiting; that is fine.
            let _ = request.reply.send(result);
        }
        tracing::info!("action dispatch worker stopped");
    }

    async fn run_chain(
        &self,
        chain_name: &str,
        skip_non_recurrent: bool,
        context: &AlertContext,
    ) -> Result<(), DispatchError> {
        let chain = self
            .config
            .action_chains
            .get(chain_name)
            .ok_or_else(|| DispatchError::ChainNotFound(chain_name.to_string()))?;

        tracing::debug!(
            chain = chain_name,
            steps = chain.len(),
            skip_non_recurrent,
            monitor = context.monitor_title,
            "running action chain"
        );

        for step in chain {
            match step.action.as_str() {
                ACTION_EMAIL => self.run_email_step(step, skip_non_recurrent, context).await?,
                ACTION_LOCAL_COMMANDS => {
                    self.run_command_step(step, skip_non_recurrent).await?
                }
                other => return Err(DispatchError::UnsupportedAction(other.to_string())),
            }
        }

        Ok(())
    }

    async fn run_email_step(
        &self,
        step: &ActionStep,
        skip_non_recurrent: bool,
        context: &AlertContext,
    ) -> Result<(), DispatchError> {
        let setting = &self.config.actions.email;
        if !setting.enabled {
            tracing::debug!("email action is disabled; skipping step");
            return Ok(());
        }
        if !setting.recurrent && skip_non_recurrent {
            tracing::info!("email action is non-recurrent and already fired this episode; skipping");
            return Ok(());
        }

        let mut recipients = Vec::with_capacity(step.data_groups.len());
        for group_name in &step.data_groups {
            let group = self
                .config
                .data_groups
                .get(group_name)
                .ok_or_else(|| DispatchError::UnknownDataGroup(group_name.clone()))?;
            let address =
                group
                    .email_address
                    .as_ref()
                    .ok_or_else(|| DispatchError::MalformedDataGroup {
                        group: group_name.clone(),
                        field: "email_address",
                        action: ACTION_EMAIL,
                    })?;
            recipients.push(address.clone());
        }

        let subject = self.subject(context);
        let body = format_body(context);

        match timeout(
            self.step_timeout,
            self.executor.send_email(&subject, &body, &recipients),
        )
        .await
        {
            Ok(Ok(())) => {
                tracing::info!(recipients = recipients.len(), "email action executed")
            }
            Ok(Err(e)) => tracing::error!(error = %e, "email action failed"),
            Err(_) => tracing::error!(
                timeout_secs = self.step_timeout.as_secs(),
                "email action timed out"
            ),
        }

        Ok(())
    }

    async fn run_command_step(
        &self,
        step: &ActionStep,
        skip_non_recurrent: bool,
    ) -> Result<(), DispatchError> {
        let setting = &self.config.actions.local_commands;
        if !setting.enabled {
            tracing::debug!("local command action is disabled; skipping step");
            return Ok(());
        }
        if !setting.recurrent && skip_non_recurrent {
            tracing::info!(
                "local command action is non-recurrent and already fired this episode; skipping"
            );
            return Ok(());
        }

        for group_name in &step.data_groups {
            let group = self
                .config
                .data_groups
                .get(group_name)
                .ok_or_else(|| DispatchError::UnknownDataGroup(group_name.clone()))?;
            let command =
                group
                    .command_name
                    .as_ref()
                    .ok_or_else(|| DispatchError::MalformedDataGroup {
                        group: group_name.clone(),
                        field: "command_name",
                        action: ACTION_LOCAL_COMMANDS,
                    })?;
            let arguments = group.command_arguments.as_deref().unwrap_or("");

            match timeout(
                self.step_timeout,
                self.executor.run_command(command, arguments),
            )
            .await
            {
                Ok(Ok(())) => tracing::info!(command = %command, "local command executed"),
                Ok(Err(e)) => {
                    tracing::error!(command = %command, error = %e, "local command failed")
                }
                Err(_) => tracing::error!(
                    command = %command,
                    timeout_secs = self.step_timeout.as_secs(),
                    "local command timed out"
                ),
            }
        }

        Ok(())
    }

    fn subject(&self, context: &AlertContext) -> String {
        format!(
            "[fraudwatch][{}] ALERT: {}",
            self.config.general.hostname, context.monitor_title
        )
    }
}

/// Plain-text body for alert notifications.
pub fn format_body(context: &AlertContext) -> String {
    match &context.detail {
        AlertDetail::Hits(hits) => {
            let mut lines = vec![format!("{} raised an alarm. Found:", context.monitor_title)];
            let mut sorted: Vec<_> = hits.iter().collect();
            sorted.sort_by(|a, b| a.prefix.cmp(&b.prefix));
            for hit in sorted {
                lines.push(format!(
                    "  prefix {}: {} hits ({})",
                    hit.prefix,
                    hit.hits,
                    hit.destinations.join(", ")
                ));
            }
            lines.join("\n")
        }
        AlertDetail::ActiveCalls { count, threshold } => format!(
            "{} raised an alarm: {} active calls (threshold {})",
            context.monitor_title, count, threshold
        ),
    }
}
