//! Production [`ActionExecutor`]: SMTP delivery via lettre and local
//! commands via tokio's process API.

use crate::ActionExecutor;
use anyhow::Context;
use async_trait::async_trait;
use fraudwatch_config::EmailSetting;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::process::Command;

pub struct SystemExecutor {
    /// `None` when the email action is disabled; the dispatcher gates on the
    /// setting, so a call without a transport is a defensive error.
    mailer: Option<Mailer>,
}

struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SystemExecutor {
    pub fn new(email: &EmailSetting) -> anyhow::Result<Self> {
        let mailer = if email.enabled {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&email.smtp_host)
                .context("invalid SMTP relay host")?
                .port(email.smtp_port);

            if let (Some(user), Some(pass)) = (&email.username, &email.password) {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }

            let from: Mailbox = email
                .from
                .parse()
                .context("invalid 'from' address in email action settings")?;

            Some(Mailer {
                transport: builder.build(),
                from,
            })
        } else {
            None
        };

        Ok(Self { mailer })
    }
}

#[async_trait]
impl ActionExecutor for SystemExecutor {
    async fn send_email(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> anyhow::Result<()> {
        let mailer = self
            .mailer
            .as_ref()
            .context("email action invoked but not configured")?;

        let mut last_err = None;
        for recipient in recipients {
            let message = Message::builder()
                .from(mailer.from.clone())
                .to(recipient.parse()?)
                .subject(subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body.to_string())?;

            if let Err(e) = mailer.transport.send(message).await {
                tracing::warn!(recipient = %recipient, error = %e, "email delivery failed");
                last_err = Some(e);
            }
        }

        match last_err {
            Some(e) => Err(e).context("delivery failed for at least one recipient"),
            None => Ok(()),
        }
    }

    async fn run_command(&self, name: &str, arguments: &str) -> anyhow::Result<()> {
        let status = Command::new(name)
            .args(arguments.split_whitespace())
            .status()
            .await
            .with_context(|| format!("could not spawn '{name}'"))?;

        if !status.success() {
            anyhow::bail!("command '{name}' exited with {status}");
        }
        Ok(())
    }
}
