use crate::dispatch::{format_body, ActionDispatcher, DispatcherHandle};
use crate::{ActionExecutor, DispatchError};
use async_trait::async_trait;
use fraudwatch_common::types::{AggregatedHit, AlertContext};
use fraudwatch_config::{
    ActionSettings, ActionStep, CdrsSourceConfig, ConfigSnapshot, DataGroup, EmailSetting,
    GeneralConfig, LocalCommandSetting, Monitors, SoftswitchConfig, ACTION_EMAIL,
    ACTION_LOCAL_COMMANDS,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Email {
        subject: String,
        recipients: Vec<String>,
    },
    Command {
        name: String,
        arguments: String,
    },
}

#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    /// Time spent inside each call; used by the serialization test.
    work: Option<Duration>,
    intervals: Mutex<Vec<(Instant, Instant)>>,
}

impl RecordingExecutor {
    fn with_work(work: Duration) -> Self {
        Self {
            work: Some(work),
            ..Self::default()
        }
    }

    async fn record(&self, call: Call) {
        let begin = Instant::now();
        if let Some(work) = self.work {
            tokio::time::sleep(work).await;
        }
        self.calls.lock().unwrap().push(call);
        self.intervals.lock().unwrap().push((begin, Instant::now()));
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn send_email(
        &self,
        subject: &str,
        _body: &str,
        recipients: &[String],
    ) -> anyhow::Result<()> {
        self.record(Call::Email {
            subject: subject.to_string(),
            recipients: recipients.to_vec(),
        })
        .await;
        Ok(())
    }

    async fn run_command(&self, name: &str, arguments: &str) -> anyhow::Result<()> {
        self.record(Call::Command {
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
        .await;
        Ok(())
    }
}

fn snapshot(
    email_recurrent: bool,
    chains: HashMap<String, Vec<ActionStep>>,
    data_groups: HashMap<String, DataGroup>,
) -> ConfigSnapshot {
    ConfigSnapshot {
        general: GeneralConfig {
            hostname: "pbx-test".to_string(),
        },
        softswitch: SoftswitchConfig {
            brand: "*asterisk".to_string(),
            version: String::new(),
            cdrs_source: CdrsSourceConfig {
                dbms: "mysql".to_string(),
                host: "localhost".to_string(),
                port: 3306,
                user_name: "u".to_string(),
                user_password: String::new(),
                database_name: "cdrs".to_string(),
                table_name: "cdr".to_string(),
            },
        },
        monitors: Monitors::default(),
        actions: ActionSettings {
            email: EmailSetting {
                enabled: true,
                recurrent: email_recurrent,
                smtp_host: "smtp.test".to_string(),
                smtp_port: 587,
                username: None,
                password: None,
                from: "fraudwatch@test".to_string(),
            },
            local_commands: LocalCommandSetting {
                enabled: true,
                recurrent: true,
            },
        },
        action_chains: chains,
        data_groups,
    }
}

fn ops_groups() -> HashMap<String, DataGroup> {
    HashMap::from([
        (
            "ops".to_string(),
            DataGroup {
                email_address: Some("noc@test".to_string()),
                ..DataGroup::default()
            },
        ),
        (
            "block".to_string(),
            DataGroup {
                command_name: Some("/usr/local/bin/block-trunk".to_string()),
                command_arguments: Some("--all".to_string()),
                ..DataGroup::default()
            },
        ),
    ])
}

fn email_chain() -> HashMap<String, Vec<ActionStep>> {
    HashMap::from([(
        "default".to_string(),
        vec![ActionStep {
            action: ACTION_EMAIL.to_string(),
            data_groups: vec!["ops".to_string()],
        }],
    )])
}

fn spawn(config: ConfigSnapshot, executor: Arc<RecordingExecutor>) -> DispatcherHandle {
    let (dispatcher, handle) =
        ActionDispatcher::new(Arc::new(config), executor, Duration::from_secs(5));
    tokio::spawn(dispatcher.run());
    handle
}

fn context() -> AlertContext {
    let mut hit = AggregatedHit::new("351");
    hit.record("351123456789");
    AlertContext::hits("Dangerous Destinations", vec![hit])
}

#[tokio::test]
async fn non_recurrent_action_fires_only_on_episode_onset() {
    let executor = Arc::new(RecordingExecutor::default());
    let handle = spawn(snapshot(false, email_chain(), ops_groups()), executor.clone());

    handle.dispatch("default", false, context()).await.unwrap();
    handle.dispatch("default", true, context()).await.unwrap();

    let calls = executor.calls();
    assert_eq!(calls.len(), 1, "non-recurrent action must fire once per episode");
    assert!(matches!(&calls[0], Call::Email { recipients, .. } if recipients == &["noc@test"]));
}

#[tokio::test]
async fn recurrent_action_fires_on_every_alarming_tick() {
    let executor = Arc::new(RecordingExecutor::default());
    let handle = spawn(snapshot(true, email_chain(), ops_groups()), executor.clone());

    handle.dispatch("default", false, context()).await.unwrap();
    handle.dispatch("default", true, context()).await.unwrap();

    assert_eq!(executor.calls().len(), 2);
}

#[tokio::test]
async fn disabled_action_is_a_no_op() {
    let mut config = snapshot(true, email_chain(), ops_groups());
    config.actions.email.enabled = false;
    let executor = Arc::new(RecordingExecutor::default());
    let handle = spawn(config, executor.clone());

    handle.dispatch("default", false, context()).await.unwrap();

    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn unknown_action_kind_aborts_without_rolling_back() {
    let chains = HashMap::from([(
        "default".to_string(),
        vec![
            ActionStep {
                action: ACTION_EMAIL.to_string(),
                data_groups: vec!["ops".to_string()],
            },
            ActionStep {
                action: "*http".to_string(),
                data_groups: vec![],
            },
            ActionStep {
                action: ACTION_LOCAL_COMMANDS.to_string(),
                data_groups: vec!["block".to_string()],
            },
        ],
    )]);
    let executor = Arc::new(RecordingExecutor::default());
    let handle = spawn(snapshot(true, chains, ops_groups()), executor.clone());

    let err = handle.dispatch("default", false, context()).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnsupportedAction(kind) if kind == "*http"));

    // The email step ran before the abort and is not rolled back; the
    // command step after the unknown kind never runs.
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], Call::Email { .. }));
}

#[tokio::test]
async fn missing_chain_is_a_dispatch_error() {
    let executor = Arc::new(RecordingExecutor::default());
    let handle = spawn(snapshot(true, email_chain(), ops_groups()), executor);

    let err = handle.dispatch("nope", false, context()).await.unwrap_err();
    assert!(matches!(err, DispatchError::ChainNotFound(name) if name == "nope"));
}

#[tokio::test]
async fn unknown_and_malformed_data_groups_abort_the_dispatch() {
    let chains = HashMap::from([(
        "default".to_string(),
        vec![ActionStep {
            action: ACTION_EMAIL.to_string(),
            data_groups: vec!["ghost".to_string()],
        }],
    )]);
    let executor = Arc::new(RecordingExecutor::default());
    let handle = spawn(snapshot(true, chains, ops_groups()), executor.clone());

    let err = handle.dispatch("default", false, context()).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownDataGroup(name) if name == "ghost"));

    let chains = HashMap::from([(
        "default".to_string(),
        vec![ActionStep {
            action: ACTION_EMAIL.to_string(),
            data_groups: vec!["block".to_string()], // has no email_address
        }],
    )]);
    let handle = spawn(snapshot(true, chains, ops_groups()), executor.clone());

    let err = handle.dispatch("default", false, context()).await.unwrap_err();
    assert!(matches!(err, DispatchError::MalformedDataGroup { group, .. } if group == "block"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn concurrent_dispatches_never_interleave() {
    let executor = Arc::new(RecordingExecutor::with_work(Duration::from_millis(50)));
    let handle = spawn(snapshot(true, email_chain(), ops_groups()), executor.clone());

    let a = handle.clone();
    let b = handle.clone();
    let ctx = context();
    let (ra, rb) = tokio::join!(
        a.dispatch("default", false, ctx.clone()),
        b.dispatch("default", false, ctx),
    );
    ra.unwrap();
    rb.unwrap();

    let intervals = executor.intervals.lock().unwrap().clone();
    assert_eq!(intervals.len(), 2);
    let (first, second) = if intervals[0].0 <= intervals[1].0 {
        (intervals[0], intervals[1])
    } else {
        (intervals[1], intervals[0])
    };
    assert!(
        first.1 <= second.0,
        "executor calls overlapped: {first:?} vs {second:?}"
    );
}

#[test]
fn body_lists_hits_per_prefix() {
    let mut one = AggregatedHit::new("351");
    one.record("351123456789");
    one.record("351987654321");
    let mut two = AggregatedHit::new("244");
    two.record("244555000111");
    let body = format_body(&AlertContext::hits("Dangerous Destinations", vec![one, two]));

    assert!(body.contains("prefix 351: 2 hits (351123456789, 351987654321)"));
    assert!(body.contains("prefix 244: 1 hits (244555000111)"));

    let body = format_body(&AlertContext::active_calls("Simultaneous Calls", 12, 10));
    assert!(body.contains("12 active calls (threshold 10)"));
}
