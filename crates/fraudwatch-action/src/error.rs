/// Errors surfaced by the action-chain dispatcher.
///
/// All variants are configuration-integrity problems (validated at load,
/// re-checked here defensively) except [`DispatchError::WorkerUnavailable`],
/// which means the dispatch worker task is gone. None of them affect the
/// alarm condition itself; the monitor will attempt dispatch again on its
/// next alarming tick.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("action chain '{0}' is not configured")]
    ChainNotFound(String),

    #[error("data group '{0}' is not configured")]
    UnknownDataGroup(String),

    #[error("data group '{group}' is missing the '{field}' field required by {action}")]
    MalformedDataGroup {
        group: String,
        field: &'static str,
        action: &'static str,
    },

    #[error("unsupported action '{0}' in chain")]
    UnsupportedAction(String),

    #[error("the dispatch worker is not running")]
    WorkerUnavailable,
}
