use thiserror::Error;

use qadmit_core::id::{QueryId, RelationId};

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("unknown message kind {0}")]
    UnknownMessageKind(u32),

    #[error("malformed {kind} payload: {reason}")]
    Decode { kind: &'static str, reason: String },

    #[error("failed to encode {kind} payload: {reason}")]
    Encode { kind: &'static str, reason: String },

    #[error("query {0} is not admitted")]
    UnknownQuery(QueryId),

    #[error("query {0} was already submitted")]
    DuplicateQuery(QueryId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("empty query batch")]
    EmptyBatch,

    #[error("relation {0} not found in catalog")]
    UnknownRelation(RelationId),

    #[error("catalog: {0}")]
    Catalog(String),

    #[error("work-order profiling is disabled")]
    ProfilingDisabled,

    #[error("no profiling results for query {0}")]
    NoProfilingResults(QueryId),

    #[error("internal invariant failed: {0}")]
    Invariant(String),

    #[error("state machine: {0}")]
    StateMachine(String),
}

impl ExecError {
    /// Fatal errors leave dispatch state untrustworthy; the owning control
    /// loop must stop rather than keep consuming messages.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExecError::UnknownMessageKind(_)
                | ExecError::Decode { .. }
                | ExecError::Encode { .. }
                | ExecError::UnknownRelation(_)
                | ExecError::Catalog(_)
                | ExecError::Invariant(_)
                | ExecError::StateMachine(_)
        )
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match self {
            ExecError::Decode { kind, reason } => ExecError::Decode {
                kind,
                reason: format!("{ctx}: {reason}"),
            },
            ExecError::Catalog(msg) => ExecError::Catalog(format!("{ctx}: {msg}")),
            ExecError::Invariant(msg) => ExecError::Invariant(format!("{ctx}: {msg}")),
            ExecError::StateMachine(msg) => ExecError::StateMachine(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExecError::UnknownMessageKind(kind) => vec![
                format!("Message kind {kind} is not part of the worker protocol"),
                "Check that workers and enforcer were built from the same protocol version".into(),
            ],
            ExecError::Decode { .. } => vec![
                "Check that the worker-side encoder matches the enforcer's message schema".into(),
            ],
            ExecError::UnknownQuery(_) => vec![
                "The query may already have retired; late messages for it can be dropped".into(),
                "Verify that the query was admitted before its workers started".into(),
            ],
            ExecError::DuplicateQuery(_) => {
                vec!["Query ids must be unique across the enforcer's lifetime".into()]
            }
            ExecError::ProfilingDisabled => {
                vec!["Enable profile_work_orders in PolicyConfig".into()]
            }
            _ => vec![],
        }
    }
}

impl From<qadmit_core::error::Error> for ExecError {
    fn from(e: qadmit_core::error::Error) -> Self {
        ExecError::Catalog(e.to_string())
    }
}
