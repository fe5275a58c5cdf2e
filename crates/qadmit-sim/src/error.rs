use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] qadmit_core::error::Error),

    #[error(transparent)]
    Exec(#[from] qadmit_exec::ExecError),

    #[error("event {index} ({event}): {source}")]
    Step {
        index: usize,
        event: &'static str,
        #[source]
        source: qadmit_exec::ExecError,
    },

    #[error("invalid workload: {0}")]
    Workload(String),
}

impl SimError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            SimError::Core(e) => e.suggestions(),
            SimError::Exec(e) | SimError::Step { source: e, .. } => e.suggestions(),
            SimError::Workload(msg) if msg.contains("query") => vec![
                "Every event must reference a query declared under `queries`".into(),
            ],
            SimError::Workload(msg) if msg.contains("relation") => vec![
                "Every event must reference a relation declared under `relations`".into(),
            ],
            _ => vec![],
        }
    }
}
