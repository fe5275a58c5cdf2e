use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use qadmit_core::error::Error;
    /// let err = Error::Catalog("unknown relation 'orders'".into());
    /// let err = err.with_context("while parsing predicates of query 7");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Catalog(msg) => {
                if msg.contains("relation") || msg.contains("attribute") {
                    vec![
                        "Check that the relation and attribute names are spelled correctly".into(),
                        "Qualify columns as relation.attribute".into(),
                    ]
                } else {
                    vec![]
                }
            }
            Error::Parse(msg) => {
                if msg.contains("operator") || msg.contains("literal") {
                    vec![
                        "Check predicate syntax: relation.attribute OP literal".into(),
                        "Quote string literals with ' or \"".into(),
                    ]
                } else {
                    vec![]
                }
            }
            Error::Config(msg) => {
                if msg.contains("attempts") || msg.contains("concurrent") {
                    vec![
                        "Values must be at least 1".into(),
                        "Check the QADMIT_* environment variables".into(),
                    ]
                } else {
                    vec![]
                }
            }
            Error::Context { source, .. } => match source.downcast_ref::<Error>() {
                Some(inner) => inner.suggestions(),
                None => vec![],
            },
            _ => vec![],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
