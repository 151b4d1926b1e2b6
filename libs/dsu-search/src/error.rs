use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Search criteria failed structural constraints.
    #[error("invalid search criteria: {0}")]
    Validation(String),

    /// Filter fragment is syntactically invalid or uses an unsupported operator.
    #[error("invalid filter at byte {pos}: {message}")]
    Parse { pos: usize, message: String },

    /// A predicate or pagination argument is missing or out of range.
    #[error("invalid argument: {0}")]
    Argument(String),
}

impl Error {
    pub(crate) fn parse(pos: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            pos,
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = err
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let codes: Vec<String> = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, codes.join(", "))
            })
            .collect();
        fields.sort();
        Error::Validation(fields.join("; "))
    }
}
