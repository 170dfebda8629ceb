use expdj_kernel::database::DatabaseError;
use expdj_kernel::storage::StorageError;
use std::borrow::Cow;

#[expdj_derive::expdj_error]
pub enum ExperimentsError {
    #[http(status = 404)]
    #[error("Unknown experiment{}: {message}", format_context(.context))]
    UnknownExperiment { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(status = 422)]
    #[error("Invalid experiment manifest{}: {message}", format_context(.context))]
    Manifest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Manifest parse error{}: {source}", format_context(.context))]
    Serde { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Library I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Asset storage error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Record store error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[cfg(feature = "server")]
impl From<ExperimentsError> for expdj_kernel::server::ApiError {
    fn from(err: ExperimentsError) -> Self {
        match err {
            ExperimentsError::Storage { source, context } => Self::Storage { source, context },
            ExperimentsError::Database { source, context } => Self::Database { source, context },
            ExperimentsError::UnknownExperiment { .. } => {
                Self::NotFound { message: err.to_string().into(), context: None }
            },
            other => Self::Library { message: other.to_string().into(), context: None },
        }
    }
}
