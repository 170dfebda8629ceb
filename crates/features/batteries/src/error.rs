use expdj_kernel::database::DatabaseError;
use std::borrow::Cow;

#[expdj_derive::expdj_error]
pub enum BatteriesError {
    #[http(status = 400)]
    #[error("Missing field{}: {message}", format_context(.context))]
    MissingField { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(status = 400)]
    #[error("Invalid field{}: {message}", format_context(.context))]
    InvalidField { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(status = 404)]
    #[error("Not found{}: {message}", format_context(.context))]
    UnknownRecord { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Record store error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl BatteriesError {
    pub(crate) fn unknown(what: impl Into<Cow<'static, str>>) -> Self {
        Self::UnknownRecord { message: what.into(), context: None }
    }
}

#[cfg(feature = "server")]
impl From<BatteriesError> for expdj_kernel::server::ApiError {
    fn from(err: BatteriesError) -> Self {
        match err {
            BatteriesError::MissingField { .. } | BatteriesError::InvalidField { .. } => {
                Self::BadRequest { message: err.to_string().into(), context: None }
            },
            BatteriesError::UnknownRecord { message, context } => Self::NotFound { message, context },
            BatteriesError::Database { source, context } => Self::Database { source, context },
            BatteriesError::Internal { message, context } => Self::Internal { message, context },
        }
    }
}
