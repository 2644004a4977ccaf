use thiserror::Error;

use crate::manager::ManagerError;
use crate::media::MediaError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    /// A foreign id supplied by the caller does not resolve.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("media error: {0}")]
    Media(#[from] MediaError),
    /// More than one row matched a lookup that must be unique.
    #[error("ambiguous lookup: {0}")]
    AmbiguousLookup(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn invalid_reference(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::InvalidReference(format!("{} {} does not exist", entity, id))
    }
}

impl From<ManagerError> for ServiceError {
    fn from(e: ManagerError) -> Self {
        match e {
            ManagerError::Ambiguous { .. } => ServiceError::AmbiguousLookup(e.to_string()),
            ManagerError::Db(inner) => ServiceError::Db(inner.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Db(e.to_string())
    }
}
