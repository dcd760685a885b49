use staffquiz_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("note pool is empty")]
    EmptyPool,
    #[error(transparent)]
    Domain(#[from] DomainError),
}
