use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Registry has been shut down")]
    Shutdown,

    #[error("Rejected write for instance {id}: {reason}")]
    Rejected { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
