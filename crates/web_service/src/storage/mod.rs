pub mod file_provider;
pub mod snapshot;

use thiserror::Error;

pub use file_provider::FileSessionStorage;
pub use snapshot::SessionSnapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
