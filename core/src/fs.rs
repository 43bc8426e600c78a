use crate::Result;
use std::fmt::Debug;

/// FileRead is used to read the file content entirely in `Vec<u8>`.
///
/// Clients use this to load key and certificate material referenced by
/// path in their configuration.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Read the file content entirely in `Vec<u8>`.
    async fn file_read(&self, path: &str) -> Result<Vec<u8>>;
}
