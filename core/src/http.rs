use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is used to send http requests to the vendor gateways.
///
/// This trait exists so clients stay transport-agnostic and tests can
/// substitute a scripted transport for the real one.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}
