use crate::common::{ConnectionError, ConnectionResult};
use crate::domains::stream::BidiStream;
use async_trait::async_trait;
use std::sync::Arc;

/// Port for a live session with the simulation server.
///
/// Payloads are opaque bytes; the SDK core only sequences these calls and never
/// interprets what travels over them. All methods are expected to run on the
/// loop thread that established the connection.
#[async_trait]
pub trait Connection: Send + Sync {
    fn endpoint(&self) -> &str;

    /// Issue one request and await its response.
    async fn call(&self, method: &str, request: Vec<u8>) -> ConnectionResult<Vec<u8>>;

    /// Open a bidirectional message stream for `method`.
    async fn open_stream(&self, method: &str) -> ConnectionResult<BidiStream<Vec<u8>, Vec<u8>>> {
        Err(ConnectionError::Unsupported(format!("streaming call '{}'", method)))
    }

    /// Close the connection. Closing twice must not fail.
    async fn close(&self) -> ConnectionResult<()>;
}

/// Port that establishes a `Connection` for an endpoint string such as `"127.0.0.1:5726"`.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> ConnectionResult<Arc<dyn Connection>>;
}

pub type DynConnection = Arc<dyn Connection>;
