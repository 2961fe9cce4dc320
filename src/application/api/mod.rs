//! Typed calls over a [`Connection`].
//!
//! Requests and replies are JSON documents; vectors and transforms use the
//! shapes in [`wire`]. Every call carries its own deadline. A call that runs
//! past it is abandoned, which also drops its in-flight exchange on the
//! connection.
//!
//! The async functions in [`scene`], [`arena`] and [`capture`] are meant to
//! run on the session loop, e.g. inside [`WorldContext::async_task`]. From
//! ordinary threads use [`blocking`] or the [`UtilFuncs`](crate::UtilFuncs)
//! helpers.

pub mod arena;
pub mod capture;
pub mod scene;
pub mod types;
pub mod wire;

pub use types::*;

use crate::application::world_context::WorldContext;
use crate::common::ApiError;
use crate::domains::connection::{Connection, DynConnection};
use crate::domains::logger::{ModuleLogger, SdkLogger};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

/// Default deadline for quick queries and setters.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Slack added to the caller's wait in [`blocking`], so the call's own
/// deadline fires first and is reported as `ApiError::Timeout`.
const BLOCKING_GRACE: Duration = Duration::from_secs(1);

/// Send `request` as JSON to `method` and decode the reply. An empty reply
/// body reads as JSON `null`.
pub async fn rpc<Req, Resp>(
    conn: &dyn Connection,
    method: &'static str,
    request: &Req,
    timeout: Duration,
) -> Result<Resp, ApiError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_vec(request).map_err(|source| ApiError::Encode { method, source })?;
    let reply = tokio::time::timeout(timeout, conn.call(method, payload))
        .await
        .map_err(|_| ApiError::Timeout { method, timeout })?
        .map_err(|source| ApiError::Call { method, source })?;
    let body: &[u8] = if reply.is_empty() { b"null" } else { &reply };
    serde_json::from_slice(body).map_err(|source| ApiError::Decode { method, source })
}

/// Like [`rpc`] for replies shaped `{"<field>": value}`; yields the value.
/// A missing field reads as `null`.
pub async fn rpc_field<Req, T>(
    conn: &dyn Connection,
    method: &'static str,
    request: &Req,
    field: &str,
    timeout: Duration,
) -> Result<T, ApiError>
where
    Req: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let mut reply: Map<String, Value> = rpc(conn, method, request, timeout).await?;
    let value = reply.remove(field).unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|source| ApiError::Decode { method, source })
}

/// Call `method` for its effect only; whatever the reply holds is ignored.
pub async fn rpc_unit<Req>(
    conn: &dyn Connection,
    method: &'static str,
    request: &Req,
    timeout: Duration,
) -> Result<(), ApiError>
where
    Req: Serialize + ?Sized,
{
    let _: serde::de::IgnoredAny = rpc(conn, method, request, timeout).await?;
    Ok(())
}

/// Await `call`; on error log it under `name` and return `fallback` instead.
pub async fn guarded<T, F>(logger: &ModuleLogger, name: &str, fallback: T, call: F) -> T
where
    F: Future<Output = Result<T, ApiError>>,
{
    logger.debug(&format!("call {}", name));
    match call.await {
        Ok(value) => value,
        Err(e) => {
            logger.error(&format!("call {} failed: {}", name, e));
            fallback
        }
    }
}

/// Run one typed call on the context's loop and block for its result.
///
/// API errors come back as values, so a failed call never ends the session.
/// `timeout` is the call's own deadline; the wait gets a little extra on top.
pub fn blocking<T, F, Fut>(context: &WorldContext, timeout: Duration, call: F) -> Result<T, ApiError>
where
    F: FnOnce(DynConnection) -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: Send + 'static,
{
    context.sync_run(
        move |conn| {
            let fut = call(conn);
            async move { Ok::<_, Infallible>(fut.await) }
        },
        Some(timeout.saturating_add(BLOCKING_GRACE)),
    )?
}
