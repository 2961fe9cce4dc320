//! Capture cameras: creation, placement and frame snapshots.

use super::types::{CameraDescriptor, CameraParams, CameraSpec, CaptureFrame, CaptureStatus, SnapshotOptions};
use super::wire::WireTransform;
use super::{rpc, rpc_field, rpc_unit};
use crate::common::ApiError;
use crate::domains::connection::Connection;
use crate::domains::math::Transform;
use serde_json::json;
use std::time::Duration;

pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn list_cameras(conn: &dyn Connection) -> Result<Vec<CameraDescriptor>, ApiError> {
    let cameras: Option<Vec<CameraDescriptor>> =
        rpc_field(conn, "Capture/ListCaptureCameras", &json!({}), "cameras", CAPTURE_TIMEOUT).await?;
    Ok(cameras.unwrap_or_default())
}

/// Create a capture camera and return its id.
pub async fn create_camera(conn: &dyn Connection, spec: &CameraSpec) -> Result<String, ApiError> {
    rpc_field(conn, "Capture/CreateCaptureCamera", spec, "camera_id", CAPTURE_TIMEOUT).await
}

pub async fn destroy_camera(conn: &dyn Connection, camera_id: &str, force_stop: bool) -> Result<(), ApiError> {
    rpc_unit(
        conn,
        "Capture/DestroyCaptureCamera",
        &json!({ "camera_id": camera_id, "force_stop_capture": force_stop }),
        CAPTURE_TIMEOUT,
    )
    .await
}

pub async fn set_camera_pose(conn: &dyn Connection, camera_id: &str, transform: &Transform) -> Result<(), ApiError> {
    rpc_unit(
        conn,
        "Capture/SetCaptureCameraPose",
        &json!({ "camera_id": camera_id, "world_transform": WireTransform::from(transform) }),
        CAPTURE_TIMEOUT,
    )
    .await
}

pub async fn update_camera_params(conn: &dyn Connection, camera_id: &str, params: &CameraParams) -> Result<(), ApiError> {
    rpc_unit(
        conn,
        "Capture/UpdateCaptureCameraParams",
        &json!({ "camera_id": camera_id, "params": params }),
        CAPTURE_TIMEOUT,
    )
    .await
}

pub async fn attach_camera(
    conn: &dyn Connection,
    camera_id: &str,
    parent_id: &str,
    socket_name: &str,
    keep_world: bool,
) -> Result<(), ApiError> {
    let request = json!({
        "camera_id": camera_id,
        "parent_actor_id": parent_id,
        "socket_name": socket_name,
        "keep_world": keep_world,
    });
    rpc_unit(conn, "Capture/AttachCaptureCamera", &request, CAPTURE_TIMEOUT).await
}

/// Grab one frame. The call waits the server-side frame timeout plus the
/// usual capture deadline.
pub async fn capture_snapshot(
    conn: &dyn Connection,
    camera_id: &str,
    options: &SnapshotOptions,
) -> Result<CaptureFrame, ApiError> {
    let request = json!({
        "camera_id": camera_id,
        "include_color": options.include_color,
        "include_depth": options.include_depth,
        "timeout_seconds": options.timeout_seconds,
    });
    let wait = Duration::try_from_secs_f64(options.timeout_seconds.max(0.0)).unwrap_or(Duration::ZERO);
    rpc(conn, "Capture/CaptureSnapshot", &request, CAPTURE_TIMEOUT.saturating_add(wait)).await
}

pub async fn get_status(conn: &dyn Connection, camera_id: &str) -> Result<CaptureStatus, ApiError> {
    rpc_field(
        conn,
        "Capture/GetCaptureStatus",
        &json!({ "camera_id": camera_id }),
        "status",
        CAPTURE_TIMEOUT,
    )
    .await
}
