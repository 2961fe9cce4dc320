//! Arenas: sub-levels loaded at an anchor transform, each with its own local
//! coordinate frame.

use super::types::{ActorInfo, ArenaInfo, MoveOutcome, Orientation};
use super::wire::{WireTransform, WireVector};
use super::{rpc, rpc_field, rpc_unit, DEFAULT_CALL_TIMEOUT};
use crate::common::ApiError;
use crate::domains::connection::Connection;
use crate::domains::math::{Transform, Vector3};
use serde_json::json;
use std::time::Duration;

pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);
pub const DESTROY_TIMEOUT: Duration = Duration::from_secs(5);
pub const RESET_TIMEOUT: Duration = Duration::from_secs(30);
pub const SPAWN_TIMEOUT: Duration = Duration::from_secs(5);
pub const MOVE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Load `level_asset_path` at `anchor` and return the new arena's id.
pub async fn load_arena(
    conn: &dyn Connection,
    level_asset_path: &str,
    anchor: &Transform,
    make_visible: bool,
) -> Result<String, ApiError> {
    let request = json!({
        "level_asset_path": level_asset_path,
        "anchor": WireTransform::from(anchor),
        "make_visible": make_visible,
    });
    rpc_field(conn, "Arena/LoadArena", &request, "arena_id", LOAD_TIMEOUT).await
}

pub async fn destroy_arena(conn: &dyn Connection, arena_id: &str) -> Result<(), ApiError> {
    rpc_unit(conn, "Arena/DestroyArena", &json!({ "arena_id": arena_id }), DESTROY_TIMEOUT).await
}

pub async fn reset_arena(conn: &dyn Connection, arena_id: &str) -> Result<(), ApiError> {
    rpc_unit(conn, "Arena/ResetArena", &json!({ "arena_id": arena_id }), RESET_TIMEOUT).await
}

pub async fn set_arena_visible(conn: &dyn Connection, arena_id: &str, visible: bool) -> Result<(), ApiError> {
    rpc_unit(
        conn,
        "Arena/SetArenaVisible",
        &json!({ "arena_id": arena_id, "visible": visible }),
        DEFAULT_CALL_TIMEOUT,
    )
    .await
}

pub async fn list_arenas(conn: &dyn Connection) -> Result<Vec<ArenaInfo>, ApiError> {
    let arenas: Option<Vec<ArenaInfo>> =
        rpc_field(conn, "Arena/ListArenas", &json!({}), "arenas", DEFAULT_CALL_TIMEOUT).await?;
    Ok(arenas.unwrap_or_default())
}

/// Spawn `class_path` at a transform local to the arena.
pub async fn spawn_actor_in_arena(
    conn: &dyn Connection,
    arena_id: &str,
    class_path: &str,
    local_transform: &Transform,
) -> Result<ActorInfo, ApiError> {
    let request = json!({
        "arena_id": arena_id,
        "class_path": class_path,
        "local_transform": WireTransform::from(local_transform),
    });
    rpc_field(conn, "Arena/SpawnActorInArena", &request, "actor", SPAWN_TIMEOUT).await
}

pub async fn set_actor_pose_local(
    conn: &dyn Connection,
    arena_id: &str,
    actor_id: &str,
    local_transform: &Transform,
    reset_physics: bool,
) -> Result<(), ApiError> {
    let request = json!({
        "arena_id": arena_id,
        "actor_id": actor_id,
        "local_transform": WireTransform::from(local_transform),
        "reset_physics": reset_physics,
    });
    rpc_unit(conn, "Arena/SetActorPoseLocal", &request, DEFAULT_CALL_TIMEOUT).await
}

pub async fn get_actor_pose_local(conn: &dyn Connection, arena_id: &str, actor_id: &str) -> Result<Transform, ApiError> {
    let wire: WireTransform = rpc_field(
        conn,
        "Arena/GetActorPoseLocal",
        &json!({ "arena_id": arena_id, "actor_id": actor_id }),
        "local_transform",
        DEFAULT_CALL_TIMEOUT,
    )
    .await?;
    Ok(wire.into())
}

pub async fn local_to_world(conn: &dyn Connection, arena_id: &str, local: &Transform) -> Result<Transform, ApiError> {
    let wire: WireTransform = rpc_field(
        conn,
        "Arena/LocalToWorld",
        &json!({ "arena_id": arena_id, "local": WireTransform::from(local) }),
        "world",
        DEFAULT_CALL_TIMEOUT,
    )
    .await?;
    Ok(wire.into())
}

pub async fn world_to_local(conn: &dyn Connection, arena_id: &str, world: &Transform) -> Result<Transform, ApiError> {
    let wire: WireTransform = rpc_field(
        conn,
        "Arena/WorldToLocal",
        &json!({ "arena_id": arena_id, "world": WireTransform::from(world) }),
        "local",
        DEFAULT_CALL_TIMEOUT,
    )
    .await?;
    Ok(wire.into())
}

pub async fn destroy_actor_in_arena(conn: &dyn Connection, arena_id: &str, actor_id: &str) -> Result<(), ApiError> {
    rpc_unit(
        conn,
        "Arena/DestroyActorInArena",
        &json!({ "arena_id": arena_id, "actor_id": actor_id }),
        DEFAULT_CALL_TIMEOUT,
    )
    .await
}

/// Straight-line move towards a target given in arena-local coordinates.
pub async fn simple_move_towards_in_arena(
    conn: &dyn Connection,
    arena_id: &str,
    target_local: &Vector3,
    orientation: Orientation,
    timeout: Duration,
) -> Result<MoveOutcome, ApiError> {
    let mut request = json!({
        "arena_id": arena_id,
        "target_local_location": WireVector::from(target_local),
        "orientation_mode": orientation.mode(),
    });
    if let Some(forward) = orientation.forward() {
        request["given_forward"] = json!(forward);
    }
    rpc(conn, "Arena/SimpleMoveTowardsInArena", &request, timeout).await
}
