//! Scene-level calls: actor queries and transforms, spawning, movement,
//! navigation and manipulation.

use super::types::{
    ActionResult, ActorInfo, ActorState, Hand, MoveOptions, MoveOutcome, NavigateOptions, NavigationPath,
    NavigationResult, PathQuery,
};
use super::wire::{WireTransform, WireVector};
use super::{rpc, rpc_field, rpc_unit, DEFAULT_CALL_TIMEOUT};
use crate::common::ApiError;
use crate::domains::connection::Connection;
use crate::domains::math::{Transform, Vector3};
use serde_json::json;
use std::time::Duration;

pub const RESET_LEVEL_TIMEOUT: Duration = Duration::from_secs(60);
/// Movement calls return when the actor arrives, which can take a while.
pub const MOVE_TIMEOUT: Duration = Duration::from_secs(3600);
pub const SPAWN_TIMEOUT: Duration = Duration::from_secs(5);
pub const MANIPULATION_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn query_info(conn: &dyn Connection) -> Result<Vec<ActorState>, ApiError> {
    let states: Option<Vec<ActorState>> =
        rpc_field(conn, "DemoRL/QueryState", &json!({}), "actor_states", DEFAULT_CALL_TIMEOUT).await?;
    Ok(states.unwrap_or_default())
}

pub async fn reset_level(conn: &dyn Connection, timeout: Duration) -> Result<(), ApiError> {
    rpc_unit(conn, "DemoRL/ResetLevel", &json!({}), timeout).await
}

/// Move an actor in a straight line towards `target`.
pub async fn simple_move_towards(
    conn: &dyn Connection,
    actor_id: &str,
    target: &Vector3,
    options: &MoveOptions,
) -> Result<MoveOutcome, ApiError> {
    let mut request = json!({
        "actor_id": actor_id,
        "target_location": WireVector::from(target),
        "orientation_mode": options.orientation.mode(),
        "speed_uu_per_sec": options.speed_uu_per_sec,
        "tolerance_uu": options.tolerance_uu,
    });
    if let Some(forward) = options.orientation.forward() {
        request["given_orientation"] = json!(forward);
    }
    rpc(conn, "DemoRL/SimpleMoveTowards", &request, options.timeout).await
}

pub async fn get_actor_state(conn: &dyn Connection, actor_id: &str) -> Result<ActorState, ApiError> {
    rpc_field(
        conn,
        "DemoRL/GetActorState",
        &json!({ "actor_id": actor_id }),
        "actor_state",
        DEFAULT_CALL_TIMEOUT,
    )
    .await
}

pub async fn get_actor_transform(conn: &dyn Connection, actor_id: &str) -> Result<Transform, ApiError> {
    let wire: WireTransform = rpc_field(
        conn,
        "DemoRL/GetActorTransform",
        &json!({ "actor_id": actor_id }),
        "transform",
        DEFAULT_CALL_TIMEOUT,
    )
    .await?;
    Ok(wire.into())
}

/// Teleport an actor to a world transform.
pub async fn set_actor_transform(conn: &dyn Connection, actor_id: &str, transform: &Transform) -> Result<(), ApiError> {
    let request = json!({
        "actor_id": actor_id,
        "transform": WireTransform::from(transform),
    });
    rpc_unit(conn, "DemoRL/SetActorTransform", &request, DEFAULT_CALL_TIMEOUT).await
}

pub async fn spawn_actor(
    conn: &dyn Connection,
    blueprint: &str,
    transform: &Transform,
    name: Option<&str>,
    tags: &[String],
) -> Result<ActorInfo, ApiError> {
    let mut request = json!({
        "blueprint": blueprint,
        "transform": WireTransform::from(transform),
    });
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        request["name"] = json!(name);
    }
    if !tags.is_empty() {
        request["tags"] = json!(tags);
    }
    rpc_field(conn, "DemoRL/SpawnActor", &request, "actor", SPAWN_TIMEOUT).await
}

pub async fn destroy_actor(conn: &dyn Connection, actor_id: &str) -> Result<(), ApiError> {
    rpc_unit(
        conn,
        "DemoRL/DestroyActor",
        &json!({ "actor_id": actor_id }),
        DEFAULT_CALL_TIMEOUT,
    )
    .await
}

/// Run an engine console command. Returns whether the server accepted it.
pub async fn exec_console_command(conn: &dyn Connection, command: &str, write_to_log: bool) -> Result<bool, ApiError> {
    let accepted: Option<bool> = rpc_field(
        conn,
        "DemoRL/ExecConsoleCommand",
        &json!({ "command": command, "write_to_log": write_to_log }),
        "success",
        DEFAULT_CALL_TIMEOUT,
    )
    .await?;
    Ok(accepted.unwrap_or(false))
}

pub async fn query_navigation_path(
    conn: &dyn Connection,
    start: &Vector3,
    end: &Vector3,
    query: &PathQuery,
) -> Result<NavigationPath, ApiError> {
    let mut request = json!({
        "start": WireVector::from(start),
        "end": WireVector::from(end),
        "allow_partial": query.allow_partial,
        "require_navigable_end_location": query.require_navigable_end_location,
    });
    if let Some(limit) = query.cost_limit.filter(|limit| *limit > 0.0) {
        request["cost_limit"] = json!(limit);
    }
    rpc(conn, "DemoRL/QueryNavigationPath", &request, DEFAULT_CALL_TIMEOUT).await
}

/// Walk a character to `target` along the navigation mesh.
pub async fn navigate_to_location(
    conn: &dyn Connection,
    actor_id: &str,
    target: &Vector3,
    options: &NavigateOptions,
) -> Result<NavigationResult, ApiError> {
    let mut request = json!({
        "actor_id": actor_id,
        "target_location": WireVector::from(target),
        "accept_radius": options.accept_radius,
        "allow_partial": options.allow_partial,
    });
    if let Some(speed) = options.speed_uu_per_sec {
        request["speed_uu_per_sec"] = json!(speed);
    }
    rpc(conn, "DemoRL/NavigateToLocation", &request, options.timeout).await
}

pub async fn pick_up_object(
    conn: &dyn Connection,
    actor_id: &str,
    target_object_id: &str,
    target_object_location: Option<&Vector3>,
    hand: Hand,
) -> Result<ActionResult, ApiError> {
    let mut request = json!({
        "actor_id": actor_id,
        "target_object_id": target_object_id,
        "hand": hand,
    });
    if let Some(location) = target_object_location {
        request["target_object_location"] = json!(WireVector::from(location));
    }
    rpc(conn, "DemoRL/PickUpObject", &request, MANIPULATION_TIMEOUT).await
}

pub async fn drop_object(
    conn: &dyn Connection,
    actor_id: &str,
    target_drop_location: &Vector3,
    hand: Hand,
    enable_physics: bool,
) -> Result<ActionResult, ApiError> {
    let request = json!({
        "actor_id": actor_id,
        "target_drop_location": WireVector::from(target_drop_location),
        "hand": hand,
        "enable_physics": enable_physics,
    });
    rpc(conn, "DemoRL/DropObject", &request, MANIPULATION_TIMEOUT).await
}
