//! Capability sets for the entity kinds the SDK knows about.
//!
//! Each ability is bound to one entity's id and session when it is built, so
//! a holder can call it without passing the entity around:
//! `agent.require::<AgentActionAbility>()?.move_towards(&target, &MoveOptions::default())`.

use crate::application::api::{
    self, capture, scene, ActionResult, ActorState, CameraParams, CameraSpec, CaptureFrame, CaptureStatus, Hand,
    MoveOptions, MoveOutcome, NavigateOptions, NavigationPath, NavigationResult, PathQuery, SnapshotOptions,
    DEFAULT_CALL_TIMEOUT,
};
use crate::application::world_context::WorldContext;
use crate::common::ApiError;
use crate::domains::entity::Entity;
use crate::domains::math::{Transform, Vector3};
use std::sync::Arc;
use std::time::Duration;

/// Reads and places an actor in the world.
pub struct ActorAbility {
    id: String,
    context: Arc<WorldContext>,
}

impl ActorAbility {
    pub fn for_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id().to_string(),
            context: entity.context().clone(),
        }
    }

    pub fn transform(&self) -> Result<Transform, ApiError> {
        let id = self.id.clone();
        api::blocking(&self.context, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::get_actor_transform(&*conn, &id).await
        })
    }

    pub fn set_transform(&self, transform: &Transform) -> Result<(), ApiError> {
        let id = self.id.clone();
        let transform = *transform;
        api::blocking(&self.context, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::set_actor_transform(&*conn, &id, &transform).await
        })
    }

    pub fn state(&self) -> Result<ActorState, ApiError> {
        let id = self.id.clone();
        api::blocking(&self.context, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::get_actor_state(&*conn, &id).await
        })
    }

    pub fn location(&self) -> Result<Vector3, ApiError> {
        self.state().map(|state| state.location)
    }

    pub fn destroy(&self) -> Result<(), ApiError> {
        let id = self.id.clone();
        api::blocking(&self.context, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::destroy_actor(&*conn, &id).await
        })
    }
}

/// Movement, navigation and manipulation for a controllable character.
pub struct AgentActionAbility {
    id: String,
    context: Arc<WorldContext>,
}

impl AgentActionAbility {
    pub fn for_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id().to_string(),
            context: entity.context().clone(),
        }
    }

    pub fn move_towards(&self, target: &Vector3, options: &MoveOptions) -> Result<MoveOutcome, ApiError> {
        let id = self.id.clone();
        let target = *target;
        let options = *options;
        api::blocking(&self.context, options.timeout, move |conn| async move {
            scene::simple_move_towards(&*conn, &id, &target, &options).await
        })
    }

    pub fn navigate_to(&self, target: &Vector3, options: &NavigateOptions) -> Result<NavigationResult, ApiError> {
        let id = self.id.clone();
        let target = *target;
        let options = *options;
        api::blocking(&self.context, options.timeout, move |conn| async move {
            scene::navigate_to_location(&*conn, &id, &target, &options).await
        })
    }

    /// Path from the agent's current location to `target`.
    pub fn path_to(&self, target: &Vector3, query: &PathQuery) -> Result<NavigationPath, ApiError> {
        let id = self.id.clone();
        let target = *target;
        let query = *query;
        api::blocking(&self.context, DEFAULT_CALL_TIMEOUT.saturating_mul(2), move |conn| async move {
            let start = scene::get_actor_state(&*conn, &id).await?.location;
            scene::query_navigation_path(&*conn, &start, &target, &query).await
        })
    }

    pub fn pick_up(&self, object_id: &str, object_location: Option<Vector3>, hand: Hand) -> Result<ActionResult, ApiError> {
        let id = self.id.clone();
        let object_id = object_id.to_string();
        api::blocking(&self.context, scene::MANIPULATION_TIMEOUT, move |conn| async move {
            scene::pick_up_object(&*conn, &id, &object_id, object_location.as_ref(), hand).await
        })
    }

    pub fn drop_at(&self, location: &Vector3, hand: Hand, enable_physics: bool) -> Result<ActionResult, ApiError> {
        let id = self.id.clone();
        let location = *location;
        api::blocking(&self.context, scene::MANIPULATION_TIMEOUT, move |conn| async move {
            scene::drop_object(&*conn, &id, &location, hand, enable_physics).await
        })
    }
}

/// Control of one capture camera.
pub struct CameraAbility {
    camera_id: String,
    context: Arc<WorldContext>,
}

impl CameraAbility {
    pub fn for_entity(entity: &Entity) -> Self {
        Self {
            camera_id: entity.id().to_string(),
            context: entity.context().clone(),
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn set_pose(&self, transform: &Transform) -> Result<(), ApiError> {
        let id = self.camera_id.clone();
        let transform = *transform;
        api::blocking(&self.context, capture::CAPTURE_TIMEOUT, move |conn| async move {
            capture::set_camera_pose(&*conn, &id, &transform).await
        })
    }

    pub fn update_params(&self, params: &CameraParams) -> Result<(), ApiError> {
        let id = self.camera_id.clone();
        let params = params.clone();
        api::blocking(&self.context, capture::CAPTURE_TIMEOUT, move |conn| async move {
            capture::update_camera_params(&*conn, &id, &params).await
        })
    }

    pub fn attach_to(&self, parent_id: &str, socket: &str, keep_world: bool) -> Result<(), ApiError> {
        let id = self.camera_id.clone();
        let parent = parent_id.to_string();
        let socket = socket.to_string();
        api::blocking(&self.context, capture::CAPTURE_TIMEOUT, move |conn| async move {
            capture::attach_camera(&*conn, &id, &parent, &socket, keep_world).await
        })
    }

    pub fn snapshot(&self, options: &SnapshotOptions) -> Result<CaptureFrame, ApiError> {
        let id = self.camera_id.clone();
        let options = *options;
        let frame_wait = Duration::try_from_secs_f64(options.timeout_seconds.max(0.0)).unwrap_or(Duration::ZERO);
        let wait = capture::CAPTURE_TIMEOUT.saturating_add(frame_wait);
        api::blocking(&self.context, wait, move |conn| async move {
            capture::capture_snapshot(&*conn, &id, &options).await
        })
    }

    pub fn status(&self) -> Result<CaptureStatus, ApiError> {
        let id = self.camera_id.clone();
        api::blocking(&self.context, capture::CAPTURE_TIMEOUT, move |conn| async move {
            capture::get_status(&*conn, &id).await
        })
    }

    pub fn destroy(&self, force_stop: bool) -> Result<(), ApiError> {
        let id = self.camera_id.clone();
        api::blocking(&self.context, capture::CAPTURE_TIMEOUT, move |conn| async move {
            capture::destroy_camera(&*conn, &id, force_stop).await
        })
    }
}

/// An agent: an actor that can also move and manipulate objects.
pub fn agent_entity(id: impl Into<String>, context: Arc<WorldContext>) -> Entity {
    let entity = Entity::new(id, context);
    let actor = ActorAbility::for_entity(&entity);
    let actions = AgentActionAbility::for_entity(&entity);
    entity.with_capability(actor).with_capability(actions)
}

/// Wrap an existing capture camera.
pub fn camera_entity(camera_id: impl Into<String>, context: Arc<WorldContext>) -> Entity {
    let entity = Entity::new(camera_id, context);
    let camera = CameraAbility::for_entity(&entity);
    entity.with_capability(camera)
}

/// Create a capture camera on the server and wrap it.
pub fn create_camera_entity(context: &Arc<WorldContext>, spec: &CameraSpec) -> Result<Entity, ApiError> {
    let spec = spec.clone();
    let camera_id = api::blocking(context, capture::CAPTURE_TIMEOUT, move |conn| async move {
        capture::create_camera(&*conn, &spec).await
    })?;
    Ok(camera_entity(camera_id, context.clone()))
}
