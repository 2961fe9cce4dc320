use crate::application::api::{self, scene, ActorInfo, ActorState, DEFAULT_CALL_TIMEOUT};
use crate::application::world_context::WorldContext;
use crate::common::ApiError;
use crate::domains::connection::DynConnection;
use crate::domains::logger::{ModuleLogger, SdkLogger};
use crate::domains::math::Transform;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Blocking helpers for everyday world operations.
///
/// Failures are logged and turned into an empty result (`None`, `false`, an
/// empty list), so scripts can stay linear. Use the [`api`] functions
/// directly when the error itself matters.
pub struct UtilFuncs {
    context: Arc<WorldContext>,
    logger: ModuleLogger,
}

impl UtilFuncs {
    pub fn new(context: Arc<WorldContext>) -> Self {
        let logger = context.module_logger("utils");
        Self { context, logger }
    }

    pub fn context(&self) -> &Arc<WorldContext> {
        &self.context
    }

    pub fn actors(&self) -> Vec<ActorState> {
        self.run("query_info", Vec::new(), DEFAULT_CALL_TIMEOUT, |conn| async move {
            scene::query_info(&*conn).await
        })
    }

    pub fn find_actors_by_tag(&self, tag: &str) -> Vec<ActorState> {
        self.actors().into_iter().filter(|actor| actor.tag == tag).collect()
    }

    pub fn find_actor_by_name(&self, name: &str) -> Option<ActorState> {
        self.actors().into_iter().find(|actor| actor.name == name)
    }

    pub fn actor_transform(&self, actor_id: &str) -> Option<Transform> {
        let id = actor_id.to_string();
        self.run("get_actor_transform", None, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::get_actor_transform(&*conn, &id).await.map(Some)
        })
    }

    pub fn teleport(&self, actor_id: &str, transform: &Transform) -> bool {
        let id = actor_id.to_string();
        let transform = *transform;
        self.run("set_actor_transform", false, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::set_actor_transform(&*conn, &id, &transform).await.map(|()| true)
        })
    }

    pub fn spawn(&self, blueprint: &str, transform: &Transform, name: Option<&str>) -> Option<ActorInfo> {
        let blueprint = blueprint.to_string();
        let transform = *transform;
        let name = name.map(str::to_string);
        self.run("spawn_actor", None, scene::SPAWN_TIMEOUT, move |conn| async move {
            scene::spawn_actor(&*conn, &blueprint, &transform, name.as_deref(), &[])
                .await
                .map(Some)
        })
    }

    pub fn destroy(&self, actor_id: &str) -> bool {
        let id = actor_id.to_string();
        self.run("destroy_actor", false, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::destroy_actor(&*conn, &id).await.map(|()| true)
        })
    }

    pub fn reset_level(&self) -> bool {
        self.run("reset_level", false, scene::RESET_LEVEL_TIMEOUT, |conn| async move {
            scene::reset_level(&*conn, scene::RESET_LEVEL_TIMEOUT).await.map(|()| true)
        })
    }

    pub fn console_command(&self, command: &str) -> bool {
        let command = command.to_string();
        self.run("exec_console_command", false, DEFAULT_CALL_TIMEOUT, move |conn| async move {
            scene::exec_console_command(&*conn, &command, true).await
        })
    }

    /// Straight-line distance between two actors' locations.
    pub fn distance_between(&self, a: &str, b: &str) -> Option<f64> {
        let a = self.actor_transform(a)?;
        let b = self.actor_transform(b)?;
        Some((a.location - b.location).norm())
    }

    fn run<T, F, Fut>(&self, name: &str, fallback: T, timeout: Duration, call: F) -> T
    where
        F: FnOnce(DynConnection) -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Send + 'static,
    {
        self.logger.debug(&format!("call {}", name));
        match api::blocking(&self.context, timeout, call) {
            Ok(value) => value,
            Err(e) => {
                self.logger.error(&format!("call {} failed: {}", name, e));
                fallback
            }
        }
    }
}
