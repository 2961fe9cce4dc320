mod support;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use support::fake_context;
use tongsim_lite::{ContextError, DynConnection, Entity, EntityError, LogLevel, WorldContext};

/// Moves an actor by issuing calls through the session.
struct MotionOps;

impl MotionOps {
    fn move_to(&self, entity: &Entity, x: f64) -> Result<Vec<u8>, ContextError<tongsim_lite::ConnectionError>> {
        let payload = format!("{}:{}", entity.id(), x).into_bytes();
        entity.context().sync_run(
            move |conn: DynConnection| async move { conn.call("MoveTo", payload).await },
            Some(Duration::from_secs(1)),
        )
    }
}

#[derive(Debug, PartialEq)]
struct CameraOps {
    fov: f64,
}

fn shared_context() -> Arc<WorldContext> {
    let (ctx, _connector, _journal, _capture) = fake_context(LogLevel::Warn);
    Arc::new(ctx)
}

#[test]
fn capabilities_are_looked_up_by_type() {
    let entity = Entity::new("drone-1", shared_context())
        .with_capability(MotionOps)
        .with_capability(CameraOps { fov: 90.0 });

    assert!(entity.has_capability::<MotionOps>());
    assert_eq!(entity.capability::<CameraOps>(), Some(&CameraOps { fov: 90.0 }));

    let reply = entity.require::<MotionOps>().unwrap().move_to(&entity, 2.5).unwrap();
    assert_eq!(reply, b"drone-1:2.5".to_vec());
}

#[test]
fn missing_capability_is_an_error() {
    let entity = Entity::new("static-mesh", shared_context()).with_capability(MotionOps);
    let err = entity.require::<CameraOps>().unwrap_err();
    match err {
        EntityError::MissingCapability { entity, capability } => {
            assert_eq!(entity, "static-mesh");
            assert!(capability.ends_with("CameraOps"));
        }
    }
    assert!(entity.capability::<CameraOps>().is_none());
}

#[test]
fn inserting_replaces_same_type() {
    let mut entity = Entity::new("cam", shared_context());
    assert!(!entity.insert_capability(CameraOps { fov: 60.0 }));
    assert!(entity.insert_capability(CameraOps { fov: 75.0 }));
    assert_eq!(entity.require::<CameraOps>().unwrap().fov, 75.0);
    assert_eq!(entity.capability_names().len(), 1);
}

#[test]
fn entities_share_one_session() {
    let ctx = shared_context();
    let a = Entity::new("a", ctx.clone()).with_capability(MotionOps);
    let b = Entity::new("b", ctx.clone());
    assert!(Arc::ptr_eq(a.context(), b.context()));

    let names = a.capability_names();
    assert!(names[0].ends_with("MotionOps"));
    assert!(format!("{:?}", b).contains("\"b\""));

    let value = b
        .context()
        .sync_run(|_conn| async { Ok::<_, Infallible>("shared") }, None)
        .unwrap();
    assert_eq!(value, "shared");
}
