use crate::application::world_context::WorldContext;
use crate::common::EntityError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct CapabilitySlot {
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// An object in a TongSim world.
///
/// An entity declares what it can do by holding capability objects keyed by
/// type. Callers ask for one explicitly, e.g. `entity.require::<CameraOps>()?`,
/// instead of relying on methods being attached at runtime.
pub struct Entity {
    id: String,
    context: Arc<WorldContext>,
    capabilities: HashMap<TypeId, CapabilitySlot>,
}

impl Entity {
    pub fn new(id: impl Into<String>, context: Arc<WorldContext>) -> Self {
        Self {
            id: id.into(),
            context,
            capabilities: HashMap::new(),
        }
    }

    pub fn with_capability<C: Any + Send + Sync>(mut self, capability: C) -> Self {
        self.insert_capability(capability);
        self
    }

    /// Attach `capability`, replacing any previous one of the same type.
    /// Returns whether one was replaced.
    pub fn insert_capability<C: Any + Send + Sync>(&mut self, capability: C) -> bool {
        self.capabilities
            .insert(
                TypeId::of::<C>(),
                CapabilitySlot {
                    name: type_name::<C>(),
                    value: Box::new(capability),
                },
            )
            .is_some()
    }

    pub fn capability<C: Any>(&self) -> Option<&C> {
        self.capabilities
            .get(&TypeId::of::<C>())
            .and_then(|slot| slot.value.downcast_ref::<C>())
    }

    pub fn require<C: Any>(&self) -> Result<&C, EntityError> {
        self.capability::<C>().ok_or_else(|| EntityError::MissingCapability {
            entity: self.id.clone(),
            capability: type_name::<C>(),
        })
    }

    pub fn has_capability<C: Any>(&self) -> bool {
        self.capabilities.contains_key(&TypeId::of::<C>())
    }

    pub fn capability_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.capabilities.values().map(|slot| slot.name).collect();
        names.sort_unstable();
        names
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &Arc<WorldContext> {
        &self.context
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("capabilities", &self.capability_names())
            .finish()
    }
}
