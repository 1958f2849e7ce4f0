//! Process-wide ownership of tag keys.
//!
//! Each plugin family claims the tag keys it reads (`env`, `flag`, ...) so two
//! plugins cannot silently interpret the same annotation differently. Claims
//! are made by the plugin constructors before first use; a claim by the same
//! owner is idempotent, a claim by a different owner is a programming error
//! and panics.

use std::any::type_name;
use std::collections::BTreeMap;
use parking_lot::Mutex;
use tracing::trace;

static REGISTRY: Mutex<TagRegistry> = Mutex::new(TagRegistry::new());

/// Tag key to owning plugin type.
#[derive(Debug, Default)]
pub struct TagRegistry {
    owners: BTreeMap<&'static str, &'static str>,
}

impl TagRegistry {
    pub const fn new() -> Self {
        Self {
            owners: BTreeMap::new(),
        }
    }

    /// Record `owner` as the owner of `tag`.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is already owned by someone else.
    pub fn register(&mut self, tag: &'static str, owner: &'static str) {
        match self.owners.get(tag) {
            Some(existing) if *existing == owner => {}
            Some(existing) => panic!(
                "plugfig: tag '{tag}' registered by {owner} is already owned by {existing}"
            ),
            None => {
                trace!(tag, owner, "registered tag");
                self.owners.insert(tag, owner);
            }
        }
    }

    pub fn owner(&self, tag: &str) -> Option<&'static str> {
        self.owners.get(tag).copied()
    }
}

/// Claim `tag` for the plugin type `P` in the process-wide registry.
///
/// # Panics
///
/// Panics if another plugin type already owns `tag`.
pub fn register_tag<P: ?Sized>(tag: &'static str) {
    let owner = type_name::<P>();
    REGISTRY.lock().register(tag, owner);
}

/// The plugin type that owns `tag`, if any.
pub fn tag_owner(tag: &str) -> Option<&'static str> {
    REGISTRY.lock().owner(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct First;
    struct Second;

    #[test]
    fn same_owner_may_register_twice() {
        let mut registry = TagRegistry::new();
        registry.register("env", "Env");
        registry.register("env", "Env");
        assert_eq!(registry.owner("env"), Some("Env"));
        assert_eq!(registry.owner("flag"), None);
    }

    #[test]
    #[should_panic(expected = "already owned")]
    fn different_owner_panics() {
        let mut registry = TagRegistry::new();
        registry.register("env", "Env");
        registry.register("env", "Secret");
    }

    #[test]
    fn global_registry_records_type_names() {
        register_tag::<First>("registry-test-first");
        register_tag::<First>("registry-test-first");
        assert_eq!(
            tag_owner("registry-test-first"),
            Some(type_name::<First>())
        );
    }

    #[test]
    fn global_collision_panics_and_keeps_registry_usable() {
        register_tag::<First>("registry-test-shared");
        let collision = std::panic::catch_unwind(|| register_tag::<Second>("registry-test-shared"));
        assert!(collision.is_err());
        assert_eq!(
            tag_owner("registry-test-shared"),
            Some(type_name::<First>())
        );
    }
}
