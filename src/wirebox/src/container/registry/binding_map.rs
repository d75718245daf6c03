use std::any::TypeId;
use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use crate::container::registry::Binding;
use crate::key::Key;

/// The map from keys to bindings, sloted by target type so lookups by raw
/// type stay cheap.
#[derive(Debug, Default)]
pub(crate) struct BindingMap {
    slots: HashMap<TypeId, BindingSlot>,
}

impl BindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, binding: Arc<Binding>) -> Option<Arc<Binding>> {
        let key = binding.key().dyn_clone();
        self.insert_under(key, binding)
    }

    /// Records `binding` under `key`, which may differ from the binding's
    /// own key when memoizing an alias lookup.
    pub fn insert_under(
        &mut self,
        key: Box<dyn Key>,
        binding: Arc<Binding>,
    ) -> Option<Arc<Binding>> {
        let target = key.target_type();
        if let Some(slot) = self.slots.get_mut(&target) {
            slot.insert(key, binding)
        } else {
            self.slots.insert(target, BindingSlot::Single(key, binding));
            None
        }
    }

    pub fn get(&self, key: &dyn Key) -> Option<&Arc<Binding>> {
        self.slots
            .get(&key.target_type())
            .and_then(|slot| slot.get(key))
    }

    pub fn keys(&self, type_id: TypeId) -> Vec<Box<dyn Key>> {
        self.slots
            .get(&type_id)
            .map_or(Vec::new(), BindingSlot::keys)
    }

    pub fn all(&self) -> Vec<Arc<Binding>> {
        self.slots
            .values()
            .flat_map(BindingSlot::bindings)
            .collect()
    }
}

#[derive(Debug)]
enum BindingSlot {
    Single(Box<dyn Key>, Arc<Binding>),
    Map(HashMap<Box<dyn Key>, Arc<Binding>>),
}

impl BindingSlot {
    fn insert(&mut self, key: Box<dyn Key>, binding: Arc<Binding>) -> Option<Arc<Binding>> {
        match self {
            Self::Single(existing, slot) if existing.as_ref() == key.as_ref() => {
                Some(mem::replace(slot, binding))
            }
            Self::Single(_, _) => {
                let Self::Single(existing, slot) =
                    mem::replace(self, Self::Map(HashMap::with_capacity(2)))
                else {
                    unreachable!("`self` should match `Self::Single(_, _)`")
                };
                let Self::Map(entries) = self else {
                    unreachable!("`self` should already be assigned to `Self::Map(_)`")
                };
                entries.insert(existing, slot);
                entries.insert(key, binding);
                None
            }
            Self::Map(entries) => entries.insert(key, binding),
        }
    }

    fn get(&self, key: &dyn Key) -> Option<&Arc<Binding>> {
        match self {
            Self::Single(existing, _) if existing.as_ref() != key => None,
            Self::Single(_, slot) => Some(slot),
            Self::Map(entries) => entries.get(key),
        }
    }

    fn keys(&self) -> Vec<Box<dyn Key>> {
        match self {
            Self::Single(key, _) => vec![key.dyn_clone()],
            Self::Map(entries) => entries.keys().map(|key| key.dyn_clone()).collect(),
        }
    }

    fn bindings(&self) -> Vec<Arc<Binding>> {
        match self {
            Self::Single(_, binding) => vec![Arc::clone(binding)],
            Self::Map(entries) => entries.values().map(Arc::clone).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::container::registry::{BindingKind, Factory};
    use crate::key;
    use crate::provider::instance::InstanceProvider;
    use crate::scope::Scoping;
    use crate::source::Source;

    use super::*;

    fn binding_for(key: Box<dyn Key>, value: i32) -> Arc<Binding> {
        Arc::new(Binding::new(
            key,
            Source::Unknown,
            Scoping::NoScope,
            BindingKind::Instance,
            Factory::Owned(Arc::new(InstanceProvider::new(value))),
            Vec::new(),
        ))
    }

    #[test]
    fn insert_and_get_succeeds() {
        let mut map = BindingMap::new();
        assert!(map
            .insert(binding_for(key::of::<i32>().dyn_clone(), 1))
            .is_none());
        assert!(map
            .insert(binding_for(key::named::<i32>("a").dyn_clone(), 2))
            .is_none());

        assert!(map.get(&key::of::<i32>()).is_some());
        assert!(map.get(&key::named::<i32>("a")).is_some());
        assert!(map.get(&key::named::<i32>("b")).is_none());
    }

    #[test]
    fn insert_returns_the_displaced_binding() {
        let mut map = BindingMap::new();
        assert!(map
            .insert(binding_for(key::of::<i32>().dyn_clone(), 1))
            .is_none());
        assert!(map
            .insert(binding_for(key::of::<i32>().dyn_clone(), 2))
            .is_some());
    }

    #[test]
    fn keys_lists_every_key_of_a_target_type() {
        let mut map = BindingMap::new();
        map.insert(binding_for(key::of::<i32>().dyn_clone(), 1));
        map.insert(binding_for(key::named::<i32>("a").dyn_clone(), 2));
        map.insert(binding_for(key::of::<i64>().dyn_clone(), 3));

        let keys = map.keys(TypeId::of::<i32>());
        assert_eq!(keys.len(), 2);
        assert_eq!(map.all().len(), 3);
    }
}
