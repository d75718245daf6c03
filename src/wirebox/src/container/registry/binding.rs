use std::any::TypeId;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{ProvisionError, ProvisionErrorKind};
use crate::key::Key;
use crate::provider::component::Dependency;
use crate::provider::{Provider, SharedProvider};
use crate::scope::{Scope, Scoping};
use crate::source::Source;

/// The flavor of recipe behind a binding, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// A preconstructed value supplied by the user.
    Instance,
    /// A user-supplied factory object.
    ProviderInstance,
    /// An indirection through another key which yields a factory.
    ProviderKey,
    /// An alias to another key with the same target type.
    Linked,
    /// A type constructed through its declared injectable constructor.
    Constructor,
    /// A literal value bound under a qualifier.
    Constant,
    /// A string constant converted on demand to the requested type.
    ConvertedConstant,
}

/// The closure that actually produces instances for a binding.
#[derive(Clone)]
pub enum Factory {
    /// Produces owned objects; such a binding cannot be cached by a scope.
    Owned(Arc<dyn Provider>),
    /// Produces shareable objects, so scopes may cache and re-serve them.
    Shared(Arc<dyn SharedProvider>),
}

impl Factory {
    fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

impl Debug for Factory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Owned(_) => f.debug_tuple("Owned").finish_non_exhaustive(),
            Self::Shared(_) => f.debug_tuple("Shared").finish_non_exhaustive(),
        }
    }
}

enum LifeState {
    /// Recorded in a map but not yet associated with its scope.
    Recorded,
    /// Ready to produce objects. Bindings in a registered scope carry the
    /// factory rewritten by that scope.
    Ready {
        wrapped: Option<Arc<dyn SharedProvider>>,
    },
    /// Initialization failed; every provision replays the original reason.
    Invalid { reason: String },
}

/// The recipe for one key: where it was declared, how instances are
/// produced, and how they are cached.
pub struct Binding {
    key: Box<dyn Key>,
    source: Source,
    scoping: Scoping,
    kind: BindingKind,
    factory: Factory,
    dependencies: Vec<Dependency>,
    link_target: Option<Box<dyn Key>>,
    state: Mutex<LifeState>,
}

impl Binding {
    pub(crate) fn new(
        key: Box<dyn Key>,
        source: Source,
        scoping: Scoping,
        kind: BindingKind,
        factory: Factory,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            key,
            source,
            scoping,
            kind,
            factory,
            dependencies,
            link_target: None,
            state: Mutex::new(LifeState::Recorded),
        }
    }

    pub(crate) fn with_link_target(mut self, target: Box<dyn Key>) -> Self {
        self.link_target = Some(target);
        self
    }

    pub fn key(&self) -> &dyn Key {
        self.key.as_ref()
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn scoping(&self) -> Scoping {
        self.scoping
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn link_target(&self) -> Option<&dyn Key> {
        self.link_target.as_deref()
    }

    /// Associates the binding with its scope. Fails when the scope marker has
    /// no registered scope or when a cached scoping is asked to store objects
    /// the factory cannot share; either failure parks the binding in a
    /// terminal invalid state.
    pub(crate) fn initialize(
        &self,
        lookup_scope: &dyn Fn(TypeId) -> Option<Arc<dyn Scope>>,
    ) -> Result<(), String> {
        let mut state = self.state.lock();
        if matches!(*state, LifeState::Ready { .. }) {
            return Ok(());
        }

        let next = match self.scoping {
            Scoping::NoScope => Ok(LifeState::Ready { wrapped: None }),
            Scoping::Singleton | Scoping::EagerSingleton => {
                if self.factory.is_shared() {
                    Ok(LifeState::Ready { wrapped: None })
                } else {
                    Err(format!(
                        "{} is scoped as a singleton but its target cannot be shared",
                        self.key
                    ))
                }
            }
            Scoping::Named { marker, name } => match &self.factory {
                Factory::Shared(unscoped) => match lookup_scope(marker) {
                    Some(scope) => Ok(LifeState::Ready {
                        wrapped: Some(scope.wrap(self.key.as_ref(), Arc::clone(unscoped))),
                    }),
                    None => Err(format!("no scope is bound for the {name} marker")),
                },
                Factory::Owned(_) => Err(format!(
                    "{} is bound in the {name} scope but its target cannot be shared",
                    self.key
                )),
            },
        };

        match next {
            Ok(ready) => {
                *state = ready;
                Ok(())
            }
            Err(reason) => {
                *state = LifeState::Invalid {
                    reason: reason.clone(),
                };
                Err(reason)
            }
        }
    }

    /// The factory a provision request should run, honoring the scope
    /// rewrite and replaying initialization failures.
    pub(crate) fn provision_factory(&self) -> Result<Factory, ProvisionError> {
        let state = self.state.lock();
        match &*state {
            LifeState::Invalid { reason } => {
                Err(ProvisionError::from(ProvisionErrorKind::InvalidBinding {
                    key: self.key.clone(),
                    reason: reason.clone(),
                }))
            }
            LifeState::Ready {
                wrapped: Some(wrapped),
            } => Ok(Factory::Shared(Arc::clone(wrapped))),
            LifeState::Ready { wrapped: None } | LifeState::Recorded => {
                Ok(self.factory.clone())
            }
        }
    }
}

impl Debug for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("source", &self.source)
            .field("scoping", &self.scoping)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::key;
    use crate::provider::instance::InstanceProvider;
    use crate::scope::CachingScope;

    use super::*;

    fn owned_binding(scoping: Scoping) -> Binding {
        Binding::new(
            key::of::<i32>().dyn_clone(),
            Source::Unknown,
            scoping,
            BindingKind::Instance,
            Factory::Owned(Arc::new(InstanceProvider::new(42i32))),
            Vec::new(),
        )
    }

    fn shared_binding(scoping: Scoping) -> Binding {
        Binding::new(
            key::of::<Arc<i32>>().dyn_clone(),
            Source::Unknown,
            scoping,
            BindingKind::Instance,
            Factory::Shared(Arc::new(InstanceProvider::new(Arc::new(42i32)))),
            Vec::new(),
        )
    }

    #[test]
    fn initialize_accepts_unscoped_owned_factories() {
        let binding = owned_binding(Scoping::NoScope);
        assert!(binding.initialize(&|_| None).is_ok());
        assert!(binding.provision_factory().is_ok());
    }

    #[test]
    fn initialize_rejects_singleton_owned_factories() {
        let binding = owned_binding(Scoping::Singleton);
        assert!(binding.initialize(&|_| None).is_err());

        let err = binding.provision_factory().unwrap_err();
        assert!(matches!(
            err.kind(),
            ProvisionErrorKind::InvalidBinding { .. }
        ));
    }

    #[test]
    fn initialize_wraps_named_scopes() {
        struct Marker;
        impl crate::scope::ScopeMarker for Marker {}

        let binding = shared_binding(Scoping::named::<Marker>());
        let scope: Arc<dyn Scope> = Arc::new(CachingScope::new());
        binding
            .initialize(&|marker| {
                (marker == TypeId::of::<Marker>()).then(|| Arc::clone(&scope))
            })
            .unwrap();

        let factory = binding.provision_factory().unwrap();
        assert!(matches!(factory, Factory::Shared(_)));
    }

    #[test]
    fn initialize_fails_when_named_scope_is_missing() {
        struct Marker;
        impl crate::scope::ScopeMarker for Marker {}

        let binding = shared_binding(Scoping::named::<Marker>());
        let reason = binding.initialize(&|_| None).unwrap_err();
        assert!(reason.contains("no scope is bound"));
    }
}
