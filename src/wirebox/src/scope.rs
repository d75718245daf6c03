//! Lifecycle policies for constructed objects.
//!
//! A scope turns the unscoped factory of a binding into one that may reuse
//! previously constructed objects. The container implements the unscoped and
//! the singleton policy itself; additional policies are registered under a
//! marker type with [`Binder::bind_scope`] and picked per binding with the
//! `in_scope` method of the binding chain.
//!
//! [`Binder::bind_scope`]: crate::element::Binder::bind_scope

use std::any::{self, TypeId};
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::injector::{CallContext, Injector};
use crate::container::SharedManaged;
use crate::errors::ProvisionError;
use crate::key::Key;
use crate::provider::SharedProvider;

/// How instances produced by one binding relate to each other over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoping {
    /// Every request constructs a fresh object.
    NoScope,
    /// The first request constructs the object, later requests share it.
    Singleton,
    /// Like [`Scoping::Singleton`], but the object is constructed when the
    /// injector finishes building instead of on first use.
    EagerSingleton,
    /// A user-registered policy, looked up by its marker type.
    Named {
        marker: TypeId,
        name: &'static str,
    },
}

impl Scoping {
    /// The scoping selected by the marker type `M`.
    pub fn named<M: ScopeMarker>() -> Self {
        Self::Named {
            marker: TypeId::of::<M>(),
            name: any::type_name::<M>(),
        }
    }

    pub(crate) fn is_singleton(self) -> bool {
        matches!(self, Self::Singleton | Self::EagerSingleton)
    }

    pub(crate) fn is_cached(self) -> bool {
        !matches!(self, Self::NoScope)
    }
}

/// Marks a unit type as usable for selecting a registered scope.
pub trait ScopeMarker: 'static {}

/// A policy that rewrites the unscoped factory of a binding.
pub trait Scope: Debug + Send + Sync + 'static {
    /// A short name used in error messages.
    fn name(&self) -> &'static str;

    /// Returns the factory that requests for `key` should go through.
    fn wrap(&self, key: &dyn Key, unscoped: Arc<dyn SharedProvider>) -> Arc<dyn SharedProvider>;
}

/// A [`Scope`] caching the first constructed object for the lifetime of the
/// wrapped factory. Useful as the policy behind user-registered markers.
#[derive(Debug, Default)]
pub struct CachingScope;

impl CachingScope {
    pub fn new() -> Self {
        Self
    }
}

impl Scope for CachingScope {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn wrap(&self, _key: &dyn Key, unscoped: Arc<dyn SharedProvider>) -> Arc<dyn SharedProvider> {
        Arc::new(CachingProvider {
            inner: unscoped,
            cached: RwLock::new(None),
        })
    }
}

struct CachingProvider {
    inner: Arc<dyn SharedProvider>,
    cached: RwLock<Option<Box<dyn SharedManaged>>>,
}

impl Debug for CachingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingProvider")
            .field("inner", &self.inner)
            .field("cached", &self.cached.read().is_some())
            .finish()
    }
}

impl crate::provider::Provider for CachingProvider {
    fn dyn_provide(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn crate::container::Managed>, ProvisionError> {
        self.dyn_provide_shared(injector, context)
            .map(SharedManaged::upcast_managed)
    }
}

impl SharedProvider for CachingProvider {
    fn dyn_provide_shared(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn SharedManaged>, ProvisionError> {
        if let Some(cached) = self.cached.read().as_ref() {
            return Ok(cached.dyn_clone());
        }
        let object = self.inner.dyn_provide_shared(injector, context)?;
        let mut slot = self.cached.write();
        if let Some(raced) = slot.as_ref() {
            return Ok(raced.dyn_clone());
        }
        *slot = Some(object.dyn_clone());
        Ok(object)
    }

    fn upcast_provider(&self) -> &dyn crate::provider::Provider {
        self
    }
}
