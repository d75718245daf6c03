use std::sync::Arc;

use crate::container::registry::{BindingKind, Factory};
use crate::container::{Managed, SharedManaged};
use crate::element::{Binder, BindingElement, Element};
use crate::key::{self, Key, TypedQualifier};
use crate::module::dsl::Unscoped;
use crate::provider::closure::{ClosureProvider, ProviderFn};
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::scope::{ScopeMarker, Scoping};
use crate::source::Source;

/// A binding chain targeting a user-supplied factory object.
pub struct ProviderDsl<T, Q, L, P>
where
    T: Managed,
    Q: TypedQualifier,
    P: TypedProvider<Output = T>,
{
    provider: P,
    qualifier: Q,
    scoping: L,
}

impl<T, Q, L, P> ProviderDsl<T, Q, L, P>
where
    T: Managed,
    Q: TypedQualifier,
    P: TypedProvider<Output = T>,
{
    pub(crate) fn new(provider: P, qualifier: Q, scoping: L) -> Self {
        Self {
            provider,
            qualifier,
            scoping,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> ProviderDsl<T, NewQ, L, P>
    where
        NewQ: TypedQualifier,
    {
        ProviderDsl::new(self.provider, qualifier, self.scoping)
    }

    pub fn in_singleton(self) -> ProviderDsl<T, Q, Scoping, P> {
        ProviderDsl::new(self.provider, self.qualifier, Scoping::Singleton)
    }

    pub fn as_eager_singleton(self) -> ProviderDsl<T, Q, Scoping, P> {
        ProviderDsl::new(self.provider, self.qualifier, Scoping::EagerSingleton)
    }

    pub fn in_scope<M: ScopeMarker>(self) -> ProviderDsl<T, Q, Scoping, P> {
        ProviderDsl::new(self.provider, self.qualifier, Scoping::named::<M>())
    }
}

impl<T, Q, P> ProviderDsl<T, Q, Unscoped, P>
where
    T: Managed,
    Q: TypedQualifier,
    P: TypedProvider<Output = T>,
{
    /// Records the binding; every request runs the factory.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::ProviderInstance,
            factory: Factory::Owned(Arc::new(self.provider)),
            dependencies: Vec::new(),
            link_target: None,
            ticket: None,
        }));
    }
}

impl<T, Q, P> ProviderDsl<T, Q, Scoping, P>
where
    T: SharedManaged,
    Q: TypedQualifier,
    P: TypedSharedProvider<Output = T>,
{
    /// Records the binding under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: self.scoping,
            kind: BindingKind::ProviderInstance,
            factory: Factory::Shared(Arc::new(self.provider)),
            dependencies: Vec::new(),
            link_target: None,
            ticket: None,
        }));
    }
}

/// A binding chain targeting a factory closure.
pub struct ClosureDsl<T, Q, L, C>
where
    T: Managed,
    Q: TypedQualifier,
    C: ProviderFn<Constructed = T>,
{
    closure: C,
    qualifier: Q,
    scoping: L,
}

impl<T, Q, L, C> ClosureDsl<T, Q, L, C>
where
    T: Managed,
    Q: TypedQualifier,
    C: ProviderFn<Constructed = T>,
{
    pub(crate) fn new(closure: C, qualifier: Q, scoping: L) -> Self {
        Self {
            closure,
            qualifier,
            scoping,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> ClosureDsl<T, NewQ, L, C>
    where
        NewQ: TypedQualifier,
    {
        ClosureDsl::new(self.closure, qualifier, self.scoping)
    }

    pub fn in_singleton(self) -> ClosureDsl<T, Q, Scoping, C> {
        ClosureDsl::new(self.closure, self.qualifier, Scoping::Singleton)
    }

    pub fn as_eager_singleton(self) -> ClosureDsl<T, Q, Scoping, C> {
        ClosureDsl::new(self.closure, self.qualifier, Scoping::EagerSingleton)
    }

    pub fn in_scope<M: ScopeMarker>(self) -> ClosureDsl<T, Q, Scoping, C> {
        ClosureDsl::new(self.closure, self.qualifier, Scoping::named::<M>())
    }
}

impl<T, Q, C> ClosureDsl<T, Q, Unscoped, C>
where
    T: Managed,
    Q: TypedQualifier,
    C: ProviderFn<Constructed = T>,
{
    /// Records the binding; every request runs the closure.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::ProviderInstance,
            factory: Factory::Owned(Arc::new(ClosureProvider::new(self.closure))),
            dependencies: Vec::new(),
            link_target: None,
            ticket: None,
        }));
    }
}

impl<T, Q, C> ClosureDsl<T, Q, Scoping, C>
where
    T: SharedManaged,
    Q: TypedQualifier,
    C: ProviderFn<Constructed = T>,
{
    /// Records the binding under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: self.scoping,
            kind: BindingKind::ProviderInstance,
            factory: Factory::Shared(Arc::new(ClosureProvider::new(self.closure))),
            dependencies: Vec::new(),
            link_target: None,
            ticket: None,
        }));
    }
}
