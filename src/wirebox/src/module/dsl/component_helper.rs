use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::registry::{BindingKind, Factory};
use crate::container::SharedManaged;
use crate::element::{Binder, BindingElement, Element};
use crate::key::{self, Key, TypedQualifier};
use crate::module::dsl::Unscoped;
use crate::provider::component::{Component, ComponentProvider};
use crate::scope::{ScopeMarker, Scoping};
use crate::source::Source;

/// A binding chain targeting a type constructed through its injectable
/// constructor.
pub struct ComponentDsl<C, Q, L>
where
    C: Component,
    Q: TypedQualifier,
{
    qualifier: Q,
    scoping: L,
    _marker: PhantomData<fn() -> C>,
}

impl<C, Q, L> ComponentDsl<C, Q, L>
where
    C: Component,
    Q: TypedQualifier,
{
    pub(crate) fn new(qualifier: Q, scoping: L) -> Self {
        Self {
            qualifier,
            scoping,
            _marker: PhantomData,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> ComponentDsl<C, NewQ, L>
    where
        NewQ: TypedQualifier,
    {
        ComponentDsl::new(qualifier, self.scoping)
    }

    pub fn in_singleton(self) -> ComponentDsl<C, Q, Scoping> {
        ComponentDsl::new(self.qualifier, Scoping::Singleton)
    }

    pub fn as_eager_singleton(self) -> ComponentDsl<C, Q, Scoping> {
        ComponentDsl::new(self.qualifier, Scoping::EagerSingleton)
    }

    pub fn in_scope<M: ScopeMarker>(self) -> ComponentDsl<C, Q, Scoping> {
        ComponentDsl::new(self.qualifier, Scoping::named::<M>())
    }
}

impl<C, Q> ComponentDsl<C, Q, Unscoped>
where
    C: Component,
    Q: TypedQualifier,
{
    /// Records the binding, constructing a fresh object per request.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<C::Constructed, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::Constructor,
            factory: Factory::Owned(Arc::new(ComponentProvider::<C>::new())),
            dependencies: C::dependencies(),
            link_target: None,
            ticket: None,
        }));
    }
}

impl<C, Q> ComponentDsl<C, Q, Scoping>
where
    C: Component<Constructed: SharedManaged>,
    Q: TypedQualifier,
{
    /// Records the binding under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<C::Constructed, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: self.scoping,
            kind: BindingKind::Constructor,
            factory: Factory::Shared(Arc::new(ComponentProvider::<C>::new())),
            dependencies: C::dependencies(),
            link_target: None,
            ticket: None,
        }));
    }
}
