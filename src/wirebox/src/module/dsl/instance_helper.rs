use std::sync::Arc;

use crate::container::initializer::{PendingInstanceProvider, PendingTicket};
use crate::container::registry::{BindingKind, Factory};
use crate::container::{Managed, SharedManaged};
use crate::element::{Binder, BindingElement, Element};
use crate::inject::InjectMembers;
use crate::key::{self, Key, TypedQualifier};
use crate::module::dsl::Unscoped;
use crate::provider::instance::InstanceProvider;
use crate::scope::{ScopeMarker, Scoping};
use crate::source::Source;

/// A binding chain targeting a preconstructed value.
pub struct InstanceDsl<T, Q, L>
where
    T: Managed + Clone,
    Q: TypedQualifier,
{
    instance: T,
    qualifier: Q,
    scoping: L,
}

impl<T, Q, L> InstanceDsl<T, Q, L>
where
    T: Managed + Clone,
    Q: TypedQualifier,
{
    pub(crate) fn new(instance: T, qualifier: Q, scoping: L) -> Self {
        Self {
            instance,
            qualifier,
            scoping,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> InstanceDsl<T, NewQ, L>
    where
        NewQ: TypedQualifier,
    {
        InstanceDsl::new(self.instance, qualifier, self.scoping)
    }

    pub fn in_singleton(self) -> InstanceDsl<T, Q, Scoping> {
        InstanceDsl::new(self.instance, self.qualifier, Scoping::Singleton)
    }

    pub fn as_eager_singleton(self) -> InstanceDsl<T, Q, Scoping> {
        InstanceDsl::new(self.instance, self.qualifier, Scoping::EagerSingleton)
    }

    pub fn in_scope<M: ScopeMarker>(self) -> InstanceDsl<T, Q, Scoping> {
        InstanceDsl::new(self.instance, self.qualifier, Scoping::named::<M>())
    }
}

impl<T, Q> InstanceDsl<T, Q, Unscoped>
where
    T: Managed + Clone,
    Q: TypedQualifier,
{
    /// Records the binding; every request receives a copy of the value.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::Instance,
            factory: Factory::Owned(Arc::new(InstanceProvider::new(self.instance))),
            dependencies: Vec::new(),
            link_target: None,
            ticket: None,
        }));
    }
}

impl<T, Q> InstanceDsl<T, Q, Scoping>
where
    T: SharedManaged + Clone,
    Q: TypedQualifier,
{
    /// Records the binding under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: self.scoping,
            kind: BindingKind::Instance,
            factory: Factory::Shared(Arc::new(InstanceProvider::new(self.instance))),
            dependencies: Vec::new(),
            link_target: None,
            ticket: None,
        }));
    }
}

/// A binding chain targeting a preconstructed value that still needs its
/// members injected.
pub struct InjectedInstanceDsl<U, Q, L>
where
    U: InjectMembers,
    Q: TypedQualifier,
{
    instance: Arc<U>,
    qualifier: Q,
    scoping: L,
}

impl<U, Q, L> InjectedInstanceDsl<U, Q, L>
where
    U: InjectMembers,
    Q: TypedQualifier,
{
    pub(crate) fn new(instance: Arc<U>, qualifier: Q, scoping: L) -> Self {
        Self {
            instance,
            qualifier,
            scoping,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> InjectedInstanceDsl<U, NewQ, L>
    where
        NewQ: TypedQualifier,
    {
        InjectedInstanceDsl::new(self.instance, qualifier, self.scoping)
    }

    pub fn in_singleton(self) -> InjectedInstanceDsl<U, Q, Scoping> {
        InjectedInstanceDsl::new(self.instance, self.qualifier, Scoping::Singleton)
    }

    fn element(self, scoping: Scoping, source: Source) -> Element {
        let key = key::qualified::<Arc<U>, Q>(self.qualifier);
        let ticket = PendingTicket::new(Arc::clone(&self.instance), source);
        Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source,
            scoping,
            kind: BindingKind::Instance,
            factory: Factory::Shared(Arc::new(PendingInstanceProvider::new(
                self.instance,
                Arc::clone(&ticket),
            ))),
            dependencies: U::member_dependencies(),
            link_target: None,
            ticket: Some(ticket),
        })
    }
}

impl<U, Q> InjectedInstanceDsl<U, Q, Unscoped>
where
    U: InjectMembers,
    Q: TypedQualifier,
{
    /// Records the binding; the shared value is injected before it can be
    /// observed.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let source = Source::capture();
        let element = self.element(Scoping::NoScope, source);
        binder.push(element);
    }
}

impl<U, Q> InjectedInstanceDsl<U, Q, Scoping>
where
    U: InjectMembers,
    Q: TypedQualifier,
{
    /// Records the binding under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let source = Source::capture();
        let scoping = self.scoping;
        let element = self.element(scoping, source);
        binder.push(element);
    }
}
