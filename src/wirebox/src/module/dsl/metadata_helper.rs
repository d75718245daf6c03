use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::registry::{BindingKind, Factory};
use crate::container::{Managed, SharedManaged};
use crate::element::{Binder, BindingElement, Element};
use crate::inject::InjectMembers;
use crate::key::{self, Key, TypedKey, TypedQualifier};
use crate::module::dsl::component_helper::ComponentDsl;
use crate::module::dsl::instance_helper::{InjectedInstanceDsl, InstanceDsl};
use crate::module::dsl::linked_helper::{LinkedDsl, ProviderKeyDsl};
use crate::module::dsl::provider_helper::{ClosureDsl, ProviderDsl};
use crate::module::dsl::Unscoped;
use crate::provider::closure::ProviderFn;
use crate::provider::component::{Component, ComponentProvider};
use crate::provider::TypedProvider;
use crate::scope::{ScopeMarker, Scoping};
use crate::source::Source;

/// A binding chain that has not picked its target yet.
pub struct BindingDsl<T, Q, L>
where
    T: Managed,
    Q: TypedQualifier,
{
    qualifier: Q,
    scoping: L,
    _marker: PhantomData<fn() -> T>,
}

impl<T, Q, L> BindingDsl<T, Q, L>
where
    T: Managed,
    Q: TypedQualifier,
{
    pub(crate) fn new(qualifier: Q, scoping: L) -> Self {
        Self {
            qualifier,
            scoping,
            _marker: PhantomData,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> BindingDsl<T, NewQ, L>
    where
        NewQ: TypedQualifier,
    {
        BindingDsl::new(qualifier, self.scoping)
    }

    pub fn named(self, name: &'static str) -> BindingDsl<T, &'static str, L> {
        BindingDsl::new(name, self.scoping)
    }

    pub fn in_singleton(self) -> BindingDsl<T, Q, Scoping> {
        BindingDsl::new(self.qualifier, Scoping::Singleton)
    }

    pub fn as_eager_singleton(self) -> BindingDsl<T, Q, Scoping> {
        BindingDsl::new(self.qualifier, Scoping::EagerSingleton)
    }

    pub fn in_scope<M: ScopeMarker>(self) -> BindingDsl<T, Q, Scoping> {
        BindingDsl::new(self.qualifier, Scoping::named::<M>())
    }

    /// Binds the key to a type constructed through its injectable
    /// constructor.
    pub fn to<C>(self) -> ComponentDsl<C, Q, L>
    where
        C: Component<Constructed = T>,
    {
        ComponentDsl::new(self.qualifier, self.scoping)
    }

    /// Binds the key to copies of a preconstructed value.
    pub fn to_instance(self, instance: T) -> InstanceDsl<T, Q, L>
    where
        T: Clone,
    {
        InstanceDsl::new(instance, self.qualifier, self.scoping)
    }

    /// Binds the key to a user-supplied factory object.
    pub fn to_provider<P>(self, provider: P) -> ProviderDsl<T, Q, L, P>
    where
        P: TypedProvider<Output = T>,
    {
        ProviderDsl::new(provider, self.qualifier, self.scoping)
    }

    /// Binds the key to a factory closure taking the injector.
    pub fn to_fn<C>(self, closure: C) -> ClosureDsl<T, Q, L, C>
    where
        C: ProviderFn<Constructed = T>,
    {
        ClosureDsl::new(closure, self.qualifier, self.scoping)
    }

    /// Binds the key as an alias of another key with the same target type.
    pub fn to_key<K>(self, target: K) -> LinkedDsl<T, Q, L, K>
    where
        K: TypedKey<Target = T>,
    {
        LinkedDsl::new(target, self.qualifier, self.scoping)
    }

    /// Binds the key to the output of a factory resolved through its own
    /// key.
    pub fn to_provider_key<KP>(self, provider_key: KP) -> ProviderKeyDsl<T, Q, L, KP>
    where
        KP: TypedKey<Target: TypedProvider<Output = T> + Clone>,
    {
        ProviderKeyDsl::new(provider_key, self.qualifier, self.scoping)
    }
}

impl<U, Q, L> BindingDsl<Arc<U>, Q, L>
where
    U: InjectMembers,
    Q: TypedQualifier,
{
    /// Binds the key to a preconstructed value whose members the injector
    /// fills in before anyone can observe it.
    pub fn to_injected_instance(self, instance: Arc<U>) -> InjectedInstanceDsl<U, Q, L> {
        InjectedInstanceDsl::new(instance, self.qualifier, self.scoping)
    }
}

impl<T, Q> BindingDsl<T, Q, Unscoped>
where
    T: Component<Constructed = T>,
    Q: TypedQualifier,
{
    /// Records the binding, constructing a fresh object per request.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::Constructor,
            factory: Factory::Owned(Arc::new(ComponentProvider::<T>::new())),
            dependencies: T::dependencies(),
            link_target: None,
            ticket: None,
        }));
    }
}

impl<T, Q> BindingDsl<T, Q, Scoping>
where
    T: Component<Constructed = T> + SharedManaged,
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
            kind: BindingKind::Constructor,
            factory: Factory::Shared(Arc::new(ComponentProvider::<T>::new())),
            dependencies: T::dependencies(),
            link_target: None,
            ticket: None,
        }));
    }
}

impl<C, Q> BindingDsl<Arc<C>, Q, Unscoped>
where
    C: Component<Constructed = Arc<C>>,
    Q: TypedQualifier,
{
    /// Records the binding, scoped as the component declares itself.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<Arc<C>, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: C::scoping(),
            kind: BindingKind::Constructor,
            factory: Factory::Shared(Arc::new(ComponentProvider::<C>::new())),
            dependencies: C::dependencies(),
            link_target: None,
            ticket: None,
        }));
    }
}

impl<C, Q> BindingDsl<Arc<C>, Q, Scoping>
where
    C: Component<Constructed = Arc<C>>,
    Q: TypedQualifier,
{
    /// Records the binding under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<Arc<C>, Q>(self.qualifier);
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
