use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::injector::{
    CallContext, ContextForwardingInjectorProxy, TypedInjector,
};
use crate::container::registry::{BindingKind, Factory};
use crate::container::{Managed, SharedManaged};
use crate::element::{Binder, BindingElement, Element};
use crate::errors::ProvisionError;
use crate::key::{self, Key, TypedKey, TypedQualifier};
use crate::module::dsl::Unscoped;
use crate::provider::component::Dependency;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::scope::{ScopeMarker, Scoping};
use crate::source::Source;

/// A [`Provider`] which serves a key by resolving another key with the same
/// target type.
///
/// [`Provider`]: crate::provider::Provider
struct LinkedKeyProvider<K>
where
    K: TypedKey,
{
    target: K,
}

impl<K> Debug for LinkedKeyProvider<K>
where
    K: TypedKey,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LinkedKeyProvider<K>")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<K> TypedProvider for LinkedKeyProvider<K>
where
    K: TypedKey,
{
    type Output = K::Target;

    fn provide<I>(
        &self,
        injector: &I,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ProvisionError>
    where
        I: TypedInjector + ?Sized,
    {
        let injector = ContextForwardingInjectorProxy::new(injector, context);
        injector.get(self.target)
    }
}

impl<K> TypedSharedProvider for LinkedKeyProvider<K>
where
    K: TypedKey<Target: SharedManaged>,
{
}

/// A [`Provider`] which resolves a factory object through its own key and
/// then runs it.
///
/// [`Provider`]: crate::provider::Provider
struct KeyedProviderProvider<KP>
where
    KP: TypedKey<Target: TypedProvider + Clone>,
{
    provider_key: KP,
}

impl<KP> Debug for KeyedProviderProvider<KP>
where
    KP: TypedKey<Target: TypedProvider + Clone>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("KeyedProviderProvider<KP>")
            .field("provider_key", &self.provider_key)
            .finish_non_exhaustive()
    }
}

impl<KP> TypedProvider for KeyedProviderProvider<KP>
where
    KP: TypedKey<Target: TypedProvider + Clone>,
{
    type Output = <KP::Target as TypedProvider>::Output;

    fn provide<I>(
        &self,
        injector: &I,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ProvisionError>
    where
        I: TypedInjector + ?Sized,
    {
        let proxy = ContextForwardingInjectorProxy::new(injector, context);
        let provider: KP::Target = proxy.get(self.provider_key)?;
        provider.provide(injector, context)
    }
}

impl<KP> TypedSharedProvider for KeyedProviderProvider<KP> where
    KP: TypedKey<Target: TypedProvider<Output: SharedManaged> + Clone>
{
}

/// A binding chain aliasing another key of the same target type.
pub struct LinkedDsl<T, Q, L, K>
where
    T: Managed,
    Q: TypedQualifier,
    K: TypedKey<Target = T>,
{
    target: K,
    qualifier: Q,
    scoping: L,
    _marker: PhantomData<fn() -> T>,
}

impl<T, Q, L, K> LinkedDsl<T, Q, L, K>
where
    T: Managed,
    Q: TypedQualifier,
    K: TypedKey<Target = T>,
{
    pub(crate) fn new(target: K, qualifier: Q, scoping: L) -> Self {
        Self {
            target,
            qualifier,
            scoping,
            _marker: PhantomData,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> LinkedDsl<T, NewQ, L, K>
    where
        NewQ: TypedQualifier,
    {
        LinkedDsl::new(self.target, qualifier, self.scoping)
    }

    pub fn in_singleton(self) -> LinkedDsl<T, Q, Scoping, K> {
        LinkedDsl::new(self.target, self.qualifier, Scoping::Singleton)
    }

    pub fn as_eager_singleton(self) -> LinkedDsl<T, Q, Scoping, K> {
        LinkedDsl::new(self.target, self.qualifier, Scoping::EagerSingleton)
    }

    pub fn in_scope<M: ScopeMarker>(self) -> LinkedDsl<T, Q, Scoping, K> {
        LinkedDsl::new(self.target, self.qualifier, Scoping::named::<M>())
    }
}

impl<T, Q, K> LinkedDsl<T, Q, Unscoped, K>
where
    T: Managed,
    Q: TypedQualifier,
    K: TypedKey<Target = T>,
{
    /// Records the alias; requests resolve through the target key.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::Linked,
            dependencies: vec![Dependency::on(self.target)],
            link_target: Some(self.target.dyn_clone()),
            factory: Factory::Owned(Arc::new(LinkedKeyProvider {
                target: self.target,
            })),
            ticket: None,
        }));
    }
}

impl<T, Q, K> LinkedDsl<T, Q, Scoping, K>
where
    T: SharedManaged,
    Q: TypedQualifier,
    K: TypedKey<Target = T>,
{
    /// Records the alias under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: self.scoping,
            kind: BindingKind::Linked,
            dependencies: vec![Dependency::on(self.target)],
            link_target: Some(self.target.dyn_clone()),
            factory: Factory::Shared(Arc::new(LinkedKeyProvider {
                target: self.target,
            })),
            ticket: None,
        }));
    }
}

/// A binding chain resolving its factory object through another key.
pub struct ProviderKeyDsl<T, Q, L, KP>
where
    T: Managed,
    Q: TypedQualifier,
    KP: TypedKey<Target: TypedProvider<Output = T> + Clone>,
{
    provider_key: KP,
    qualifier: Q,
    scoping: L,
    _marker: PhantomData<fn() -> T>,
}

impl<T, Q, L, KP> ProviderKeyDsl<T, Q, L, KP>
where
    T: Managed,
    Q: TypedQualifier,
    KP: TypedKey<Target: TypedProvider<Output = T> + Clone>,
{
    pub(crate) fn new(provider_key: KP, qualifier: Q, scoping: L) -> Self {
        Self {
            provider_key,
            qualifier,
            scoping,
            _marker: PhantomData,
        }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> ProviderKeyDsl<T, NewQ, L, KP>
    where
        NewQ: TypedQualifier,
    {
        ProviderKeyDsl::new(self.provider_key, qualifier, self.scoping)
    }

    pub fn in_singleton(self) -> ProviderKeyDsl<T, Q, Scoping, KP> {
        ProviderKeyDsl::new(self.provider_key, self.qualifier, Scoping::Singleton)
    }

    pub fn as_eager_singleton(self) -> ProviderKeyDsl<T, Q, Scoping, KP> {
        ProviderKeyDsl::new(self.provider_key, self.qualifier, Scoping::EagerSingleton)
    }

    pub fn in_scope<M: ScopeMarker>(self) -> ProviderKeyDsl<T, Q, Scoping, KP> {
        ProviderKeyDsl::new(self.provider_key, self.qualifier, Scoping::named::<M>())
    }
}

impl<T, Q, KP> ProviderKeyDsl<T, Q, Unscoped, KP>
where
    T: Managed,
    Q: TypedQualifier,
    KP: TypedKey<Target: TypedProvider<Output = T> + Clone>,
{
    /// Records the binding; every request resolves and runs the factory.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::ProviderKey,
            dependencies: vec![Dependency::on(self.provider_key)],
            link_target: None,
            factory: Factory::Owned(Arc::new(KeyedProviderProvider {
                provider_key: self.provider_key,
            })),
            ticket: None,
        }));
    }
}

impl<T, Q, KP> ProviderKeyDsl<T, Q, Scoping, KP>
where
    T: SharedManaged,
    Q: TypedQualifier,
    KP: TypedKey<Target: TypedProvider<Output = T> + Clone>,
{
    /// Records the binding under the chosen scope.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: self.scoping,
            kind: BindingKind::ProviderKey,
            dependencies: vec![Dependency::on(self.provider_key)],
            link_target: None,
            factory: Factory::Shared(Arc::new(KeyedProviderProvider {
                provider_key: self.provider_key,
            })),
            ticket: None,
        }));
    }
}
