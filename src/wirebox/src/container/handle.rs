use std::any::TypeId;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, Weak};

use crate::container::builder::{ContainerBuilder, Stage};
use crate::container::core::ContainerCore;
use crate::container::injector::{CallContext, DeferredFill, Injector, TypedInjector};
use crate::container::registry::Binding;
use crate::container::{Managed, SharedManaged};
use crate::errors::{ProvisionError, ProvisionErrorKind};
use crate::inject::InjectMembers;
use crate::key::{self, Key, TypedKey};
use crate::provider::component::Component;
use crate::util::any::Downcast;

/// The built injector: resolves keys to fully constructed objects.
///
/// A `Container` is cheap to clone and safe to share between threads. All
/// its binding data is immutable; only the scope caches mutate behind it.
#[derive(Clone)]
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    pub(crate) fn from_core(core: Arc<ContainerCore>) -> Self {
        Self { core }
    }

    /// Starts configuring a new injector.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Starts configuring a child injector which consults this one for
    /// bindings it doesn't declare itself.
    pub fn child_builder(&self) -> ContainerBuilder {
        ContainerBuilder::with_parent(Arc::clone(&self.core))
    }

    pub fn stage(&self) -> Stage {
        self.core.stage()
    }

    /// Resolves `key` and returns the typed object. Equivalent to
    /// [`TypedInjector::get`].
    pub fn get_instance<K>(&self, key: K) -> Result<K::Target, ProvisionError>
    where
        K: TypedKey,
    {
        self.get(key)
    }

    /// Resolves the unqualified key of `C::Constructed`, synthesizing a
    /// constructor binding from the component itself when nothing was bound
    /// explicitly.
    pub fn get_auto<C>(&self) -> Result<C::Constructed, ProvisionError>
    where
        C: Component,
        C::Constructed: SharedManaged,
    {
        let key = key::of::<C::Constructed>();
        self.core.ensure_constructor_binding::<C>(&key)?;
        self.get(key)
    }

    /// The binding recorded or synthesized for `key`, if any.
    pub fn get_binding(&self, key: &dyn Key) -> Option<Arc<Binding>> {
        self.core.find_binding(key)
    }

    /// Every binding this injector knows, explicit and synthesized.
    pub fn bindings(&self) -> Vec<Arc<Binding>> {
        self.core.recorded_bindings()
    }

    /// Every binding whose key targets the given type, across this injector
    /// and its ancestors.
    pub fn bindings_for_type(&self, type_id: TypeId) -> Vec<Arc<Binding>> {
        self.keys(type_id)
            .iter()
            .filter_map(|key| self.core.find_binding(key.as_ref()))
            .collect()
    }

    /// Fills the injectable members of an existing object. Statics are not
    /// touched.
    pub fn inject_members<T>(&self, instance: &T) -> Result<(), ProvisionError>
    where
        T: InjectMembers + ?Sized,
    {
        instance.inject_members(self.core.as_ref())
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Container")
            .field("stage", &self.stage())
            .finish_non_exhaustive()
    }
}

impl Injector for Container {
    fn dyn_get(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ProvisionError> {
        self.core.dyn_get(key)
    }

    fn dyn_get_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ProvisionError> {
        self.core.dyn_get_dependency(key, context)
    }

    fn dyn_provider_handle(
        &self,
        key: &dyn Key,
    ) -> Result<UntypedProviderHandle, ProvisionError> {
        self.core.dyn_provider_handle(key)
    }

    fn dyn_request_deferred(
        &self,
        key: &dyn Key,
        fill: DeferredFill,
    ) -> Result<(), ProvisionError> {
        self.core.dyn_request_deferred(key, fill)
    }

    fn keys(&self, type_id: TypeId) -> Vec<Box<dyn Key>> {
        self.core.keys(type_id)
    }
}

/// The connection of a provider handle to the injector that will serve it.
///
/// Handles created during configuration start disconnected and are wired up
/// at the end of the build; handles created from a live injector start
/// connected.
pub struct ProviderSlot {
    core: OnceLock<Weak<ContainerCore>>,
}

impl ProviderSlot {
    pub(crate) fn empty() -> Self {
        Self {
            core: OnceLock::new(),
        }
    }

    pub(crate) fn filled(weak: Weak<ContainerCore>) -> Self {
        let slot = Self::empty();
        slot.fill(weak);
        slot
    }

    pub(crate) fn fill(&self, weak: Weak<ContainerCore>) {
        let _ = self.core.set(weak);
    }

    fn live_core(&self) -> Result<Arc<ContainerCore>, ProvisionError> {
        let Some(weak) = self.core.get() else {
            return Err(ProvisionErrorKind::InjectorUnavailable {
                state: "not created yet",
            }
            .into());
        };
        weak.upgrade().ok_or_else(|| {
            ProvisionErrorKind::InjectorUnavailable { state: "dropped" }.into()
        })
    }
}

impl Debug for ProviderSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ProviderSlot")
            .field("connected", &self.core.get().is_some())
            .finish()
    }
}

/// A type-erased factory handle for one key.
#[derive(Debug, Clone)]
pub struct UntypedProviderHandle {
    key: Box<dyn Key>,
    slot: Arc<ProviderSlot>,
}

impl UntypedProviderHandle {
    pub(crate) fn new(key: Box<dyn Key>, slot: Arc<ProviderSlot>) -> Self {
        Self { key, slot }
    }

    pub fn key(&self) -> &dyn Key {
        self.key.as_ref()
    }

    /// Resolves the key now, constructing the object if its scope requires.
    pub fn get(&self) -> Result<Box<dyn Managed>, ProvisionError> {
        self.slot.live_core()?.dyn_get(self.key.as_ref())
    }
}

/// A typed factory handle: each call resolves the key against the injector
/// it is connected to.
pub struct ProviderOf<T>
where
    T: Managed,
{
    inner: UntypedProviderHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProviderOf<T>
where
    T: Managed,
{
    pub(crate) fn from_untyped(inner: UntypedProviderHandle) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub(crate) fn deferred_handle(key: Box<dyn Key>, slot: Arc<ProviderSlot>) -> Self {
        Self::from_untyped(UntypedProviderHandle::new(key, slot))
    }

    pub fn key(&self) -> &dyn Key {
        self.inner.key()
    }

    /// Resolves the key and returns the typed object.
    pub fn get(&self) -> Result<T, ProvisionError> {
        match self.inner.get()?.downcast::<T>() {
            Ok(object) => Ok(*object),
            Err(_) => unreachable!("the object's type should be `T`"),
        }
    }
}

impl<T> Clone for ProviderOf<T>
where
    T: Managed,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for ProviderOf<T>
where
    T: Managed,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ProviderOf<T>")
            .field("key", &self.inner.key)
            .finish_non_exhaustive()
    }
}

/// A handle to an object that may still be under construction.
///
/// Requested inside a dependency cycle, the handle starts empty and is
/// filled in when the object it waits for finishes constructing. Reading it
/// before then fails; reading it afterwards yields the exact instance the
/// rest of the graph received.
pub struct Deferred<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    key: Box<dyn Key>,
    slot: Arc<OnceLock<Arc<T>>>,
}

impl<T> Deferred<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(key: Box<dyn Key>, slot: Arc<OnceLock<Arc<T>>>) -> Self {
        Self { key, slot }
    }

    /// The object, once its construction has completed.
    pub fn get(&self) -> Result<Arc<T>, ProvisionError> {
        self.slot.get().cloned().ok_or_else(|| {
            ProvisionErrorKind::NotYetConstructed {
                key: self.key.clone(),
            }
            .into()
        })
    }

    pub fn try_get(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Clone for Deferred<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Debug for Deferred<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Deferred<T>")
            .field("key", &self.key)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;
    use std::thread;

    use crate::element::Binder;
    use crate::inject::{InjectMembers, InjectStatics};
    use crate::injectable;
    use crate::module::dsl::{bind, bind_constant};
    use crate::provider::component::{Component, Dependency};
    use crate::scope::{CachingScope, ScopeMarker};

    use super::*;

    struct Service {
        logger: Arc<String>,
    }

    impl Component for Service {
        type Constructed = Self;

        type Error = Infallible;

        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::of::<Arc<String>>())]
        }

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
        where
            I: TypedInjector + ?Sized,
        {
            Ok(Ok(Self {
                logger: injector.get(key::of())?,
            }))
        }

        fn post_process(self) -> Self::Constructed {
            self
        }
    }

    fn service_container(logger: Arc<String>) -> Container {
        Container::builder()
            .install(move |binder: &mut Binder| {
                bind::<Arc<String>>()
                    .to_instance(Arc::clone(&logger))
                    .set_on(binder);
                bind::<Service>().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap()
    }

    #[test]
    fn get_instance_injects_the_bound_instance() {
        let logger = Arc::new(String::from("log"));
        let container = service_container(Arc::clone(&logger));

        let service: Service = container.get_instance(key::of()).unwrap();
        assert!(Arc::ptr_eq(&service.logger, &logger));
    }

    #[test]
    fn get_binding_is_idempotent() {
        let container = service_container(Arc::new(String::from("log")));

        let first = container.get_binding(&key::of::<Service>()).unwrap();
        let second = container.get_binding(&key::of::<Service>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn bindings_hold_at_most_one_entry_per_key() {
        let container = service_container(Arc::new(String::from("log")));

        let bindings = container.bindings();
        for binding in &bindings {
            let same: Vec<_> = bindings
                .iter()
                .filter(|other| other.key() == binding.key())
                .collect();
            assert_eq!(same.len(), 1, "duplicate binding for {}", binding.key());
        }
    }

    #[test]
    fn bindings_for_type_lists_every_qualifier() {
        let container = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<i32>().named("a").to_instance(1).set_on(binder);
                bind::<i32>().named("b").to_instance(2).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        assert_eq!(container.bindings_for_type(TypeId::of::<i32>()).len(), 2);
    }

    struct Counter;

    impl Counter {
        fn track(constructions: &Arc<AtomicUsize>) -> Self {
            constructions.fetch_add(1, Ordering::SeqCst);
            Counter
        }
    }

    impl Component for Counter {
        type Constructed = Arc<Self>;

        type Error = Infallible;

        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::of::<Arc<AtomicUsize>>())]
        }

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
        where
            I: TypedInjector + ?Sized,
        {
            let constructions: Arc<AtomicUsize> = injector.get(key::of())?;
            Ok(Ok(Self::track(&constructions)))
        }

        fn post_process(self) -> Self::Constructed {
            Arc::new(self)
        }
    }

    fn counter_container(constructions: Arc<AtomicUsize>, stage: Stage) -> Container {
        Container::builder()
            .stage(stage)
            .install(move |binder: &mut Binder| {
                bind::<Arc<AtomicUsize>>()
                    .to_instance(Arc::clone(&constructions))
                    .set_on(binder);
                bind::<Arc<Counter>>().in_singleton().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap()
    }

    #[test]
    fn singleton_is_constructed_once_across_threads() {
        let constructions = Arc::new(AtomicUsize::new(0));
        let container = counter_container(Arc::clone(&constructions), Stage::Development);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let container = container.clone();
                thread::spawn(move || {
                    container
                        .get_instance(key::of::<Arc<Counter>>())
                        .unwrap()
                })
            })
            .collect();
        let counters: Vec<Arc<Counter>> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert!(Arc::ptr_eq(&counters[0], &counters[1]));
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn production_stage_preloads_singletons() {
        let constructions = Arc::new(AtomicUsize::new(0));
        let container = counter_container(Arc::clone(&constructions), Stage::Production);

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        let _: Arc<Counter> = container.get_instance(key::of()).unwrap();
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tool_stage_neither_preloads_nor_injects() {
        let constructions = Arc::new(AtomicUsize::new(0));
        let _container = counter_container(Arc::clone(&constructions), Stage::Tool);

        assert_eq!(constructions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unscoped_bindings_construct_fresh_objects() {
        let constructions = Arc::new(AtomicUsize::new(0));
        let cell = Arc::clone(&constructions);
        let container = Container::builder()
            .install(move |binder: &mut Binder| {
                bind::<Arc<AtomicUsize>>()
                    .to_instance(Arc::clone(&cell))
                    .set_on(binder);
                bind::<Arc<Counter>>().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let first: Arc<Counter> = container.get_instance(key::of()).unwrap();
        let second: Arc<Counter> = container.get_instance(key::of()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(constructions.load(Ordering::SeqCst), 2);
    }

    trait Upstream: Send + Sync + 'static {
        fn downstream(&self) -> Arc<dyn Downstream>;
    }

    trait Downstream: Send + Sync + 'static {
        fn upstream(&self) -> Option<Arc<dyn Upstream>>;
    }

    struct UpstreamImpl {
        downstream: Arc<dyn Downstream>,
    }

    impl Upstream for UpstreamImpl {
        fn downstream(&self) -> Arc<dyn Downstream> {
            Arc::clone(&self.downstream)
        }
    }

    impl Component for UpstreamImpl {
        type Constructed = Arc<dyn Upstream>;

        type Error = Infallible;

        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::of::<Arc<dyn Downstream>>())]
        }

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
        where
            I: TypedInjector + ?Sized,
        {
            Ok(Ok(Self {
                downstream: injector.get(key::of())?,
            }))
        }

        fn post_process(self) -> Self::Constructed {
            Arc::new(self)
        }
    }

    struct DownstreamImpl {
        upstream: Deferred<dyn Upstream>,
    }

    impl Downstream for DownstreamImpl {
        fn upstream(&self) -> Option<Arc<dyn Upstream>> {
            self.upstream.try_get()
        }
    }

    impl Component for DownstreamImpl {
        type Constructed = Arc<dyn Downstream>;

        type Error = Infallible;

        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::deferred(key::of::<Arc<dyn Upstream>>())]
        }

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
        where
            I: TypedInjector + ?Sized,
        {
            Ok(Ok(Self {
                upstream: injector.get_deferred(key::of())?,
            }))
        }

        fn post_process(self) -> Self::Constructed {
            Arc::new(self)
        }
    }

    #[test]
    fn cycle_through_a_deferred_handle_succeeds() {
        let container = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<Arc<dyn Upstream>>()
                    .in_singleton()
                    .to::<UpstreamImpl>()
                    .set_on(binder);
                bind::<Arc<dyn Downstream>>()
                    .in_singleton()
                    .to::<DownstreamImpl>()
                    .set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let upstream: Arc<dyn Upstream> =
            container.get_instance(key::of()).unwrap();
        let through_cycle = upstream
            .downstream()
            .upstream()
            .expect("the deferred handle should be filled after construction");
        assert!(Arc::ptr_eq(&upstream, &through_cycle));
    }

    #[derive(Debug)]
    struct CycleA;

    impl Component for CycleA {
        type Constructed = Self;

        type Error = Infallible;

        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::of::<CycleB>())]
        }

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
        where
            I: TypedInjector + ?Sized,
        {
            let _other: CycleB = injector.get(key::of())?;
            Ok(Ok(Self))
        }

        fn post_process(self) -> Self::Constructed {
            self
        }
    }

    struct CycleB;

    impl Component for CycleB {
        type Constructed = Self;

        type Error = Infallible;

        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::of::<CycleA>())]
        }

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
        where
            I: TypedInjector + ?Sized,
        {
            let _other: CycleA = injector.get(key::of())?;
            Ok(Ok(Self))
        }

        fn post_process(self) -> Self::Constructed {
            self
        }
    }

    #[test]
    fn cycle_between_concrete_components_fails() {
        let container = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<CycleA>().set_on(binder);
                bind::<CycleB>().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let err = container.get_instance(key::of::<CycleA>()).unwrap_err();
        assert!(err.to_string().contains("circular"));
        assert!(err.to_string().contains("while locating"));
    }

    #[test]
    fn provider_handles_work_only_after_the_build() {
        let handle_cell: Arc<parking_lot::Mutex<Option<ProviderOf<i32>>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let cell = Arc::clone(&handle_cell);

        let container = Container::builder()
            .install(move |binder: &mut Binder| {
                let handle = binder.get_provider(key::of::<i32>());
                assert!(matches!(
                    handle.get().unwrap_err().kind(),
                    ProvisionErrorKind::InjectorUnavailable { .. }
                ));
                *cell.lock() = Some(handle);
                bind::<i32>().to_instance(42).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let handle = handle_cell.lock().take().unwrap();
        assert_eq!(handle.get().unwrap(), 42);
        drop(container);
        assert!(matches!(
            handle.get().unwrap_err().kind(),
            ProvisionErrorKind::InjectorUnavailable { .. }
        ));
    }

    #[test]
    fn get_provider_resolves_through_the_live_injector() {
        let container = service_container(Arc::new(String::from("log")));

        let provider = container.get_provider(key::of::<Service>()).unwrap();
        let service = provider.get().unwrap();
        assert_eq!(service.logger.as_str(), "log");
    }

    #[test]
    fn qualified_requests_fall_back_to_the_unqualified_binding() {
        let logger = Arc::new(String::from("log"));
        let container = service_container(Arc::clone(&logger));

        let via_alias: Arc<String> = container
            .get_instance(key::named("anything"))
            .unwrap();
        assert!(Arc::ptr_eq(&via_alias, &logger));
    }

    #[test]
    fn linked_keys_resolve_their_targets() {
        let logger = Arc::new(String::from("log"));
        let container = Container::builder()
            .install({
                let logger = Arc::clone(&logger);
                move |binder: &mut Binder| {
                    bind::<Arc<String>>()
                        .to_instance(Arc::clone(&logger))
                        .set_on(binder);
                    bind::<Arc<String>>()
                        .named("alias")
                        .to_key(key::of::<Arc<String>>())
                        .set_on(binder);
                    Ok(())
                }
            })
            .build()
            .unwrap();

        let aliased: Arc<String> = container.get_instance(key::named("alias")).unwrap();
        assert!(Arc::ptr_eq(&aliased, &logger));
    }

    #[test]
    fn named_scopes_cache_within_their_policy() {
        struct Request;
        impl ScopeMarker for Request {}

        let constructions = Arc::new(AtomicUsize::new(0));
        let cell = Arc::clone(&constructions);
        let container = Container::builder()
            .install(move |binder: &mut Binder| {
                binder.bind_scope::<Request>(CachingScope::new());
                bind::<Arc<AtomicUsize>>()
                    .to_instance(Arc::clone(&cell))
                    .set_on(binder);
                bind::<Arc<Counter>>().in_scope::<Request>().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let first: Arc<Counter> = container.get_instance(key::of()).unwrap();
        let second: Arc<Counter> = container.get_instance(key::of()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn child_injectors_reuse_parent_singletons() {
        let constructions = Arc::new(AtomicUsize::new(0));
        let parent = counter_container(Arc::clone(&constructions), Stage::Development);
        let child = parent.child_builder().build().unwrap();

        let from_child: Arc<Counter> = child.get_instance(key::of()).unwrap();
        let from_parent: Arc<Counter> = parent.get_instance(key::of()).unwrap();
        assert!(Arc::ptr_eq(&from_child, &from_parent));
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parents_refuse_to_synthesize_keys_their_children_bound() {
        let parent = Container::builder().build().unwrap();
        let child = parent
            .child_builder()
            .install(|binder: &mut Binder| {
                bind::<i32>().to_instance(7).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        assert_eq!(child.get_instance(key::of::<i32>()).unwrap(), 7);
        let err = parent.get_instance(key::of::<i32>()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ProvisionErrorKind::BoundInChild { .. }
        ));
    }

    static SHARED_DB: OnceLock<Arc<String>> = OnceLock::new();

    #[derive(Default)]
    struct Config {
        local: OnceLock<Arc<String>>,
    }

    impl InjectStatics for Config {
        fn inject_statics(injector: &dyn Injector) -> Result<(), ProvisionError> {
            let db: Arc<String> = injector.get(key::of())?;
            let _ = SHARED_DB.set(db);
            Ok(())
        }

        fn static_dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::of::<Arc<String>>())]
        }
    }

    impl InjectMembers for Config {
        fn inject_members(&self, injector: &dyn Injector) -> Result<(), ProvisionError> {
            let db: Arc<String> = injector.get(key::of())?;
            let _ = self.local.set(db);
            Ok(())
        }

        fn member_dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::of::<Arc<String>>())]
        }
    }

    #[test]
    fn static_injection_runs_once_and_ignores_instances() {
        let db = Arc::new(String::from("db"));
        let container = Container::builder()
            .install({
                let db = Arc::clone(&db);
                move |binder: &mut Binder| {
                    bind::<Arc<String>>()
                        .to_instance(Arc::clone(&db))
                        .set_on(binder);
                    binder.request_static_injection::<Config>();
                    Ok(())
                }
            })
            .build()
            .unwrap();

        let injected = SHARED_DB.get().expect("the static should be injected");

        let fresh = Config::default();
        container.inject_members(&fresh).unwrap();
        assert!(fresh.local.get().is_some());
        assert!(Arc::ptr_eq(
            SHARED_DB.get().unwrap(),
            injected
        ));
    }

    #[test]
    fn bound_instances_are_injected_before_they_can_be_observed() {
        let config = Arc::new(Config::default());
        let db = Arc::new(String::from("db"));
        let container = Container::builder()
            .install({
                let config = Arc::clone(&config);
                let db = Arc::clone(&db);
                move |binder: &mut Binder| {
                    bind::<Arc<String>>()
                        .to_instance(Arc::clone(&db))
                        .set_on(binder);
                    bind::<Arc<Config>>()
                        .to_injected_instance(Arc::clone(&config))
                        .set_on(binder);
                    Ok(())
                }
            })
            .build()
            .unwrap();

        assert!(config.local.get().is_some());
        let served: Arc<Config> = container.get_instance(key::of()).unwrap();
        assert!(Arc::ptr_eq(&served, &config));
    }

    #[test]
    fn requested_injections_run_at_the_end_of_the_build() {
        let config = Arc::new(Config::default());
        let db = Arc::new(String::from("db"));
        let _container = Container::builder()
            .install({
                let config = Arc::clone(&config);
                let db = Arc::clone(&db);
                move |binder: &mut Binder| {
                    bind::<Arc<String>>()
                        .to_instance(Arc::clone(&db))
                        .set_on(binder);
                    binder.request_injection(Arc::clone(&config));
                    Ok(())
                }
            })
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(config.local.get().unwrap(), &db));
    }

    struct Greeter {
        greeting: String,
        retries: i32,
    }

    #[injectable]
    impl Greeter {
        #[inject]
        fn new(greeting: String, #[named("retries")] retries: i32) -> Self {
            Self { greeting, retries }
        }
    }

    #[test]
    fn generated_components_resolve_their_annotated_keys() {
        let container = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<String>()
                    .to_instance(String::from("hello"))
                    .set_on(binder);
                bind_constant().named("retries").to(3i32).set_on(binder);
                bind::<Greeter>().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let greeter: Greeter = container.get_instance(key::of()).unwrap();
        assert_eq!(greeter.greeting, "hello");
        assert_eq!(greeter.retries, 3);
    }

    #[test]
    fn get_auto_synthesizes_a_constructor_binding() {
        struct Standalone;

        impl Component for Standalone {
            type Constructed = Arc<Self>;

            type Error = Infallible;

            fn dependencies() -> Vec<Dependency> {
                Vec::new()
            }

            fn construct<I>(
                _injector: &I,
            ) -> Result<Result<Self, Self::Error>, ProvisionError>
            where
                I: TypedInjector + ?Sized,
            {
                Ok(Ok(Self))
            }

            fn post_process(self) -> Self::Constructed {
                Arc::new(self)
            }
        }

        let container = Container::builder().build().unwrap();
        let first = container.get_auto::<Standalone>().unwrap();
        let _second = container.get_auto::<Standalone>().unwrap();
        assert!(container
            .get_binding(&key::of::<Arc<Standalone>>())
            .is_some());
        let _ = first;
    }
}
