use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use oneshot::{Receiver, Sender};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::trace;

use crate::container::builder::Stage;
use crate::container::injector::{
    CallContext, ConstructionStore, DeferredFill, Injector,
};
use crate::container::registry::{Binding, BindingKind, BindingMap, Factory};
use crate::container::{Managed, ProviderSlot, SharedManaged, UntypedProviderHandle};
use crate::convert::TypeConverter;
use crate::errors::{ProvisionError, ProvisionErrorKind};
use crate::key::Key;
use crate::provider::component::{Component, ComponentProvider, Dependency};
use crate::provider::Provider;
use crate::scope::{Scope, Scoping};
use crate::source::Source;

/// The runtime state of one injector: its binding maps, scope and converter
/// registries, and the singleton cache.
pub(crate) struct ContainerCore {
    parent: Option<Arc<ContainerCore>>,
    stage: Stage,
    bindings: BindingMap,
    jit: Mutex<BindingMap>,
    blacklist: Mutex<HashSet<Box<dyn Key>>>,
    scopes: HashMap<TypeId, Arc<dyn Scope>>,
    converters: Vec<TypeConverter>,
    singletons: RwLock<SingletonData>,
    self_weak: Weak<ContainerCore>,
}

impl ContainerCore {
    pub fn new_cyclic(
        weak: &Weak<ContainerCore>,
        parent: Option<Arc<ContainerCore>>,
        stage: Stage,
        bindings: BindingMap,
        scopes: HashMap<TypeId, Arc<dyn Scope>>,
        converters: Vec<TypeConverter>,
    ) -> Self {
        Self {
            parent,
            stage,
            bindings,
            jit: Mutex::new(BindingMap::new()),
            blacklist: Mutex::new(HashSet::new()),
            scopes,
            converters,
            singletons: RwLock::new(SingletonData::new()),
            self_weak: weak.clone(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn parent(&self) -> Option<&Arc<ContainerCore>> {
        self.parent.as_ref()
    }

    fn strong_self(&self) -> Arc<ContainerCore> {
        self.self_weak
            .upgrade()
            .unwrap_or_else(|| unreachable!("`self` is alive, so the weak self reference is too"))
    }

    /// Forbids this injector from synthesizing its own binding for `key`;
    /// called when a child injector records an explicit binding for it.
    pub fn blacklist_key(&self, key: &dyn Key) {
        self.blacklist.lock().insert(key.dyn_clone());
    }

    /// The scope registered for `marker` here or in any ancestor.
    pub fn lookup_scope(&self, marker: TypeId) -> Option<Arc<dyn Scope>> {
        if let Some(scope) = self.scopes.get(&marker) {
            return Some(Arc::clone(scope));
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.lookup_scope(marker))
    }

    /// Explicit bindings of this injector; the build pipeline initializes
    /// and preloads over this set.
    pub fn explicit_bindings(&self) -> Vec<Arc<Binding>> {
        self.bindings.all()
    }

    /// The binding serving `key`, if one has been recorded or synthesized.
    pub fn find_binding(&self, key: &dyn Key) -> Option<Arc<Binding>> {
        self.lookup_recorded(key).map(|(binding, _)| binding)
    }

    /// Every recorded binding, explicit and synthesized.
    pub fn recorded_bindings(&self) -> Vec<Arc<Binding>> {
        let mut all = self.bindings.all();
        all.extend(self.jit.lock().all());
        all
    }

    // --- resolution ---

    fn lookup_recorded(&self, key: &dyn Key) -> Option<(Arc<Binding>, Arc<ContainerCore>)> {
        if let Some(parent) = &self.parent {
            if let Some(found) = parent.lookup_recorded(key) {
                return Some(found);
            }
        }
        if let Some(binding) = self.bindings.get(key) {
            return Some((Arc::clone(binding), self.strong_self()));
        }
        if let Some(binding) = self.jit.lock().get(key) {
            return Some((Arc::clone(binding), self.strong_self()));
        }
        None
    }

    pub(crate) fn lookup_explicit_chain(
        &self,
        key: &dyn Key,
    ) -> Option<(Arc<Binding>, Arc<ContainerCore>)> {
        if let Some(parent) = &self.parent {
            if let Some(found) = parent.lookup_explicit_chain(key) {
                return Some(found);
            }
        }
        self.bindings
            .get(key)
            .map(|binding| (Arc::clone(binding), self.strong_self()))
    }

    /// Resolves `key` to a binding, synthesizing and memoizing one when no
    /// explicit binding exists. Returns the binding together with the
    /// injector that owns it, which is where scoped instances are cached.
    pub fn resolve(
        &self,
        key: &dyn Key,
    ) -> Result<(Arc<Binding>, Arc<ContainerCore>), ProvisionError> {
        if let Some(found) = self.lookup_recorded(key) {
            return Ok(found);
        }

        let mut jit = self.jit.lock();
        if let Some(binding) = jit.get(key) {
            return Ok((Arc::clone(binding), self.strong_self()));
        }
        if self.blacklist.lock().contains(key) {
            return Err(ProvisionErrorKind::BoundInChild {
                key: key.dyn_clone(),
            }
            .into());
        }

        let binding = self.synthesize_binding(key)?;
        trace!(key = %key, kind = ?binding.kind(), "synthesized a just-in-time binding");
        let binding = Arc::new(binding);
        jit.insert_under(key.dyn_clone(), Arc::clone(&binding));
        Ok((binding, self.strong_self()))
    }

    /// Creates a just-in-time binding for a key nobody declared: a converted
    /// string constant when one matches, else a fallback to the same key
    /// without its qualifier.
    fn synthesize_binding(&self, key: &dyn Key) -> Result<Binding, ProvisionError> {
        if key.target_type() != TypeId::of::<String>() {
            if let Some(converted) = self.try_convert_constant(key)? {
                return Ok(converted);
            }
        }

        if key.is_qualified() {
            let stripped = key.without_qualifier();
            if let Some((binding, _)) = self.lookup_explicit_chain(stripped.as_ref()) {
                return Ok(Binding::new(
                    key.dyn_clone(),
                    binding.source(),
                    Scoping::NoScope,
                    BindingKind::Linked,
                    Factory::Owned(Arc::new(StrippedKeyProvider {
                        target: stripped.clone(),
                    })),
                    vec![Dependency::on_boxed(stripped.clone())],
                )
                .with_link_target(stripped));
            }
        }

        Err(ProvisionErrorKind::NotFound {
            key: key.dyn_clone(),
        }
        .into())
    }

    /// Converts a string constant bound under the same qualifier into the
    /// requested type, when exactly one registered converter matches.
    fn try_convert_constant(&self, key: &dyn Key) -> Result<Option<Binding>, ProvisionError> {
        let string_key = key.with_string_target();
        let Some((constant, _)) = self.lookup_explicit_chain(string_key.as_ref()) else {
            return Ok(None);
        };
        if constant.kind() != BindingKind::Constant {
            return Ok(None);
        }

        let mut matching = self.matching_converters(key);
        if matching.len() > 1 {
            return Err(ProvisionErrorKind::AmbiguousConversion {
                key: key.dyn_clone(),
                first: matching[0].name(),
                second: matching[1].name(),
            }
            .into());
        }
        let Some(converter) = matching.pop() else {
            return Ok(None);
        };

        let text = self.constant_text(&constant, string_key.as_ref())?;
        let value = converter.convert(&text).map_err(|reason| {
            ProvisionError::from(ProvisionErrorKind::Conversion {
                key: key.dyn_clone(),
                reason: format!("{reason} (value {text:?} bound at {})", constant.source()),
            })
        })?;
        if value.as_any().type_id() != key.target_type() {
            return Err(ProvisionErrorKind::ConversionTypeMismatch {
                key: key.dyn_clone(),
                converter: converter.name(),
                produced: value.type_name(),
            }
            .into());
        }

        Ok(Some(Binding::new(
            key.dyn_clone(),
            constant.source(),
            Scoping::NoScope,
            BindingKind::ConvertedConstant,
            Factory::Owned(Arc::new(ConvertedConstantProvider { converter, text })),
            vec![Dependency::on_boxed(string_key)],
        )))
    }

    fn matching_converters(&self, key: &dyn Key) -> Vec<TypeConverter> {
        let mut matching: Vec<TypeConverter> = self
            .converters
            .iter()
            .filter(|converter| converter.matches(key))
            .cloned()
            .collect();
        if let Some(parent) = &self.parent {
            matching.extend(parent.matching_converters(key));
        }
        matching
    }

    fn constant_text(
        &self,
        constant: &Arc<Binding>,
        string_key: &dyn Key,
    ) -> Result<String, ProvisionError> {
        let factory = constant.provision_factory()?;
        let context = CallContext::new(string_key);
        let object = match factory {
            Factory::Owned(provider) => provider.dyn_provide(self, &context)?,
            Factory::Shared(provider) => provider
                .dyn_provide_shared(self, &context)?
                .upcast_managed(),
        };
        match crate::util::any::Downcast::downcast::<String>(object) {
            Ok(text) => Ok(*text),
            Err(_) => unreachable!("a constant under a string key stores a `String`"),
        }
    }

    /// Memoizes a binding that constructs `C` through its injectable
    /// constructor, scoped as the component declares. The typed request
    /// paths use this to serve keys nobody bound explicitly.
    pub fn ensure_constructor_binding<C>(&self, key: &dyn Key) -> Result<(), ProvisionError>
    where
        C: Component,
        C::Constructed: SharedManaged,
    {
        if self.lookup_recorded(key).is_some() {
            return Ok(());
        }

        let mut jit = self.jit.lock();
        if jit.get(key).is_some() {
            return Ok(());
        }
        if self.blacklist.lock().contains(key) {
            return Err(ProvisionErrorKind::BoundInChild {
                key: key.dyn_clone(),
            }
            .into());
        }

        let binding = Binding::new(
            key.dyn_clone(),
            Source::Unknown,
            C::scoping(),
            BindingKind::Constructor,
            Factory::Shared(Arc::new(ComponentProvider::<C>::new())),
            C::dependencies(),
        );
        let initialized = binding.initialize(&|marker| self.lookup_scope(marker));
        let binding = Arc::new(binding);
        jit.insert_under(key.dyn_clone(), Arc::clone(&binding));
        match initialized {
            Ok(()) => Ok(()),
            Err(reason) => Err(ProvisionErrorKind::InvalidBinding {
                key: key.dyn_clone(),
                reason,
            }
            .into()),
        }
    }

    // --- provisioning ---

    fn get_object(&self, context: &CallContext<'_>) -> Result<Box<dyn Managed>, ProvisionError> {
        let key = context.key();
        let (binding, owner) = self.resolve(key)?;
        let result = match binding.scoping() {
            Scoping::NoScope => self.construct_transient(&binding, context),
            Scoping::Singleton | Scoping::EagerSingleton => owner
                .get_singleton(&binding, context)
                .map(SharedManaged::upcast_managed),
            Scoping::Named { .. } => owner.construct_transient(&binding, context),
        };
        result.map_err(|err| err.while_locating(key, binding.source()))
    }

    /// Runs the binding's factory once for this request, letting any
    /// deferred handles registered against `key` fill in afterwards.
    fn construct_transient(
        &self,
        binding: &Arc<Binding>,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ProvisionError> {
        let key = context.key();
        if context.trace().previous_exist_key(key) {
            return Err(ProvisionErrorKind::CyclicDependency {
                key: key.dyn_clone(),
            }
            .into());
        }

        let factory = binding.provision_factory()?;
        let store = context.store();
        if let Some(store) = store {
            store.begin(key);
        }
        match factory {
            Factory::Owned(provider) => {
                let result = provider.dyn_provide(self, context);
                if let Some(store) = store {
                    store.complete(key, None);
                }
                result
            }
            Factory::Shared(provider) => match provider.dyn_provide_shared(self, context) {
                Ok(object) => {
                    if let Some(store) = store {
                        store.complete(key, Some(object.as_ref()));
                    }
                    Ok(object.upcast_managed())
                }
                Err(err) => {
                    if let Some(store) = store {
                        store.complete(key, None);
                    }
                    Err(err)
                }
            },
        }
    }

    /// Serves a singleton binding from the cache, constructing it on first
    /// use. A second thread asking for the same key blocks until the first
    /// finishes; the same thread asking again is a dependency cycle.
    fn get_singleton(
        &self,
        binding: &Arc<Binding>,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn SharedManaged>, ProvisionError> {
        let key = binding.key();
        {
            let data = self.singletons.read();
            if let Some(object) = data.objects.get(key) {
                return Ok(object.dyn_clone());
            }
        }

        let factory = binding.provision_factory()?;
        let Factory::Shared(provider) = factory else {
            unreachable!("a singleton binding always carries a shared factory")
        };

        let mut data = self.singletons.write();
        if let Some(object) = data.objects.get(key) {
            return Ok(object.dyn_clone());
        }
        if let Some(constructing) = data.constructing.get_mut(key) {
            return if constructing.is_constructed_by_current_thread() {
                Err(self.stop_construction_on_cycle(data, key))
            } else {
                self.wait_for_constructed_object(data, key)
            };
        }
        data.constructing.insert(
            key.dyn_clone(),
            ConstructingObjectContext::new(thread::current().id()),
        );
        drop(data);

        let store = context.store();
        if let Some(store) = store {
            store.begin(key);
        }
        match provider.dyn_provide_shared(self, context) {
            Ok(object) => {
                if let Some(store) = store {
                    store.complete(key, Some(object.as_ref()));
                }
                let mut data = self.singletons.write();
                data.objects.insert(key.dyn_clone(), object.dyn_clone());
                self.notify_waiters(data, key, WaitResponse::Constructed);
                Ok(object)
            }
            Err(err) => {
                if let Some(store) = store {
                    store.complete(key, None);
                }
                let data = self.singletons.write();
                self.notify_waiters(data, key, WaitResponse::Error(err.clone()));
                Err(err)
            }
        }
    }

    fn stop_construction_on_cycle(
        &self,
        data: RwLockWriteGuard<'_, SingletonData>,
        key: &dyn Key,
    ) -> ProvisionError {
        let err = ProvisionError::from(ProvisionErrorKind::CyclicDependency {
            key: key.dyn_clone(),
        });
        self.notify_waiters(data, key, WaitResponse::Error(err.clone()));
        err
    }

    fn wait_for_constructed_object(
        &self,
        mut data: RwLockWriteGuard<'_, SingletonData>,
        key: &dyn Key,
    ) -> Result<Box<dyn SharedManaged>, ProvisionError> {
        let (sender, receiver) = oneshot::channel();
        let Some(constructing) = data.constructing.get_mut(key) else {
            unreachable!("whether the construction is in flight was checked above")
        };
        constructing.register_waiter(sender);
        drop(data);
        self.consume_wait_response(receiver, key)
    }

    fn consume_wait_response(
        &self,
        receiver: Receiver<WaitResponse>,
        key: &dyn Key,
    ) -> Result<Box<dyn SharedManaged>, ProvisionError> {
        match receiver.recv() {
            Ok(WaitResponse::Constructed) => {
                let data = self.singletons.read();
                let Some(object) = data.objects.get(key) else {
                    unreachable!("the constructing thread stores the object before notifying")
                };
                Ok(object.dyn_clone())
            }
            Ok(WaitResponse::Error(err)) => Err(err),
            Err(_) => unreachable!("the constructing thread always sends a response"),
        }
    }

    fn notify_waiters(
        &self,
        mut data: RwLockWriteGuard<'_, SingletonData>,
        key: &dyn Key,
        response: WaitResponse,
    ) {
        if let Some(constructing) = data.constructing.remove(key) {
            drop(data);
            constructing.notify(response);
        }
    }
}

impl Debug for ContainerCore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ContainerCore")
            .field("stage", &self.stage)
            .field("has_parent", &self.parent.is_some())
            .finish_non_exhaustive()
    }
}

impl Injector for ContainerCore {
    fn dyn_get(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ProvisionError> {
        let store = ConstructionStore::new();
        let context = CallContext::with_store(key, &store);
        self.get_object(&context)
    }

    fn dyn_get_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ProvisionError> {
        let context = context.append(key);
        self.get_object(&context)
    }

    fn dyn_provider_handle(
        &self,
        key: &dyn Key,
    ) -> Result<UntypedProviderHandle, ProvisionError> {
        self.resolve(key)?;
        Ok(UntypedProviderHandle::new(
            key.dyn_clone(),
            Arc::new(ProviderSlot::filled(self.self_weak.clone())),
        ))
    }

    fn dyn_request_deferred(
        &self,
        key: &dyn Key,
        fill: DeferredFill,
    ) -> Result<(), ProvisionError> {
        let object = self.dyn_get(key)?;
        fill(object);
        Ok(())
    }

    fn keys(&self, type_id: TypeId) -> Vec<Box<dyn Key>> {
        let mut keys = match &self.parent {
            Some(parent) => parent.keys(type_id),
            None => Vec::new(),
        };
        keys.extend(self.bindings.keys(type_id));
        keys.extend(self.jit.lock().keys(type_id));
        keys
    }
}

/// A [`Provider`] serving a just-in-time conversion of a string constant.
struct ConvertedConstantProvider {
    converter: TypeConverter,
    text: String,
}

impl Debug for ConvertedConstantProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ConvertedConstantProvider")
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl Provider for ConvertedConstantProvider {
    fn dyn_provide(
        &self,
        _injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ProvisionError> {
        self.converter.convert(&self.text).map_err(|reason| {
            ProvisionErrorKind::Conversion {
                key: context.key().dyn_clone(),
                reason,
            }
            .into()
        })
    }
}

/// A [`Provider`] serving a qualified key through its unqualified binding.
struct StrippedKeyProvider {
    target: Box<dyn Key>,
}

impl Debug for StrippedKeyProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StrippedKeyProvider")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl Provider for StrippedKeyProvider {
    fn dyn_provide(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ProvisionError> {
        injector.dyn_get_dependency(self.target.as_ref(), context)
    }
}

struct SingletonData {
    objects: HashMap<Box<dyn Key>, Box<dyn SharedManaged>>,
    constructing: HashMap<Box<dyn Key>, ConstructingObjectContext>,
}

impl SingletonData {
    fn new() -> Self {
        Self {
            objects: HashMap::new(),
            constructing: HashMap::new(),
        }
    }
}

struct ConstructingObjectContext {
    on_thread: ThreadId,
    waiters: Vec<Sender<WaitResponse>>,
}

impl ConstructingObjectContext {
    fn new(on_thread: ThreadId) -> Self {
        Self {
            on_thread,
            waiters: Vec::new(),
        }
    }

    fn is_constructed_by_current_thread(&self) -> bool {
        thread::current().id() == self.on_thread
    }

    fn register_waiter(&mut self, sender: Sender<WaitResponse>) {
        self.waiters.push(sender);
    }

    fn notify(self, response: WaitResponse) {
        for sender in self.waiters {
            let _ = sender.send(response.clone());
        }
    }
}

#[derive(Debug, Clone)]
enum WaitResponse {
    Constructed,
    Error(ProvisionError),
}
