mod context;
mod proxy;

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use crate::container::{Deferred, Managed, ProviderOf, UntypedProviderHandle};
use crate::errors::{ProvisionError, ProvisionErrorKind};
use crate::key::{Key, TypedKey};
use crate::util::any::Downcast;

pub use context::{CallContext, InjectionTrace};
pub(crate) use context::ConstructionStore;
pub(crate) use proxy::ContextForwardingInjectorProxy;

/// A callback receiving the constructed object a deferred handle waits for.
pub type DeferredFill = Box<dyn FnOnce(Box<dyn Managed>) + Send>;

/// The type-erased provisioning surface, implemented by the container and by
/// the proxies it threads through providers.
#[cfg_attr(test, mockall::automock)]
pub trait Injector: Send + Sync {
    /// Resolves `key` and constructs or fetches the object, starting a fresh
    /// request.
    fn dyn_get(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ProvisionError>;

    /// Resolves `key` as a dependency of the request described by `context`.
    fn dyn_get_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ProvisionError>;

    /// Returns a handle that resolves `key` when called.
    fn dyn_provider_handle(
        &self,
        key: &dyn Key,
    ) -> Result<UntypedProviderHandle, ProvisionError>;

    /// Requests the object for `key` through `fill`. When the key is under
    /// construction in the current request, `fill` runs once that
    /// construction finishes; otherwise it runs before this method returns.
    fn dyn_request_deferred(
        &self,
        key: &dyn Key,
        fill: DeferredFill,
    ) -> Result<(), ProvisionError>;

    /// Every key with a recorded binding for the given target type.
    fn keys(&self, type_id: TypeId) -> Vec<Box<dyn Key>>;
}

/// The statically typed provisioning surface, layered over any [`Injector`].
pub trait TypedInjector: Injector {
    /// Resolves `key` and returns the typed object.
    fn get<K>(&self, key: K) -> Result<K::Target, ProvisionError>
    where
        K: TypedKey,
    {
        match self.dyn_get(&key) {
            Ok(boxed) => match boxed.downcast::<K::Target>() {
                Ok(object) => Ok(*object),
                Err(_) => unreachable!("the object's type should be `K::Target`"),
            },
            Err(err) => Err(err),
        }
    }

    /// Like [`get`](Self::get), but a missing binding for `key` yields
    /// `None` instead of an error.
    fn get_optional<K>(&self, key: K) -> Result<Option<K::Target>, ProvisionError>
    where
        K: TypedKey,
    {
        match self.get(key) {
            Ok(object) => Ok(Some(object)),
            Err(err) => match err.kind() {
                ProvisionErrorKind::NotFound { key: missing }
                    if missing.as_ref() == &key as &dyn Key =>
                {
                    Ok(None)
                }
                _ => Err(err),
            },
        }
    }

    /// Returns a handle producing the object for `key` on demand. The handle
    /// stays usable for as long as the injector lives.
    fn get_provider<K>(&self, key: K) -> Result<ProviderOf<K::Target>, ProvisionError>
    where
        K: TypedKey,
    {
        self.dyn_provider_handle(&key).map(ProviderOf::from_untyped)
    }

    /// Returns a handle to the object for `key` that may be read after the
    /// current construction completes, allowing a dependency cycle to close.
    fn get_deferred<T, K>(&self, key: K) -> Result<Deferred<T>, ProvisionError>
    where
        T: ?Sized + Send + Sync + 'static,
        K: TypedKey<Target = Arc<T>>,
    {
        let slot = Arc::new(OnceLock::<Arc<T>>::new());
        let fill_slot = Arc::clone(&slot);
        let fill: DeferredFill = Box::new(move |object| {
            if let Ok(value) = object.downcast::<Arc<T>>() {
                let _ = fill_slot.set(*value);
            }
        });
        self.dyn_request_deferred(&key, fill)?;
        Ok(Deferred::new(key.dyn_clone(), slot))
    }

    fn upcast_dyn(&self) -> &dyn Injector;
}

impl<T> TypedInjector for T
where
    T: Injector,
{
    fn upcast_dyn(&self) -> &dyn Injector {
        self
    }
}

impl TypedInjector for dyn Injector + '_ {
    fn upcast_dyn(&self) -> &dyn Injector {
        self
    }
}
