use std::any::TypeId;

use crate::container::injector::{
    CallContext, DeferredFill, Injector, TypedInjector,
};
use crate::container::{Managed, UntypedProviderHandle};
use crate::errors::ProvisionError;
use crate::key::Key;

/// Forwards every request through a stored [`CallContext`], so providers can
/// use the plain [`Injector`] surface while the request chain keeps growing.
pub struct ContextForwardingInjectorProxy<'a, I>
where
    I: TypedInjector + ?Sized,
{
    inner: &'a I,
    context: &'a CallContext<'a>,
}

impl<'a, I> ContextForwardingInjectorProxy<'a, I>
where
    I: TypedInjector + ?Sized,
{
    pub fn new(inner: &'a I, context: &'a CallContext<'a>) -> Self {
        Self { inner, context }
    }
}

impl<I> Injector for ContextForwardingInjectorProxy<'_, I>
where
    I: TypedInjector + ?Sized,
{
    fn dyn_get(&self, key: &dyn Key) -> Result<Box<dyn Managed>, ProvisionError> {
        self.dyn_get_dependency(key, self.context)
    }

    fn dyn_get_dependency<'a>(
        &self,
        key: &dyn Key,
        context: &'a CallContext<'a>,
    ) -> Result<Box<dyn Managed>, ProvisionError> {
        self.inner.dyn_get_dependency(key, context)
    }

    fn dyn_provider_handle(
        &self,
        key: &dyn Key,
    ) -> Result<UntypedProviderHandle, ProvisionError> {
        self.inner.dyn_provider_handle(key)
    }

    fn dyn_request_deferred(
        &self,
        key: &dyn Key,
        fill: DeferredFill,
    ) -> Result<(), ProvisionError> {
        let fill = match self.context.store() {
            Some(store) => match store.offer_fill(key, fill) {
                None => return Ok(()),
                Some(fill) => fill,
            },
            None => fill,
        };
        let object = self.inner.dyn_get_dependency(key, self.context)?;
        fill(object);
        Ok(())
    }

    fn keys(&self, type_id: TypeId) -> Vec<Box<dyn Key>> {
        self.inner.keys(type_id)
    }
}
