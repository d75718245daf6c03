pub mod closure;
pub mod component;
pub mod instance;

use std::fmt::Debug;

use crate::container::injector::{CallContext, Injector, TypedInjector};
use crate::container::{Managed, SharedManaged};
use crate::errors::ProvisionError;

/// A universal factory which constructs objects of one type.
///
/// A [`Provider`] is responsible for constructing an object on each request
/// and retrieving all dependencies from an [`Injector`]. Providers are
/// stateless by convention and may be shared between threads.
pub trait Provider: Debug + Send + Sync + 'static {
    /// Provides a newly created type-erased object. The `context` carries the
    /// chain of requests leading here, used for cycle detection and error
    /// attribution.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency can't be fetched or the object
    /// construction fails.
    fn dyn_provide(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ProvisionError>;
}

/// A static variant of the [`Provider`] trait, leveraging static dispatch
/// and type-safety.
///
/// Implement this instead of [`Provider`]; the blanket implementation
/// supplies the type-erased form.
pub trait TypedProvider: Provider {
    /// The return type in response to each request to the provider.
    type Output: Managed;

    /// Provides a newly created object of type [`TypedProvider::Output`].
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency can't be fetched or the object
    /// construction fails.
    fn provide<I>(
        &self,
        injector: &I,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ProvisionError>
    where
        I: TypedInjector + ?Sized;
}

impl<T: TypedProvider> Provider for T {
    fn dyn_provide(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn Managed>, ProvisionError> {
        self.provide(injector, context)
            .map(|obj| -> Box<dyn Managed> { Box::new(obj) })
    }
}

/// A variant of the [`Provider`] trait which produces a shareable object,
/// suitable for bindings whose instances are cached by a scope.
pub trait SharedProvider: Provider {
    /// Provides a newly created shareable type-erased object.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency can't be fetched or the object
    /// construction fails.
    fn dyn_provide_shared(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn SharedManaged>, ProvisionError>;

    /// Returns a reference to `self` as a [`Provider`].
    fn upcast_provider(&self) -> &dyn Provider;
}

/// A static variant of the [`SharedProvider`] trait.
pub trait TypedSharedProvider
where
    Self: SharedProvider + TypedProvider<Output: SharedManaged>,
{
}

impl<T: TypedSharedProvider> SharedProvider for T {
    fn dyn_provide_shared(
        &self,
        injector: &dyn Injector,
        context: &CallContext<'_>,
    ) -> Result<Box<dyn SharedManaged>, ProvisionError> {
        self.provide(injector, context)
            .map(|obj| -> Box<dyn SharedManaged> { Box::new(obj) })
    }

    fn upcast_provider(&self) -> &dyn Provider {
        self
    }
}
