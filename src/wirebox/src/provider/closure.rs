use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::container::injector::{
    CallContext, ContextForwardingInjectorProxy, Injector, TypedInjector,
};
use crate::container::{Managed, SharedManaged};
use crate::errors::{ProvisionError, ProvisionErrorKind};
use crate::provider::{TypedProvider, TypedSharedProvider};

/// A specialized form of [`Fn`] which accepts an [`Injector`] and constructs
/// objects, fetching whatever dependencies it needs on the way.
pub trait ProviderFn
where
    Self: Fn(&dyn Injector) -> Result<Result<Self::Constructed, Self::Error>, ProvisionError>,
    Self: Send + Sync + 'static,
{
    /// The successfully constructed object.
    type Constructed: Managed;

    /// The error occurring in object construction after all dependencies
    /// are retrieved.
    type Error: Into<Box<dyn Error + Send + Sync>>;
}

impl<F, T, E> ProviderFn for F
where
    T: Managed,
    E: Into<Box<dyn Error + Send + Sync>>,
    Self: Fn(&dyn Injector) -> Result<Result<T, E>, ProvisionError>,
    Self: Send + Sync + 'static,
{
    type Constructed = T;

    type Error = E;
}

/// A [`Provider`] which supplies objects from a [`ProviderFn`].
///
/// # Examples
///
/// ```rust
/// # use std::convert::Infallible;
/// # use wirebox::provider::closure::ClosureProvider;
/// let provider = ClosureProvider::new(|_injector| Ok(Ok::<_, Infallible>(42i32)));
/// ```
///
/// [`Provider`]: crate::provider::Provider
pub struct ClosureProvider<T, C>
where
    T: Managed,
    C: ProviderFn<Constructed = T>,
{
    closure: C,
}

impl<T, C> ClosureProvider<T, C>
where
    T: Managed,
    C: ProviderFn<Constructed = T>,
{
    /// Creates a new [`ClosureProvider`] from a [`ProviderFn`].
    pub fn new(closure: C) -> Self {
        Self { closure }
    }
}

impl<T, C> Debug for ClosureProvider<T, C>
where
    T: Managed,
    C: ProviderFn<Constructed = T>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ClosureProvider<T, C>")
            .finish_non_exhaustive()
    }
}

impl<T, C> TypedProvider for ClosureProvider<T, C>
where
    T: Managed,
    C: ProviderFn<Constructed = T>,
{
    type Output = T;

    fn provide<I>(
        &self,
        injector: &I,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ProvisionError>
    where
        I: TypedInjector + ?Sized,
    {
        let injector = ContextForwardingInjectorProxy::new(injector, context);
        match (self.closure)(&injector) {
            Ok(Ok(obj)) => Ok(obj),
            Ok(Err(err)) => Err(ProvisionError::from(ProvisionErrorKind::ConstructionFailed {
                key: context.key().dyn_clone(),
                source: Arc::from(err.into()),
            })),
            Err(err) => Err(err),
        }
    }
}

impl<T, C> TypedSharedProvider for ClosureProvider<T, C>
where
    T: SharedManaged,
    C: ProviderFn<Constructed = T>,
{
}
