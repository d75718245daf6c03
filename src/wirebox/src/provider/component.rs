//! Construction of types through their declared injectable constructor.

use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::injector::{
    CallContext, ContextForwardingInjectorProxy, TypedInjector,
};
use crate::container::{Managed, SharedManaged};
use crate::errors::{ProvisionError, ProvisionErrorKind};
use crate::key::Key;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::scope::Scoping;

/// One declared dependency of a component, used to check the object graph
/// without constructing anything.
#[derive(Debug, Clone)]
pub struct Dependency {
    key: Box<dyn Key>,
    optional: bool,
    deferred: bool,
}

impl Dependency {
    /// A mandatory dependency on `key`.
    pub fn on(key: impl Key) -> Self {
        Self::on_boxed(key.dyn_clone())
    }

    /// A mandatory dependency on an already type-erased key.
    pub fn on_boxed(key: Box<dyn Key>) -> Self {
        Self {
            key,
            optional: false,
            deferred: false,
        }
    }

    /// A dependency that is skipped silently when no binding exists.
    pub fn optional(key: impl Key) -> Self {
        Self {
            key: key.dyn_clone(),
            optional: true,
            deferred: false,
        }
    }

    /// A dependency satisfied through a deferred handle, so it may
    /// participate in a dependency cycle.
    pub fn deferred(key: impl Key) -> Self {
        Self {
            key: key.dyn_clone(),
            optional: false,
            deferred: true,
        }
    }

    pub fn key(&self) -> &dyn Key {
        self.key.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }
}

/// A type that has a dedicated constructor for dependency injection.
///
/// Usually the [`injectable`] attribute generates this implementation from
/// an annotated `impl` block. A hand-written implementation looks like this:
///
/// ```rust
/// # use std::sync::Arc;
/// # use std::convert::Infallible;
/// # use wirebox::container::injector::TypedInjector;
/// # use wirebox::errors::ProvisionError;
/// # use wirebox::provider::component::{Component, Dependency};
/// # use wirebox::key;
/// #
/// trait Greeter: Send + Sync + 'static {}
///
/// struct GreeterImpl {
///     prefix: String,
/// }
///
/// impl Greeter for GreeterImpl {}
///
/// impl Component for GreeterImpl {
///     type Constructed = Arc<dyn Greeter>;
///
///     type Error = Infallible;
///
///     fn dependencies() -> Vec<Dependency> {
///         vec![Dependency::on(key::of::<String>())]
///     }
///
///     fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
///     where
///         I: TypedInjector + ?Sized,
///     {
///         let prefix = injector.get(key::of())?;
///         Ok(Ok(Self { prefix }))
///     }
///
///     fn post_process(self) -> Self::Constructed {
///         Arc::new(self)
///     }
/// }
/// ```
///
/// [`injectable`]: crate::injectable
pub trait Component: Managed + Sized {
    /// The successfully constructed object. This can be not only `Self`, but
    /// also some boxed `Self`, such as `Arc<Self>` and `Arc<dyn Trait>`.
    type Constructed: Managed;

    /// The error occurring in object construction after all dependencies
    /// are retrieved.
    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// The dependencies the constructor will request, in declaration order.
    fn dependencies() -> Vec<Dependency>;

    /// The scoping declared on the component itself, used when a binding
    /// doesn't pick one explicitly.
    fn scoping() -> Scoping {
        Scoping::NoScope
    }

    /// Retrieves the dependencies from the injector and creates the object.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency can't be fetched.
    ///
    /// Returns an inner error [`Component::Error`] wrapped in the outer
    /// [`Ok`] if the object construction itself fails.
    fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
    where
        I: TypedInjector + ?Sized;

    /// Converts `self` to [`Component::Constructed`]. Typical usages are
    /// putting `self` into an [`Arc`] and coercing it to an `Arc<dyn Trait>`.
    ///
    /// [`Arc`]: std::sync::Arc
    fn post_process(self) -> Self::Constructed;
}

/// A [`Provider`] which constructs objects through their [`Component`]
/// implementation.
///
/// [`Provider`]: crate::provider::Provider
pub struct ComponentProvider<C>
where
    C: Component,
{
    _marker: PhantomData<fn() -> C>,
}

impl<C> ComponentProvider<C>
where
    C: Component,
{
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C> Default for ComponentProvider<C>
where
    C: Component,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Debug for ComponentProvider<C>
where
    C: Component,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ComponentProvider<C>")
            .finish_non_exhaustive()
    }
}

impl<C> TypedProvider for ComponentProvider<C>
where
    C: Component,
{
    type Output = C::Constructed;

    fn provide<I>(
        &self,
        injector: &I,
        context: &CallContext<'_>,
    ) -> Result<Self::Output, ProvisionError>
    where
        I: TypedInjector + ?Sized,
    {
        let injector = ContextForwardingInjectorProxy::new(injector, context);
        match C::construct(&injector) {
            Ok(Ok(obj)) => Ok(obj.post_process()),
            Ok(Err(err)) => Err(ProvisionError::from(ProvisionErrorKind::ConstructionFailed {
                key: context.key().dyn_clone(),
                source: Arc::from(err.into()),
            })),
            Err(err) => Err(err),
        }
    }
}

impl<C> TypedSharedProvider for ComponentProvider<C> where C: Component<Constructed: SharedManaged> {}
