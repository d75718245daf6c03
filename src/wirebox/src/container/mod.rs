pub mod injector;
pub mod registry;

mod builder;
mod core;
mod handle;
pub(crate) mod initializer;

use std::sync::Arc;

use crate::util::any::AsAny;

pub use builder::{ContainerBuilder, Stage};
pub use handle::{Container, Deferred, ProviderOf, ProviderSlot, UntypedProviderHandle};
pub use initializer::PendingTicket;

/// A value the container can construct, store and hand out.
pub trait Managed: AsAny + Send + Sync + 'static {}

impl<T> Managed for T where T: AsAny + Send + Sync + 'static {}

impl std::fmt::Debug for dyn Managed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.type_name()).finish_non_exhaustive()
    }
}

/// A [`Managed`] value with shared ownership, so the container can keep one
/// copy in a scope cache and hand out further handles to it.
pub trait SharedManaged: Managed {
    fn dyn_clone(&self) -> Box<dyn SharedManaged>;

    fn upcast_managed(self: Box<Self>) -> Box<dyn Managed>;
}

impl<T> SharedManaged for Arc<T>
where
    T: Send + Sync + ?Sized + 'static,
{
    fn dyn_clone(&self) -> Box<dyn SharedManaged> {
        Box::new(Arc::clone(self))
    }

    fn upcast_managed(self: Box<Self>) -> Box<dyn Managed> {
        self
    }
}
