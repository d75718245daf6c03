//! Post-construction injection of members.
//!
//! Construction through a [`Component`] fills every dependency up front.
//! Objects that exist before the injector does — bound instances or values
//! handed to [`request_injection`] — instead opt into member injection by
//! implementing [`InjectMembers`] over interior-mutable fields. Associated
//! statics are covered separately by [`InjectStatics`] and injected at most
//! once per process, when a module asks for it.
//!
//! [`Component`]: crate::provider::component::Component
//! [`request_injection`]: crate::element::Binder::request_injection

use crate::container::injector::Injector;
use crate::errors::ProvisionError;
use crate::provider::component::Dependency;

/// A type whose instance members can be filled in after construction.
pub trait InjectMembers: Send + Sync + 'static {
    /// Fills the injectable members of `self` from `injector`. Fields are
    /// expected to be interior-mutable slots such as `OnceLock`.
    fn inject_members(&self, injector: &dyn Injector) -> Result<(), ProvisionError>;

    /// The dependencies [`inject_members`](Self::inject_members) will
    /// request, used to check the graph without injecting.
    fn member_dependencies() -> Vec<Dependency>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// A type with injectable associated statics, filled once per process when a
/// module requests it through [`request_static_injection`].
///
/// [`request_static_injection`]: crate::element::Binder::request_static_injection
pub trait InjectStatics: 'static {
    /// Fills the injectable statics of the type. Implementations back the
    /// statics with `OnceLock` so repeated injections leave the first value
    /// in place.
    fn inject_statics(injector: &dyn Injector) -> Result<(), ProvisionError>;

    /// The dependencies [`inject_statics`](Self::inject_statics) will
    /// request.
    fn static_dependencies() -> Vec<Dependency> {
        Vec::new()
    }
}
