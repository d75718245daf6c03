//! The fluent configuration language used inside modules.
//!
//! A chain starts at [`bind`] or [`bind_constant`], picks a target with one
//! of the `to_*` methods, optionally picks a scope, and finally records
//! itself on the binder:
//!
//! ```rust
//! # use std::error::Error;
//! # use std::sync::Arc;
//! # use wirebox::module::{dsl::bind, dsl::bind_constant, Module};
//! # use wirebox::element::Binder;
//! # struct HttpModule;
//! # impl Module for HttpModule {
//! #     fn configure(&self, binder: &mut Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
//! bind::<Arc<String>>()
//!     .to_instance(Arc::new(String::from("localhost")))
//!     .set_on(binder);
//! bind_constant().named("port").to(8080i32).set_on(binder);
//! #         Ok(())
//! #     }
//! # }
//! ```

mod component_helper;
mod constant_helper;
mod instance_helper;
mod linked_helper;
mod metadata_helper;
mod provider_helper;

use crate::container::Managed;

pub use component_helper::ComponentDsl;
pub use constant_helper::{ConstantDsl, ConstantTargetDsl, ConstantValue};
pub use instance_helper::{InjectedInstanceDsl, InstanceDsl};
pub use linked_helper::{LinkedDsl, ProviderKeyDsl};
pub use metadata_helper::BindingDsl;
pub use provider_helper::{ClosureDsl, ProviderDsl};

/// The scoping state of a chain that has not picked a scope.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Starts a binding chain for the target type `T`.
pub fn bind<T>() -> BindingDsl<T, (), Unscoped>
where
    T: Managed,
{
    BindingDsl::new((), Unscoped)
}

/// Starts a constant binding chain; a qualifier must be picked before the
/// value.
pub fn bind_constant() -> ConstantDsl<()> {
    ConstantDsl::new(())
}
