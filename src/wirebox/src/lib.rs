//! A modular runtime dependency-injection container.
//!
//! Modules declare *bindings* — recipes from a [`key`](crate::key) to a way
//! of producing instances. Building a [`Container`] validates the whole
//! configuration at once, reporting every problem together, and then serves
//! fully constructed objects on demand, honoring singleton and user-defined
//! scopes, converting bound string constants, and detecting dependency
//! cycles.
//!
//! ```rust
//! # use std::error::Error;
//! use wirebox::prelude::*;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! #[injectable]
//! impl Greeter {
//!     #[inject]
//!     fn new(greeting: String) -> Self {
//!         Self { greeting }
//!     }
//! }
//!
//! struct AppModule;
//!
//! impl Module for AppModule {
//!     fn configure(&self, binder: &mut Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
//!         bind::<String>()
//!             .to_instance(String::from("hello"))
//!             .set_on(binder);
//!         bind::<Greeter>().set_on(binder);
//!         Ok(())
//!     }
//! }
//!
//! let container = Container::builder().install(AppModule).build().unwrap();
//! let greeter: Greeter = container.get_instance(key::of()).unwrap();
//! assert_eq!(greeter.greeting, "hello");
//! ```

#![allow(clippy::new_without_default)]

// Lets code generated by `#[injectable]` name this crate by its public path
// even from inside the crate itself.
extern crate self as wirebox;

pub mod container;
pub mod convert;
pub mod element;
pub mod errors;
pub mod inject;
pub mod key;
pub mod module;
pub mod provider;
pub mod scope;
pub mod source;

mod util;

pub use wirebox_derive::injectable;

pub mod prelude {
    pub use crate::container::injector::{Injector, TypedInjector};
    pub use crate::container::{Container, ContainerBuilder, Deferred, ProviderOf, Stage};
    pub use crate::element::Binder;
    pub use crate::errors::{CreationError, ProvisionError};
    pub use crate::inject::{InjectMembers, InjectStatics};
    pub use crate::injectable;
    pub use crate::key;
    pub use crate::module::dsl::{bind, bind_constant};
    pub use crate::module::{Configuration, Module};
    pub use crate::scope::{Scope, ScopeMarker, Scoping};
}
