//! User-supplied configuration units.

pub mod dsl;

use std::error::Error;

use crate::element::Binder;

/// A unit of configuration: a set of related bindings registered together.
///
/// Modules only record what they want; nothing is constructed until the
/// injector is built and validated.
pub trait Module: 'static {
    /// Runs the configuration and reports any error it returns to the
    /// binder instead of aborting the build.
    fn setup(&self, binder: &mut Binder) {
        if let Err(err) = self.configure(binder) {
            binder.add_error_cause(err);
        }
    }

    fn configure(&self, binder: &mut Binder) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl<F> Module for F
where
    F: Fn(&mut Binder) -> Result<(), Box<dyn Error + Send + Sync>> + 'static,
{
    fn configure(&self, binder: &mut Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
        self(binder)
    }
}

/// A composition of modules, installed as one.
#[derive(Default)]
pub struct Configuration {
    modules: Vec<Box<dyn Module>>,
}

impl Configuration {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with<M: Module>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn compose(mut self, mut other: Configuration) -> Self {
        self.modules.append(&mut other.modules);
        self
    }
}

impl Module for Configuration {
    fn configure(&self, binder: &mut Binder) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.modules
            .iter()
            .for_each(|module| module.setup(binder));
        Ok(())
    }
}
