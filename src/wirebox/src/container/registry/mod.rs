mod binding;
mod binding_map;

pub use binding::{Binding, BindingKind, Factory};
pub(crate) use binding_map::BindingMap;
