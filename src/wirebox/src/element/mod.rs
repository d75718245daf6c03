//! The record of configuration actions performed by modules.
//!
//! Every call a module makes against a [`Binder`] appends one [`Element`],
//! together with the call site it came from. The build pipeline drains the
//! elements in order, one kind at a time, and turns them into the injector's
//! bindings, scopes, converters and injection requests.

mod binder;

use std::any::TypeId;
use std::sync::Arc;

use crate::container::injector::Injector;
use crate::container::initializer::PendingTicket;
use crate::container::registry::{BindingKind, Factory};
use crate::container::ProviderSlot;
use crate::convert::TypeConverter;
use crate::errors::{Message, ProvisionError};
use crate::key::Key;
use crate::provider::component::Dependency;
use crate::scope::{Scope, Scoping};
use crate::source::Source;

pub use binder::Binder;

/// One recorded configuration action.
#[derive(Debug)]
pub enum Element {
    /// A user-reported configuration problem.
    Message(Message),
    /// Registration of a scope under its marker type.
    BindScope {
        marker: TypeId,
        marker_name: &'static str,
        scope: Arc<dyn Scope>,
        source: Source,
    },
    /// Registration of an additional type converter.
    Convert {
        converter: TypeConverter,
        source: Source,
    },
    /// An explicit binding.
    Bind(BindingElement),
    /// A request to member-inject an existing object after the build.
    RequestInjection {
        ticket: Arc<PendingTicket>,
        source: Source,
    },
    /// A request to inject the statics of a type at the end of the build.
    RequestStaticInjection {
        type_name: &'static str,
        run: fn(&dyn Injector) -> Result<(), ProvisionError>,
        dependencies: fn() -> Vec<Dependency>,
        source: Source,
    },
    /// A provider handle requested during configuration, to be connected to
    /// the injector once it exists.
    ProviderRequest {
        key: Box<dyn Key>,
        slot: Arc<ProviderSlot>,
        source: Source,
    },
}

/// The payload of an explicit binding element.
#[derive(Debug)]
pub struct BindingElement {
    pub key: Box<dyn Key>,
    pub source: Source,
    pub scoping: Scoping,
    pub kind: BindingKind,
    pub factory: Factory,
    pub dependencies: Vec<Dependency>,
    /// The aliased key of a linked binding, checked against self-reference.
    pub link_target: Option<Box<dyn Key>>,
    /// The pending member injection of an instance binding, if any.
    pub ticket: Option<Arc<PendingTicket>>,
}
