use std::sync::Arc;

use crate::container::initializer::PendingTicket;
use crate::container::{ProviderOf, ProviderSlot};
use crate::convert::TypeConverter;
use crate::element::Element;
use crate::errors::Message;
use crate::inject::{InjectMembers, InjectStatics};
use crate::key::{Key, TypedKey};
use crate::module::Module;
use crate::scope::{Scope, ScopeMarker};
use crate::source::Source;

/// Records the configuration actions of modules as an element stream.
///
/// Every method captures its caller's location, so problems found later by
/// the build pipeline point back at the module line that caused them.
#[derive(Debug, Default)]
pub struct Binder {
    elements: Vec<Element>,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Runs another module against this binder, splicing its elements into
    /// the stream.
    pub fn install(&mut self, module: &dyn Module) {
        module.setup(self);
    }

    /// Reports a configuration problem. The build will list it and fail.
    #[track_caller]
    pub fn add_error(&mut self, text: impl Into<String>) {
        let message = Message::new(text, Source::capture());
        self.elements.push(Element::Message(message));
    }

    /// Reports an error value caught during configuration.
    #[track_caller]
    pub fn add_error_cause(&mut self, err: Box<dyn std::error::Error + Send + Sync>) {
        let message = Message::new(
            format!("an error was caught during configuration: {err}"),
            Source::capture(),
        );
        self.elements.push(Element::Message(message));
    }

    /// Registers `scope` under the marker type `M`, making
    /// [`Scoping::named::<M>()`] usable in bindings.
    ///
    /// [`Scoping::named::<M>()`]: crate::scope::Scoping::named
    #[track_caller]
    pub fn bind_scope<M: ScopeMarker>(&mut self, scope: impl Scope) {
        self.elements.push(Element::BindScope {
            marker: std::any::TypeId::of::<M>(),
            marker_name: std::any::type_name::<M>(),
            scope: Arc::new(scope),
            source: Source::capture(),
        });
    }

    /// Appends `converter` to the registry consulted when a string constant
    /// must satisfy a request for another type.
    #[track_caller]
    pub fn convert_to_values(&mut self, converter: TypeConverter) {
        let source = Source::capture();
        self.elements.push(Element::Convert {
            converter: converter.with_source(source),
            source,
        });
    }

    /// Asks the injector to member-inject `instance` once it is built.
    #[track_caller]
    pub fn request_injection<T>(&mut self, instance: Arc<T>)
    where
        T: InjectMembers,
    {
        let source = Source::capture();
        self.elements.push(Element::RequestInjection {
            ticket: PendingTicket::new(instance, source),
            source,
        });
    }

    /// Asks the injector to fill the injectable statics of `T` once it is
    /// built.
    #[track_caller]
    pub fn request_static_injection<T>(&mut self)
    where
        T: InjectStatics,
    {
        self.elements.push(Element::RequestStaticInjection {
            type_name: std::any::type_name::<T>(),
            run: T::inject_statics,
            dependencies: T::static_dependencies,
            source: Source::capture(),
        });
    }

    /// Returns a handle for `key` that becomes usable once the injector is
    /// built. The build fails if `key` cannot be resolved.
    #[track_caller]
    pub fn get_provider<K>(&mut self, key: K) -> ProviderOf<K::Target>
    where
        K: TypedKey,
    {
        let slot = Arc::new(ProviderSlot::empty());
        self.elements.push(Element::ProviderRequest {
            key: key.dyn_clone(),
            slot: Arc::clone(&slot),
            source: Source::capture(),
        });
        ProviderOf::deferred_handle(key.dyn_clone(), slot)
    }

    /// The elements recorded so far, in order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub(crate) fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub(crate) fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}
