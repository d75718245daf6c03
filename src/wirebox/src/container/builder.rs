use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::container::core::ContainerCore;
use crate::container::handle::Container;
use crate::container::initializer::{Initializer, PendingTicket};
use crate::container::injector::Injector;
use crate::container::registry::{Binding, BindingMap};
use crate::container::ProviderSlot;
use crate::convert::built_in_converters;
use crate::element::{Binder, Element};
use crate::errors::{CreationError, Errors, ProvisionError};
use crate::key::Key;
use crate::module::Module;
use crate::provider::component::Dependency;
use crate::scope::{Scope, Scoping};
use crate::source::Source;

/// How eagerly the injector prepares itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Build and validate only; nothing is injected or preloaded. Suited
    /// for tools that inspect the configuration.
    Tool,
    /// Construct singletons on first use, except those marked eager.
    Development,
    /// Construct every singleton before the injector is handed out.
    Production,
}

struct StaticRequest {
    type_name: &'static str,
    run: fn(&dyn Injector) -> Result<(), ProvisionError>,
    dependencies: fn() -> Vec<Dependency>,
    source: Source,
}

/// Drives the configure → validate → provision pipeline that turns modules
/// into a ready [`Container`].
pub struct ContainerBuilder {
    stage: Stage,
    modules: Vec<Box<dyn Module>>,
    parent: Option<Arc<ContainerCore>>,
}

impl ContainerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            stage: Stage::Development,
            modules: Vec::new(),
            parent: None,
        }
    }

    pub(crate) fn with_parent(parent: Arc<ContainerCore>) -> Self {
        let mut builder = Self::new();
        builder.parent = Some(parent);
        builder
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn install<M: Module>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Runs every phase of the build. All configuration problems are
    /// reported together in one error; nothing is constructed unless the
    /// whole configuration is valid.
    pub fn build(self) -> Result<Container, CreationError> {
        let mut errors = Errors::new();

        let mut binder = Binder::new();
        for module in &self.modules {
            module.setup(&mut binder);
        }
        let elements = binder.into_elements();
        debug!(elements = elements.len(), "configuration recorded");

        for element in &elements {
            if let Element::Message(message) = element {
                errors.add_message(message.clone());
            }
        }

        let mut scopes: HashMap<TypeId, Arc<dyn Scope>> = HashMap::new();
        for element in &elements {
            if let Element::BindScope {
                marker,
                marker_name,
                scope,
                source,
            } = element
            {
                if scopes.insert(*marker, Arc::clone(scope)).is_some() {
                    errors.add(
                        format!("a scope is already bound for the {marker_name} marker"),
                        *source,
                    );
                }
            }
        }

        let mut converters = built_in_converters();
        for element in &elements {
            if let Element::Convert { converter, .. } = element {
                converters.push(converter.clone());
            }
        }

        let mut bindings = BindingMap::new();
        let mut tickets: Vec<Arc<PendingTicket>> = Vec::new();
        for element in &elements {
            let Element::Bind(element) = element else {
                continue;
            };
            let key = element.key.as_ref();

            if let Some(name) = forbidden_target(key) {
                errors.add(
                    format!("binding to the container's own {name} type is not allowed"),
                    element.source,
                );
                continue;
            }
            if let Some(target) = &element.link_target {
                if target.as_ref() == key {
                    errors.add(format!("{key} is bound to itself"), element.source);
                    continue;
                }
            }
            if let Some(existing) = bindings.get(key) {
                errors.add(
                    format!(
                        "a binding to {key} was already configured at {}",
                        existing.source()
                    ),
                    element.source,
                );
                continue;
            }
            if let Some(parent) = &self.parent {
                if let Some((existing, _)) = parent.lookup_explicit_chain(key) {
                    errors.add(
                        format!(
                            "a binding to {key} was already configured in a parent injector at {}",
                            existing.source()
                        ),
                        element.source,
                    );
                    continue;
                }
            }

            let mut record = Binding::new(
                element.key.clone(),
                element.source,
                element.scoping,
                element.kind,
                element.factory.clone(),
                element.dependencies.clone(),
            );
            if let Some(target) = &element.link_target {
                record = record.with_link_target(target.clone());
            }
            bindings.insert(Arc::new(record));

            if let Some(ticket) = &element.ticket {
                tickets.push(Arc::clone(ticket));
            }
        }

        let mut statics: Vec<StaticRequest> = Vec::new();
        for element in &elements {
            if let Element::RequestStaticInjection {
                type_name,
                run,
                dependencies,
                source,
            } = element
            {
                statics.push(StaticRequest {
                    type_name: *type_name,
                    run: *run,
                    dependencies: *dependencies,
                    source: *source,
                });
            }
        }

        for element in &elements {
            if let Element::RequestInjection { ticket, .. } = element {
                tickets.push(Arc::clone(ticket));
            }
        }

        let mut provider_requests: Vec<(Box<dyn Key>, Arc<ProviderSlot>, Source)> = Vec::new();
        for element in &elements {
            if let Element::ProviderRequest { key, slot, source } = element {
                provider_requests.push((key.clone(), Arc::clone(slot), *source));
            }
        }

        let stage = self.stage;
        let parent = self.parent;
        let core = Arc::new_cyclic(|weak| {
            ContainerCore::new_cyclic(weak, parent, stage, bindings, scopes, converters)
        });

        if let Some(parent) = core.parent() {
            for binding in core.explicit_bindings() {
                parent.blacklist_key(binding.key());
            }
        }

        debug!("initializing bindings");
        for binding in core.explicit_bindings() {
            if let Err(reason) = binding.initialize(&|marker| core.lookup_scope(marker)) {
                errors.add(reason, binding.source());
            }
        }

        for (key, _, source) in &provider_requests {
            if let Err(err) = core.resolve(key.as_ref()) {
                errors.add(err.to_string(), *source);
            }
        }

        debug!("validating the dependency graph");
        // The visited set is per dependent: it only short-circuits diamonds
        // and cycles within one subgraph, so every binding with an
        // unresolvable dependency reports it under its own source.
        for binding in core.explicit_bindings() {
            let mut visited: HashSet<Box<dyn Key>> = HashSet::new();
            validate_dependencies(
                &core,
                binding.dependencies(),
                binding.source(),
                &mut errors,
                &mut visited,
            );
        }
        for request in &statics {
            let mut visited: HashSet<Box<dyn Key>> = HashSet::new();
            validate_dependencies(
                &core,
                &(request.dependencies)(),
                request.source,
                &mut errors,
                &mut visited,
            );
        }
        for ticket in &tickets {
            let mut visited: HashSet<Box<dyn Key>> = HashSet::new();
            validate_dependencies(
                &core,
                &ticket.dependencies(),
                ticket.source(),
                &mut errors,
                &mut visited,
            );
        }

        errors.checkpoint()?;

        for (_, slot, _) in &provider_requests {
            slot.fill(Arc::downgrade(&core));
        }

        let container = Container::from_core(Arc::clone(&core));
        if stage == Stage::Tool {
            return Ok(container);
        }

        debug!("running static and instance injections");
        for request in &statics {
            if let Err(err) = (request.run)(core.as_ref()) {
                errors.add(
                    format!("static injection of {} failed: {err}", request.type_name),
                    request.source,
                );
            }
        }
        let initializer = Initializer::new(tickets);
        for (err, source) in initializer.inject_all(core.as_ref()) {
            errors.add(err.to_string(), source);
        }
        errors.checkpoint()?;

        debug!("preloading singletons");
        for binding in core.explicit_bindings() {
            let preload = match binding.scoping() {
                Scoping::EagerSingleton => true,
                Scoping::Singleton => stage == Stage::Production,
                _ => false,
            };
            if preload {
                if let Err(err) = core.dyn_get(binding.key()) {
                    errors.add(err.to_string(), binding.source());
                }
            }
        }
        errors.checkpoint()?;

        debug!(?stage, "injector created");
        Ok(container)
    }
}

fn forbidden_target(key: &dyn Key) -> Option<&'static str> {
    let target = key.target_type();
    if target == TypeId::of::<Container>() {
        Some("Container")
    } else if target == TypeId::of::<Stage>() {
        Some("Stage")
    } else if target == TypeId::of::<Box<dyn Key>>() {
        Some("Key")
    } else if target == TypeId::of::<Arc<dyn Scope>>() {
        Some("Scope")
    } else {
        None
    }
}

fn validate_dependencies(
    core: &Arc<ContainerCore>,
    dependencies: &[Dependency],
    source: Source,
    errors: &mut Errors,
    visited: &mut HashSet<Box<dyn Key>>,
) {
    for dependency in dependencies {
        let key = dependency.key();
        if !visited.insert(key.dyn_clone()) {
            continue;
        }
        match core.resolve(key) {
            Ok((binding, _)) => validate_dependencies(
                core,
                binding.dependencies(),
                binding.source(),
                errors,
                visited,
            ),
            Err(_) if dependency.is_optional() => {}
            Err(err) => errors.add(err.to_string(), source),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::error::Error;
    use std::sync::Arc;

    use crate::container::injector::TypedInjector;
    use crate::element::Binder;
    use crate::errors::ProvisionError;
    use crate::key;
    use crate::module::dsl::{bind, bind_constant};
    use crate::module::Module;
    use crate::provider::component::{Component, Dependency};
    use crate::scope::{CachingScope, ScopeMarker};

    use super::*;

    struct Server {
        port: i32,
    }

    impl Component for Server {
        type Constructed = Self;

        type Error = Infallible;

        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on(key::named::<i32>("port"))]
        }

        fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
        where
            I: TypedInjector + ?Sized,
        {
            Ok(Ok(Self {
                port: injector.get(key::named("port"))?,
            }))
        }

        fn post_process(self) -> Self::Constructed {
            self
        }
    }

    struct ServerModule;

    impl Module for ServerModule {
        fn configure(
            &self,
            binder: &mut Binder,
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            bind::<Server>().set_on(binder);
            Ok(())
        }
    }

    #[test]
    fn build_converts_string_constants_for_typed_requests() {
        let container = Container::builder()
            .install(ServerModule)
            .install(|binder: &mut Binder| {
                bind_constant().named("port").to("8080").set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let server: Server = container.get_instance(key::of()).unwrap();
        assert_eq!(server.port, 8080);
    }

    #[test]
    fn build_fails_when_a_constant_cannot_be_converted() {
        let err = Container::builder()
            .install(ServerModule)
            .install(|binder: &mut Binder| {
                bind_constant().named("port").to("eighty").set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("could not convert"));
    }

    #[test]
    fn build_fails_when_a_dependency_has_no_binding() {
        let err = Container::builder()
            .install(ServerModule)
            .build()
            .unwrap_err();

        assert_eq!(err.messages().len(), 1);
        assert!(err.to_string().contains("no binding is available"));
    }

    #[test]
    fn build_reports_every_dependent_of_a_missing_binding() {
        struct FirstDependent;

        impl Component for FirstDependent {
            type Constructed = Self;

            type Error = Infallible;

            fn dependencies() -> Vec<Dependency> {
                vec![Dependency::on(key::of::<Arc<String>>())]
            }

            fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
            where
                I: TypedInjector + ?Sized,
            {
                let _: Arc<String> = injector.get(key::of())?;
                Ok(Ok(Self))
            }

            fn post_process(self) -> Self::Constructed {
                self
            }
        }

        struct SecondDependent;

        impl Component for SecondDependent {
            type Constructed = Self;

            type Error = Infallible;

            fn dependencies() -> Vec<Dependency> {
                vec![Dependency::on(key::of::<Arc<String>>())]
            }

            fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
            where
                I: TypedInjector + ?Sized,
            {
                let _: Arc<String> = injector.get(key::of())?;
                Ok(Ok(Self))
            }

            fn post_process(self) -> Self::Constructed {
                self
            }
        }

        let err = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<FirstDependent>().set_on(binder);
                bind::<SecondDependent>().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        // One message per dependent, each attributed to its own binding.
        let messages = err.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages
            .iter()
            .all(|message| message.text().contains("no binding is available")));
        assert_ne!(messages[0].sources(), messages[1].sources());
    }

    #[test]
    fn build_reports_a_duplicate_binding_once_with_the_first_source() {
        let err = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<i32>().to_instance(1).set_on(binder);
                bind::<i32>().to_instance(2).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        let messages = err.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text().contains("already configured"));
        assert!(messages[0].text().contains("builder.rs"));
    }

    #[test]
    fn build_aggregates_every_configuration_problem() {
        let err = Container::builder()
            .install(|binder: &mut Binder| {
                binder.add_error("first problem");
                binder.add_error("second problem");
                bind::<i32>().to_instance(1).set_on(binder);
                bind::<i32>().to_instance(2).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        assert_eq!(err.messages().len(), 3);
    }

    #[test]
    fn build_reports_module_configuration_failures() {
        let err = Container::builder()
            .install(|_: &mut Binder| Err("broken module".into()))
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("broken module"));
    }

    #[test]
    fn build_rejects_a_key_bound_to_itself() {
        let err = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<i32>()
                    .named("x")
                    .to_key(key::named::<i32>("x"))
                    .set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("bound to itself"));
    }

    #[test]
    fn build_rejects_bindings_to_container_types() {
        let err = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<Stage>().to_instance(Stage::Development).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("is not allowed"));
    }

    #[test]
    fn build_fails_when_a_named_scope_is_not_registered() {
        struct Missing;
        impl ScopeMarker for Missing {}

        let err = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<Arc<i32>>()
                    .in_scope::<Missing>()
                    .to_instance(Arc::new(1))
                    .set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("no scope is bound"));
    }

    #[test]
    fn build_rejects_a_scope_marker_registered_twice() {
        struct Request;
        impl ScopeMarker for Request {}

        let err = Container::builder()
            .install(|binder: &mut Binder| {
                binder.bind_scope::<Request>(CachingScope::new());
                binder.bind_scope::<Request>(CachingScope::new());
                Ok(())
            })
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("already bound"));
    }

    #[test]
    fn build_resolves_provider_requests_eagerly() {
        let err = Container::builder()
            .install(|binder: &mut Binder| {
                let _ = binder.get_provider(key::of::<i32>());
                Ok(())
            })
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("no binding is available"));
    }

    #[test]
    fn build_skips_missing_optional_dependencies() {
        struct Tolerant {
            fallback: Option<Arc<String>>,
        }

        impl Component for Tolerant {
            type Constructed = Self;

            type Error = Infallible;

            fn dependencies() -> Vec<Dependency> {
                vec![Dependency::optional(key::of::<Arc<String>>())]
            }

            fn construct<I>(injector: &I) -> Result<Result<Self, Self::Error>, ProvisionError>
            where
                I: TypedInjector + ?Sized,
            {
                Ok(Ok(Self {
                    fallback: injector.get_optional(key::of())?,
                }))
            }

            fn post_process(self) -> Self::Constructed {
                self
            }
        }

        let container = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<Tolerant>().set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let tolerant: Tolerant = container.get_instance(key::of()).unwrap();
        assert!(tolerant.fallback.is_none());
    }

    #[test]
    fn build_fails_when_a_child_rebinds_a_parent_key() {
        let parent = Container::builder()
            .install(|binder: &mut Binder| {
                bind::<i32>().to_instance(1).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap();

        let err = parent
            .child_builder()
            .install(|binder: &mut Binder| {
                bind::<i32>().to_instance(2).set_on(binder);
                Ok(())
            })
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("parent injector"));
    }
}
