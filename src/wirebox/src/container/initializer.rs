use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::container::injector::{CallContext, Injector, TypedInjector};
use crate::container::Managed;
use crate::errors::ProvisionError;
use crate::inject::InjectMembers;
use crate::provider::component::Dependency;
use crate::provider::{TypedProvider, TypedSharedProvider};
use crate::source::Source;

enum TicketStatus {
    Outstanding,
    Injecting,
    Injected,
    Failed(ProvisionError),
}

/// One object waiting for member injection at the end of the build.
///
/// `ensure` is reentrant on the thread that runs the build: a provider
/// handing out the object mid-build injects it inline, and a request made
/// from inside the object's own injection returns immediately. Any other
/// thread blocks until the injection has finished, so no thread can observe
/// a partially injected object.
pub struct PendingTicket {
    instance: Arc<dyn InjectMembers>,
    type_name: &'static str,
    dependencies: fn() -> Vec<Dependency>,
    source: Source,
    registered_on: ThreadId,
    status: Mutex<TicketStatus>,
    done: Condvar,
}

impl PendingTicket {
    pub(crate) fn new<T>(instance: Arc<T>, source: Source) -> Arc<Self>
    where
        T: InjectMembers,
    {
        Arc::new(Self {
            instance,
            type_name: std::any::type_name::<T>(),
            dependencies: T::member_dependencies,
            source,
            registered_on: thread::current().id(),
            status: Mutex::new(TicketStatus::Outstanding),
            done: Condvar::new(),
        })
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn dependencies(&self) -> Vec<Dependency> {
        (self.dependencies)()
    }

    pub(crate) fn source(&self) -> Source {
        self.source
    }

    /// Makes sure the instance has had its members injected, injecting
    /// inline on the registering thread and waiting on any other.
    pub(crate) fn ensure(&self, injector: &dyn Injector) -> Result<(), ProvisionError> {
        let mut status = self.status.lock();
        loop {
            match &*status {
                TicketStatus::Injected => return Ok(()),
                TicketStatus::Failed(err) => return Err(err.clone()),
                TicketStatus::Injecting => {
                    if thread::current().id() == self.registered_on {
                        // Reentry from the instance's own injection.
                        return Ok(());
                    }
                    self.done.wait(&mut status);
                }
                TicketStatus::Outstanding => {
                    if thread::current().id() != self.registered_on {
                        self.done.wait(&mut status);
                        continue;
                    }
                    *status = TicketStatus::Injecting;
                    drop(status);
                    let result = self.instance.inject_members(injector);
                    status = self.status.lock();
                    let outcome = match result {
                        Ok(()) => {
                            *status = TicketStatus::Injected;
                            Ok(())
                        }
                        Err(err) => {
                            *status = TicketStatus::Failed(err.clone());
                            Err(err)
                        }
                    };
                    self.done.notify_all();
                    return outcome;
                }
            }
        }
    }
}

impl Debug for PendingTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PendingTicket")
            .field("type_name", &self.type_name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// The set of objects modules asked to have injected once the injector is
/// built.
#[derive(Debug, Default)]
pub(crate) struct Initializer {
    tickets: Vec<Arc<PendingTicket>>,
}

impl Initializer {
    pub fn new(tickets: Vec<Arc<PendingTicket>>) -> Self {
        Self { tickets }
    }

    pub fn tickets(&self) -> &[Arc<PendingTicket>] {
        &self.tickets
    }

    /// Injects every outstanding instance, reporting each failure with the
    /// source of the registration that requested it.
    pub fn inject_all(&self, injector: &dyn Injector) -> Vec<(ProvisionError, Source)> {
        let mut failures = Vec::new();
        for ticket in &self.tickets {
            if let Err(err) = ticket.ensure(injector) {
                failures.push((err, ticket.source()));
            }
        }
        failures
    }
}

/// A [`Provider`] for an instance binding whose value still awaits member
/// injection; every request first makes sure the injection has happened.
///
/// [`Provider`]: crate::provider::Provider
pub struct PendingInstanceProvider<T>
where
    T: InjectMembers,
{
    value: Arc<T>,
    ticket: Arc<PendingTicket>,
}

impl<T> PendingInstanceProvider<T>
where
    T: InjectMembers,
{
    pub(crate) fn new(value: Arc<T>, ticket: Arc<PendingTicket>) -> Self {
        Self { value, ticket }
    }
}

impl<T> Debug for PendingInstanceProvider<T>
where
    T: InjectMembers,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PendingInstanceProvider<T>")
            .finish_non_exhaustive()
    }
}

impl<T> TypedProvider for PendingInstanceProvider<T>
where
    T: InjectMembers + Managed,
{
    type Output = Arc<T>;

    fn provide<I>(
        &self,
        injector: &I,
        _context: &CallContext<'_>,
    ) -> Result<Self::Output, ProvisionError>
    where
        I: TypedInjector + ?Sized,
    {
        self.ticket.ensure(injector.upcast_dyn())?;
        Ok(Arc::clone(&self.value))
    }
}

impl<T> TypedSharedProvider for PendingInstanceProvider<T> where T: InjectMembers + Managed {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    use crate::container::injector::MockInjector;

    use super::*;

    #[derive(Default)]
    struct Target {
        filled: OnceLock<i32>,
        injections: AtomicUsize,
    }

    impl InjectMembers for Target {
        fn inject_members(&self, _injector: &dyn Injector) -> Result<(), ProvisionError> {
            self.injections.fetch_add(1, Ordering::SeqCst);
            let _ = self.filled.set(42);
            Ok(())
        }
    }

    #[test]
    fn ensure_injects_exactly_once_on_the_registering_thread() {
        let target = Arc::new(Target::default());
        let ticket = PendingTicket::new(Arc::clone(&target), Source::Unknown);
        let injector = MockInjector::new();

        ticket.ensure(&injector).unwrap();
        ticket.ensure(&injector).unwrap();

        assert_eq!(target.injections.load(Ordering::SeqCst), 1);
        assert_eq!(target.filled.get(), Some(&42));
    }

    #[test]
    fn inject_all_reports_failures_with_their_sources() {
        struct Failing;

        impl InjectMembers for Failing {
            fn inject_members(&self, _injector: &dyn Injector) -> Result<(), ProvisionError> {
                Err(crate::errors::ProvisionErrorKind::InjectorUnavailable {
                    state: "gone",
                }
                .into())
            }
        }

        let ticket = PendingTicket::new(Arc::new(Failing), Source::Unknown);
        let initializer = Initializer::new(vec![ticket]);
        let injector = MockInjector::new();

        let failures = initializer.inject_all(&injector);
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn pending_instance_provider_injects_before_serving() {
        let target = Arc::new(Target::default());
        let ticket = PendingTicket::new(Arc::clone(&target), Source::Unknown);
        let provider = PendingInstanceProvider::new(Arc::clone(&target), ticket);
        let injector = MockInjector::new();

        let key = crate::key::of::<Arc<Target>>();
        let served = provider
            .provide(&injector, &CallContext::new(&key))
            .unwrap();
        assert!(Arc::ptr_eq(&served, &target));
        assert_eq!(target.filled.get(), Some(&42));
    }
}
