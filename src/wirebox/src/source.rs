//! Attribution of configuration calls to their call sites.

use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::panic::Location;

/// An opaque token identifying where a configuration action originated.
///
/// Binder methods capture the caller's location, so error reports point at
/// the offending line of the user's module rather than at container
/// internals. Synthetic bindings created by the container itself carry
/// [`Source::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    CallSite(&'static Location<'static>),
    Unknown,
}

impl Source {
    /// Captures the location of the caller. Must be invoked from a
    /// `#[track_caller]` chain so frames internal to the container are
    /// skipped.
    #[track_caller]
    pub fn capture() -> Self {
        Self::CallSite(Location::caller())
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::CallSite(location) => write!(f, "{location}"),
            Self::Unknown => write!(f, "an unknown source"),
        }
    }
}

impl PartialOrd for Source {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Source {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::CallSite(a), Self::CallSite(b)) => (a.file(), a.line(), a.column())
                .cmp(&(b.file(), b.line(), b.column())),
            (Self::CallSite(_), Self::Unknown) => Ordering::Less,
            (Self::Unknown, Self::CallSite(_)) => Ordering::Greater,
            (Self::Unknown, Self::Unknown) => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_records_the_caller() {
        let source = Source::capture();
        let Source::CallSite(location) = source else {
            panic!("capture should produce a call site");
        };
        assert!(location.file().ends_with("source.rs"));
    }

    #[test]
    fn ordering_puts_unknown_sources_last() {
        let captured = Source::capture();
        assert!(captured < Source::Unknown);
    }
}
