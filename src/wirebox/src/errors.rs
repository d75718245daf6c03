//! Error taxonomy of the container.
//!
//! Configuration problems are accumulated into an [`Errors`] collection and
//! reported together as a single [`CreationError`] at a build phase boundary,
//! so one broken module surfaces every problem it causes instead of aborting
//! on the first. Runtime provisioning fails eagerly with a
//! [`ProvisionError`] carrying the chain of keys it was locating.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use snafu::prelude::*;

use crate::key::Key;
use crate::source::Source;

/// One configuration problem, with the sources it was observed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    sources: Vec<Source>,
}

impl Message {
    pub fn new(text: impl Into<String>, source: Source) -> Self {
        Self {
            text: text.into(),
            sources: vec![source],
        }
    }

    pub fn with_sources(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            text: text.into(),
            sources,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    fn sort_key(&self) -> (Option<&Source>, &str) {
        (self.sources.first(), &self.text)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.text)?;
        for source in &self.sources {
            write!(f, "\n  at {source}")?;
        }
        Ok(())
    }
}

/// An ordered collection of configuration problems, filled while the build
/// pipeline runs and drained at a phase boundary.
#[derive(Debug, Default)]
pub(crate) struct Errors {
    messages: Vec<Message>,
    context: Vec<Source>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a source onto the attribution stack; every message added until
    /// the matching [`pop_source`](Self::pop_source) carries it.
    pub fn push_source(&mut self, source: Source) {
        self.context.push(source);
    }

    pub fn pop_source(&mut self) {
        self.context.pop();
    }

    pub fn add(&mut self, text: impl Into<String>, source: Source) {
        let mut sources = vec![source];
        sources.extend(self.context.iter().rev().copied());
        sources.dedup();
        self.messages.push(Message::with_sources(text, sources));
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Fails with every message accumulated so far, sorted by source and
    /// deduplicated, or succeeds if nothing was recorded. The collection is
    /// drained either way, ready for the next phase.
    pub fn checkpoint(&mut self) -> Result<(), CreationError> {
        if self.messages.is_empty() {
            return Ok(());
        }
        let mut messages = std::mem::take(&mut self.messages);
        messages.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        messages.dedup();
        Err(CreationError::Aggregated { messages })
    }

    /// Like [`checkpoint`](Self::checkpoint), consuming the collection.
    pub fn into_result(mut self) -> Result<(), CreationError> {
        self.checkpoint()
    }
}

/// The error thrown when an injector could not be created.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum CreationError {
    #[snafu(display("injector creation failed:\n{}", MessageListDisplayer::new(messages)))]
    #[non_exhaustive]
    Aggregated { messages: Vec<Message> },
}

impl CreationError {
    pub fn messages(&self) -> &[Message] {
        match self {
            Self::Aggregated { messages } => messages,
        }
    }
}

struct MessageListDisplayer<'a> {
    messages: &'a [Message],
}

impl<'a> MessageListDisplayer<'a> {
    fn new(messages: &'a [Message]) -> Self {
        Self { messages }
    }
}

impl Display for MessageListDisplayer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, message) in self.messages.iter().enumerate() {
            writeln!(f, "{:4}) {}", i + 1, message)?;
        }
        Ok(())
    }
}

/// What went wrong while provisioning an object.
#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum ProvisionErrorKind {
    #[snafu(display("no binding is available for {key}"))]
    #[non_exhaustive]
    NotFound { key: Box<dyn Key> },
    #[snafu(display("{key} is already bound in a child injector"))]
    #[non_exhaustive]
    BoundInChild { key: Box<dyn Key> },
    #[snafu(display("a circular dependency was found while constructing {key}"))]
    #[non_exhaustive]
    CyclicDependency { key: Box<dyn Key> },
    #[snafu(display("could not construct {key}"))]
    #[non_exhaustive]
    ConstructionFailed {
        key: Box<dyn Key>,
        source: Arc<dyn StdError + Send + Sync>,
    },
    #[snafu(display("could not inject members of {type_name}"))]
    #[non_exhaustive]
    MembersInjectionFailed {
        type_name: &'static str,
        source: Arc<dyn StdError + Send + Sync>,
    },
    #[snafu(display("could not convert the constant for {key}: {reason}"))]
    #[non_exhaustive]
    Conversion { key: Box<dyn Key>, reason: String },
    #[snafu(display(
        "multiple converters match {key}: {first} and {second}"
    ))]
    #[non_exhaustive]
    AmbiguousConversion {
        key: Box<dyn Key>,
        first: &'static str,
        second: &'static str,
    },
    #[snafu(display(
        "converter {converter} produced a {produced} instead of a value for {key}"
    ))]
    #[non_exhaustive]
    ConversionTypeMismatch {
        key: Box<dyn Key>,
        converter: &'static str,
        produced: &'static str,
    },
    #[snafu(display("no scope is registered for the {scope} marker required by {key}"))]
    #[non_exhaustive]
    NoScopeRegistered {
        key: Box<dyn Key>,
        scope: &'static str,
    },
    #[snafu(display("{key} is not constructed yet; its deferred handle was read inside the cycle it breaks"))]
    #[non_exhaustive]
    NotYetConstructed { key: Box<dyn Key> },
    #[snafu(display("the injector backing this handle is {state}"))]
    #[non_exhaustive]
    InjectorUnavailable { state: &'static str },
    #[snafu(display("{key} is unusable: {reason}"))]
    #[non_exhaustive]
    InvalidBinding { key: Box<dyn Key>, reason: String },
}

/// One step of the path the resolver was walking when an error occurred.
#[derive(Debug, Clone)]
pub struct TrailFrame {
    key: Box<dyn Key>,
    source: Source,
}

impl TrailFrame {
    pub fn key(&self) -> &dyn Key {
        self.key.as_ref()
    }

    pub fn source(&self) -> Source {
        self.source
    }
}

impl PartialEq for TrailFrame {
    fn eq(&self, other: &Self) -> bool {
        self.key.as_ref() == other.key.as_ref() && self.source == other.source
    }
}

/// The error thrown when provisioning fails at runtime.
///
/// Besides the failure itself it carries the chain of keys the resolver was
/// locating, so a deeply nested failure reads as one report instead of a
/// chain of wrapped exceptions.
#[derive(Debug, Clone)]
pub struct ProvisionError {
    kind: ProvisionErrorKind,
    trail: Vec<TrailFrame>,
}

impl ProvisionError {
    pub fn kind(&self) -> &ProvisionErrorKind {
        &self.kind
    }

    pub fn trail(&self) -> &[TrailFrame] {
        &self.trail
    }

    /// Records that the failure surfaced while locating `key`. Consecutive
    /// identical frames collapse into one.
    pub fn while_locating(mut self, key: &dyn Key, source: Source) -> Self {
        let frame = TrailFrame {
            key: key.dyn_clone(),
            source,
        };
        if self.trail.last() != Some(&frame) {
            self.trail.push(frame);
        }
        self
    }

}

impl From<ProvisionErrorKind> for ProvisionError {
    fn from(kind: ProvisionErrorKind) -> Self {
        Self {
            kind,
            trail: Vec::new(),
        }
    }
}

impl Display for ProvisionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.kind)?;
        for frame in &self.trail {
            write!(f, "\n  while locating {} at {}", frame.key, frame.source)?;
        }
        Ok(())
    }
}

impl StdError for ProvisionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.kind.source()
    }
}

#[cfg(test)]
mod tests {
    use crate::key;

    use super::*;

    #[test]
    fn errors_into_result_sorts_and_deduplicates() {
        let mut errors = Errors::new();
        let source = Source::capture();
        errors.add("b comes later", Source::Unknown);
        errors.add("a comes first", source);
        errors.add("a comes first", source);

        let err = errors.into_result().unwrap_err();
        let messages = err.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), "a comes first");
        assert_eq!(messages[1].text(), "b comes later");
    }

    #[test]
    fn errors_attach_the_context_stack() {
        let mut errors = Errors::new();
        let outer = Source::capture();
        errors.push_source(outer);
        errors.add("went wrong", Source::Unknown);
        errors.pop_source();

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.messages()[0].sources(), &[Source::Unknown, outer]);
    }

    #[test]
    fn while_locating_collapses_consecutive_frames() {
        let key = key::of::<i32>();
        let err = ProvisionError::from(ProvisionErrorKind::NotFound {
            key: key.dyn_clone(),
        })
        .while_locating(&key, Source::Unknown)
        .while_locating(&key, Source::Unknown);

        assert_eq!(err.trail().len(), 1);
        assert!(err.to_string().contains("while locating"));
    }
}
