//! Conversion of bound string constants into typed values.
//!
//! When a request asks for a non-string type and the only matching binding
//! is a string constant under the same qualifier, the resolver runs the
//! constant through the converter registry and serves the converted value.
//! Converters for the primitive numeric types, `bool` and `char` are always
//! registered; further ones are appended per module with
//! [`Binder::convert_to_values`].
//!
//! [`Binder::convert_to_values`]: crate::element::Binder::convert_to_values

use std::any::{self, TypeId};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use crate::container::Managed;
use crate::key::Key;
use crate::source::Source;

type MatchFn = dyn Fn(&dyn Key) -> bool + Send + Sync;
type ConvertFn = dyn Fn(&str) -> Result<Box<dyn Managed>, String> + Send + Sync;

/// A pair of a key matcher and a string-to-value function.
#[derive(Clone)]
pub struct TypeConverter {
    name: &'static str,
    matcher: Arc<MatchFn>,
    convert: Arc<ConvertFn>,
    source: Source,
}

impl TypeConverter {
    pub fn new(
        name: &'static str,
        matcher: impl Fn(&dyn Key) -> bool + Send + Sync + 'static,
        convert: impl Fn(&str) -> Result<Box<dyn Managed>, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            matcher: Arc::new(matcher),
            convert: Arc::new(convert),
            source: Source::Unknown,
        }
    }

    /// A converter for every key targeting `T`, parsing via [`FromStr`].
    pub fn for_type<T>() -> Self
    where
        T: Managed + FromStr,
        T::Err: Display,
    {
        Self::new(
            any::type_name::<T>(),
            |key| key.target_type() == TypeId::of::<T>(),
            |text| {
                text.parse::<T>()
                    .map(|value| -> Box<dyn Managed> { Box::new(value) })
                    .map_err(|err| err.to_string())
            },
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub(crate) fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn matches(&self, key: &dyn Key) -> bool {
        (self.matcher)(key)
    }

    pub fn convert(&self, text: &str) -> Result<Box<dyn Managed>, String> {
        (self.convert)(text)
    }
}

impl Debug for TypeConverter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TypeConverter")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// The converters every injector starts with.
pub(crate) fn built_in_converters() -> Vec<TypeConverter> {
    vec![
        TypeConverter::for_type::<i8>(),
        TypeConverter::for_type::<i16>(),
        TypeConverter::for_type::<i32>(),
        TypeConverter::for_type::<i64>(),
        TypeConverter::for_type::<i128>(),
        TypeConverter::for_type::<isize>(),
        TypeConverter::for_type::<u8>(),
        TypeConverter::for_type::<u16>(),
        TypeConverter::for_type::<u32>(),
        TypeConverter::for_type::<u64>(),
        TypeConverter::for_type::<u128>(),
        TypeConverter::for_type::<usize>(),
        TypeConverter::for_type::<f32>(),
        TypeConverter::for_type::<f64>(),
        TypeConverter::for_type::<bool>(),
        TypeConverter::for_type::<char>(),
    ]
}

#[cfg(test)]
mod tests {
    use crate::key;
    use crate::util::any::DowncastRef;

    use super::*;

    #[test]
    fn for_type_converter_matches_only_its_target() {
        let converter = TypeConverter::for_type::<i32>();
        assert!(converter.matches(&key::of::<i32>()));
        assert!(converter.matches(&key::named::<i32>("port")));
        assert!(!converter.matches(&key::of::<i64>()));
    }

    #[test]
    fn for_type_converter_parses_values() {
        let converter = TypeConverter::for_type::<i32>();
        let value = converter.convert("8080").unwrap();
        assert_eq!(value.as_ref().downcast_ref::<i32>(), Some(&8080));

        let err = converter.convert("eighty").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn char_converter_requires_a_single_character() {
        let converter = TypeConverter::for_type::<char>();
        assert!(converter.convert("x").is_ok());
        assert!(converter.convert("xy").is_err());
        assert!(converter.convert("").is_err());
    }

    #[test]
    fn built_in_converters_cover_bool() {
        let converters = built_in_converters();
        let matching: Vec<_> = converters
            .iter()
            .filter(|c| c.matches(&key::of::<bool>()))
            .collect();
        assert_eq!(matching.len(), 1);
        let value = matching[0].convert("true").unwrap();
        assert_eq!(value.as_ref().downcast_ref::<bool>(), Some(&true));
    }
}
