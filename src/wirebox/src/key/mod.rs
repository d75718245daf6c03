//! Identity of injectable slots.
//!
//! A key is a pair of a target type and a qualifier. The target type decides
//! what kind of object a request produces, and the qualifier tells apart
//! multiple recipes for the same target type. Keys are compared structurally,
//! so `named::<i32>("a")` and `named::<i32>("b")` address different slots.

mod implementation;

use std::any::TypeId;
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};

use crate::container::Managed;
use crate::util::any::AsAny;
use crate::util::hash::DynHash;

pub(crate) use crate::key::implementation::KeyImpl;

/// An object-safe identity of an injectable slot, usable as a map key after
/// boxing.
pub trait Key
where
    Self: Debug + Display + AsAny + DynHash + Send + Sync + 'static,
{
    /// Returns the [`TypeId`] of the target type.
    fn target_type(&self) -> TypeId;

    /// Returns the name of the target type.
    fn target_name(&self) -> &'static str;

    /// Returns the [`TypeId`] of the qualifier's type.
    fn qualifier_type(&self) -> TypeId;

    /// Returns a type-erased view of the qualifier.
    fn dyn_qualifier(&self) -> &dyn Qualifier;

    /// Returns the same key with its qualifier stripped.
    fn without_qualifier(&self) -> Box<dyn Key>;

    /// Returns a key addressing a [`String`] slot under the same qualifier.
    /// Lookups of convertible constants go through this key.
    fn with_string_target(&self) -> Box<dyn Key>;

    fn dyn_clone(&self) -> Box<dyn Key>;
}

impl dyn Key {
    /// Whether the key carries a qualifier other than the unit default.
    pub fn is_qualified(&self) -> bool {
        self.qualifier_type() != TypeId::of::<()>()
    }
}

impl PartialEq for dyn Key {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_any())
    }
}

impl Eq for dyn Key {}

impl Hash for dyn Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dyn_hash(state);
    }
}

impl Clone for Box<dyn Key> {
    fn clone(&self) -> Self {
        self.as_ref().dyn_clone()
    }
}

impl<T: TypedKey> Key for T {
    fn target_type(&self) -> TypeId {
        TypeId::of::<T::Target>()
    }

    fn target_name(&self) -> &'static str {
        std::any::type_name::<T::Target>()
    }

    fn qualifier_type(&self) -> TypeId {
        TypeId::of::<T::Qualifier>()
    }

    fn dyn_qualifier(&self) -> &dyn Qualifier {
        self.qualifier_ref()
    }

    fn without_qualifier(&self) -> Box<dyn Key> {
        Box::new(KeyImpl::<T::Target, ()>::new(()))
    }

    fn with_string_target(&self) -> Box<dyn Key> {
        Box::new(KeyImpl::<String, T::Qualifier>::new(self.qualifier()))
    }

    fn dyn_clone(&self) -> Box<dyn Key> {
        Box::new(*self)
    }
}

/// A type-erased qualifier, comparable and hashable across concrete types.
pub trait Qualifier
where
    Self: Debug + AsAny + DynHash + Send + Sync + 'static,
{
    fn dyn_clone(&self) -> Box<dyn Qualifier>;
}

impl PartialEq for dyn Qualifier {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_any())
    }
}

impl Eq for dyn Qualifier {}

impl Hash for dyn Qualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dyn_hash(state);
    }
}

impl<Q: TypedQualifier> Qualifier for Q {
    fn dyn_clone(&self) -> Box<dyn Qualifier> {
        Box::new(*self)
    }
}

/// A value usable as a qualifier. Implemented for every `Copy` value with
/// structural equality, including unit marker types and `&'static str`.
pub trait TypedQualifier
where
    Self: Copy + Debug + Eq + Hash + Send + Sync + 'static,
{
}

impl<Q> TypedQualifier for Q where Q: Copy + Debug + Eq + Hash + Send + Sync + 'static {}

/// The statically typed form of [`Key`], preserving the target type for
/// downcasts on the typed request path.
pub trait TypedKey: Key + Copy + Eq + Hash {
    type Target: Managed;

    type Qualifier: TypedQualifier;

    fn qualifier(&self) -> Self::Qualifier;

    fn qualifier_ref(&self) -> &Self::Qualifier;
}

/// Creates an unqualified key for `T`.
pub fn of<T>() -> impl TypedKey<Target = T, Qualifier = ()>
where
    T: Managed,
{
    KeyImpl::new(())
}

/// Creates a key for `T` distinguished by a name.
pub fn named<T>(name: &'static str) -> impl TypedKey<Target = T, Qualifier = &'static str>
where
    T: Managed,
{
    KeyImpl::new(name)
}

/// Creates a key for `T` distinguished by an arbitrary qualifier value.
pub fn qualified<T, Q>(qualifier: Q) -> impl TypedKey<Target = T, Qualifier = Q>
where
    T: Managed,
    Q: TypedQualifier,
{
    KeyImpl::new(qualifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_equality_distinguishes_qualifiers() {
        let plain: Box<dyn Key> = Box::new(of::<i32>());
        let a: Box<dyn Key> = Box::new(named::<i32>("a"));
        let b: Box<dyn Key> = Box::new(named::<i32>("b"));

        assert_ne!(&plain, &a);
        assert_ne!(&a, &b);
        assert_eq!(&a, &Key::dyn_clone(&named::<i32>("a")));
    }

    #[test]
    fn key_equality_distinguishes_target_types() {
        let int_key: Box<dyn Key> = Box::new(of::<i32>());
        let long_key: Box<dyn Key> = Box::new(of::<i64>());
        assert_ne!(&int_key, &long_key);
    }

    #[test]
    fn without_qualifier_strips_the_qualifier() {
        let key = named::<i32>("a");
        let stripped = key.without_qualifier();
        assert!(!stripped.is_qualified());
        assert_eq!(&stripped, &Key::dyn_clone(&of::<i32>()));
    }

    #[test]
    fn with_string_target_preserves_the_qualifier() {
        let key = named::<i32>("port");
        let string_key = key.with_string_target();
        assert_eq!(string_key.target_type(), TypeId::of::<String>());
        assert_eq!(&string_key, &Key::dyn_clone(&named::<String>("port")));
    }
}
