use std::sync::Arc;

use crate::container::registry::{BindingKind, Factory};
use crate::container::Managed;
use crate::element::{Binder, BindingElement, Element};
use crate::key::{self, Key, TypedQualifier};
use crate::provider::instance::InstanceProvider;
use crate::scope::Scoping;
use crate::source::Source;

/// A value bindable as a constant. String constants are stored as
/// [`String`], which makes them eligible for conversion when another type is
/// requested under the same qualifier.
pub trait ConstantValue {
    type Stored: Managed + Clone;

    fn into_stored(self) -> Self::Stored;
}

macro_rules! impl_constant_value_for_primitives {
    ($($target:ty),*) => {
        $(
            impl ConstantValue for $target {
                type Stored = Self;

                fn into_stored(self) -> Self::Stored {
                    self
                }
            }
        )*
    };
}

impl_constant_value_for_primitives!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, String
);

impl ConstantValue for &'static str {
    type Stored = String;

    fn into_stored(self) -> Self::Stored {
        self.to_owned()
    }
}

/// A constant binding chain that still needs its qualifier.
pub struct ConstantDsl<Q>
where
    Q: TypedQualifier,
{
    qualifier: Q,
}

impl<Q> ConstantDsl<Q>
where
    Q: TypedQualifier,
{
    pub(crate) fn new(qualifier: Q) -> Self {
        Self { qualifier }
    }

    pub fn qualified_by<NewQ>(self, qualifier: NewQ) -> ConstantDsl<NewQ>
    where
        NewQ: TypedQualifier,
    {
        ConstantDsl::new(qualifier)
    }

    pub fn named(self, name: &'static str) -> ConstantDsl<&'static str> {
        ConstantDsl::new(name)
    }

    /// Picks the constant's value, fixing the bound type.
    pub fn to<V>(self, value: V) -> ConstantTargetDsl<V::Stored, Q>
    where
        V: ConstantValue,
    {
        ConstantTargetDsl {
            value: value.into_stored(),
            qualifier: self.qualifier,
        }
    }
}

/// A constant binding chain ready to be recorded.
pub struct ConstantTargetDsl<T, Q>
where
    T: Managed + Clone,
    Q: TypedQualifier,
{
    value: T,
    qualifier: Q,
}

impl<T, Q> ConstantTargetDsl<T, Q>
where
    T: Managed + Clone,
    Q: TypedQualifier,
{
    /// Records the constant binding.
    #[track_caller]
    pub fn set_on(self, binder: &mut Binder) {
        let key = key::qualified::<T, Q>(self.qualifier);
        binder.push(Element::Bind(BindingElement {
            key: key.dyn_clone(),
            source: Source::capture(),
            scoping: Scoping::NoScope,
            kind: BindingKind::Constant,
            factory: Factory::Owned(Arc::new(InstanceProvider::new(self.value))),
            dependencies: Vec::new(),
            link_target: None,
            ticket: None,
        }));
    }
}
