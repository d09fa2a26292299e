//! Type-driven tag codec
//!
//! Domain types describe their wire layout once with the `shape!` macro.
//! `marshal`/`unmarshal` walk that table to turn a value into tags and
//! back. Fields that map to whole tags implement [`TagValue`]; fields that
//! map to a piece of text inside a tag implement [`Scalar`].

pub(crate) mod extension;
pub(crate) mod scalar;
pub(crate) mod shape;

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::m3u::{Tag, Value};

pub use extension::{is_registered, register_tag, unregister_tag, Extension, Extensions};
pub use scalar::{format_seconds, parse_seconds, Scalar};
pub(crate) use shape::shape;
pub use shape::{Binding, Opts, Quote, Shape, ShapeBuilder, Shaped, Slot};

/// A value stored as one whole tag.
///
/// Types with a custom wire layout implement this by hand; shaped structs
/// get the attribute-list layout from `tag_value!`.
pub trait TagValue: Default {
    /// The tag's presence is the value; nothing is written after the name
    /// and the tag is omitted when the value is empty.
    const PRESENCE: bool = false;

    fn decode_tag(&mut self, tag: &Tag);

    /// Fill in the fields of `tag`. The name is already set.
    fn encode_tag(&self, tag: &mut Tag);

    fn is_empty(&self) -> bool;
}

impl TagValue for bool {
    const PRESENCE: bool = true;

    fn decode_tag(&mut self, _tag: &Tag) {
        *self = true;
    }

    fn encode_tag(&self, _tag: &mut Tag) {}

    fn is_empty(&self) -> bool {
        !*self
    }
}

/// Kept verbatim.
impl TagValue for Tag {
    fn decode_tag(&mut self, tag: &Tag) {
        *self = tag.clone();
    }

    fn encode_tag(&self, tag: &mut Tag) {
        let name = std::mem::take(&mut tag.name);
        *tag = self.clone();
        tag.name = name;
    }

    fn is_empty(&self) -> bool {
        Tag::is_empty(self)
    }
}

/// Single-valued tags such as `#EXT-X-VERSION:3`: the value is the tag's
/// primary value and is written back as its only argument.
macro_rules! scalar_tag_value {
    ($($t:ty),*) => {$(
        impl TagValue for $t {
            fn decode_tag(&mut self, tag: &Tag) {
                *self = <$t as Scalar>::parse(tag.value(""));
            }

            fn encode_tag(&self, tag: &mut Tag) {
                tag.args.push(Value::new(self.format()));
            }

            fn is_empty(&self) -> bool {
                self.is_zero()
            }
        }
    )*};
}

scalar_tag_value!(u32, u64, i64, f64, String, Duration, Option<DateTime<FixedOffset>>);

/// Implement [`TagValue`] for shaped structs whose fields are the
/// attributes of a single tag.
macro_rules! tag_value {
    ($($ty:ty),* $(,)?) => {$(
        impl $crate::codec::TagValue for $ty {
            fn decode_tag(&mut self, tag: &$crate::m3u::Tag) {
                $crate::codec::unmarshal_attrs(self, tag);
            }

            fn encode_tag(&self, tag: &mut $crate::m3u::Tag) {
                $crate::codec::marshal_attrs(self, tag);
            }

            fn is_empty(&self) -> bool {
                $crate::codec::is_zero(self)
            }
        }
    )*};
}

pub(crate) use tag_value;

/// Encode `value` as an ordered list of tags, in binding order.
pub fn marshal<T: Shaped>(value: &T) -> Vec<Tag> {
    let mut out = Vec::new();
    for binding in T::shape().bindings() {
        if binding.attribute || (binding.omit_empty && binding.is_zero(value)) {
            continue;
        }
        binding.encode(value, &mut out);
    }
    out
}

/// Decode `tags` into `value`. Tags no binding claims go to the type's
/// extension sink, or are dropped when it has none.
pub fn unmarshal<'a, T: Shaped>(value: &mut T, tags: impl IntoIterator<Item = &'a Tag>) {
    let shape = T::shape();
    let mut seen = HashSet::new();
    for tag in tags {
        match shape.get(&tag.name) {
            Some(binding) if !binding.attribute => {
                if !binding.aggregate && !seen.insert(binding.name) {
                    tracing::trace!(tag = %tag.name, "repeated tag replaces the earlier one");
                }
                binding.decode(value, tag);
            }
            _ => match shape.sink() {
                Some(sink) => sink.decode(value, tag),
                None => tracing::trace!(tag = %tag.name, "tag not bound, dropped"),
            },
        }
    }
}

/// Decode the attributes, positional arguments and content line of one
/// tag into the fields of `value`.
pub fn unmarshal_attrs<T: Shaped>(value: &mut T, tag: &Tag) {
    for binding in T::shape().bindings().iter().filter(|b| b.attribute) {
        binding.decode(value, tag);
    }
}

/// Inverse of [`unmarshal_attrs`].
pub fn marshal_attrs<T: Shaped>(value: &T, tag: &mut Tag) {
    for binding in T::shape().bindings().iter().filter(|b| b.attribute) {
        binding.encode_attr(value, tag);
    }
}

/// Whether every bound field of `value` holds its zero value.
pub fn is_zero<T: Shaped>(value: &T) -> bool {
    T::shape().bindings().iter().all(|b| b.is_zero(value))
}
