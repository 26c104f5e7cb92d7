//! A permissive `serde::Deserializer` over borrowed value trees.

use std::collections::btree_map;
use std::slice;

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor, value::StrDeserializer,
};

use super::{DecodeError, FieldTag};
use crate::value::{Mapping, Value, coerce, exact_integer};

/// Deserializer reading from a borrowed [`Value`].
///
/// Scalars are coerced toward whatever type the visitor asks for, so the
/// string `"2"` decodes into an integer field and the number `1` into a
/// boolean one.
#[derive(Debug, Clone, Copy)]
pub struct ValueDeserializer<'a> {
    value: &'a Value,
    tag: FieldTag,
}

impl<'a> ValueDeserializer<'a> {
    /// Wrap `value`, matching struct fields with `tag`.
    #[must_use]
    pub const fn new(value: &'a Value, tag: FieldTag) -> Self {
        Self { value, tag }
    }

    fn integer(self, expected: &str) -> Result<i64, DecodeError> {
        coerce::to_i64(self.value).ok_or_else(|| DecodeError::invalid(self.value, expected))
    }

    fn unsigned(self, expected: &str) -> Result<u64, DecodeError> {
        let wide = self.integer(expected)?;
        u64::try_from(wide).map_err(|_| DecodeError::invalid(self.value, expected))
    }

    fn float(self, expected: &str) -> Result<f64, DecodeError> {
        coerce::to_f64(self.value).ok_or_else(|| DecodeError::invalid(self.value, expected))
    }
}

macro_rules! narrow_signed {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            #[expect(
                clippy::cast_possible_truncation,
                reason = "narrow integers keep the low bits like a C-style cast"
            )]
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
                let wide = self.integer(stringify!($ty))?;
                visitor.$visit(wide as $ty)
            }
        )*
    };
}

macro_rules! checked_unsigned {
    ($($method:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
                visitor.visit_u64(self.unsigned("unsigned integer")?)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ValueDeserializer<'_> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(flag) => visitor.visit_bool(*flag),
            Value::Number(number) => match exact_integer(*number) {
                Some(integer) => visitor.visit_i64(integer),
                None => visitor.visit_f64(*number),
            },
            Value::String(text) => visitor.visit_str(text),
            Value::List(items) => visitor.visit_seq(SeqAccessor {
                items: items.iter(),
                tag: self.tag,
            }),
            Value::Map(map) => visitor.visit_map(MapAccessor::new(map, &[], self.tag)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let flag =
            coerce::to_bool(self.value).ok_or_else(|| DecodeError::invalid(self.value, "bool"))?;
        visitor.visit_bool(flag)
    }

    narrow_signed! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_i64(self.integer("i64")?)
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_i128(i128::from(self.integer("i128")?))
    }

    checked_unsigned! {
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_u128(u128::from(self.unsigned("u128")?))
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "single precision fields narrow like the f32 accessor"
    )]
    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_f32(self.float("f32")? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_f64(self.float("f64")?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let text = coerce::to_text(self.value);
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => visitor.visit_char(ch),
            _ => Err(DecodeError::invalid(self.value, "char")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::String(text) => visitor.visit_str(text),
            other => visitor.visit_string(coerce::to_text(other)),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_byte_buf(coerce::to_text(self.value).into_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let items: &[Value] = match self.value {
            Value::List(items) => items,
            Value::Null => &[],
            Value::Map(map) if map.is_empty() => &[],
            single => slice::from_ref(single),
        };
        visitor.visit_seq(SeqAccessor {
            items: items.iter(),
            tag: self.tag,
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_struct("", &[], visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Map(map) => visitor.visit_map(MapAccessor::new(map, fields, self.tag)),
            Value::Null => visitor.visit_map(MapAccessor::empty(self.tag)),
            other => Err(DecodeError::invalid(other, "map")),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::String(text) => {
                let variant: StrDeserializer<'_, DecodeError> = text.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Map(map) if map.len() == 1 => {
                let mut entries = map.iter();
                let Some((variant, content)) = entries.next() else {
                    return Err(DecodeError::invalid(self.value, "enum"));
                };
                visitor.visit_enum(EnumAccessor {
                    variant,
                    content,
                    tag: self.tag,
                })
            }
            other => Err(DecodeError::invalid(other, "enum")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }
}

struct SeqAccessor<'a> {
    items: slice::Iter<'a, Value>,
    tag: FieldTag,
}

impl<'de> SeqAccess<'de> for SeqAccessor<'_> {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DecodeError> {
        self.items
            .next()
            .map(|item| seed.deserialize(ValueDeserializer::new(item, self.tag)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Walks a mapping, translating keys to declared field names.
struct MapAccessor<'a> {
    entries: Option<btree_map::Iter<'a, String, Value>>,
    fields: &'static [&'static str],
    tag: FieldTag,
    pending: Option<(&'a str, &'a Value)>,
}

impl<'a> MapAccessor<'a> {
    fn new(
        map: &'a Mapping,
        fields: &'static [&'static str],
        tag: FieldTag,
    ) -> Self {
        Self {
            entries: Some(map.iter()),
            fields,
            tag,
            pending: None,
        }
    }

    const fn empty(tag: FieldTag) -> Self {
        Self {
            entries: None,
            fields: &[],
            tag,
            pending: None,
        }
    }

    fn field_name(&self, key: &'a str) -> &'a str {
        if self.fields.is_empty() {
            return key;
        }
        self.tag.resolve(key, self.fields).unwrap_or(key)
    }
}

impl<'de> MapAccess<'de> for MapAccessor<'_> {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DecodeError> {
        let Some((key, value)) = self.entries.as_mut().and_then(Iterator::next) else {
            return Ok(None);
        };
        self.pending = Some((key.as_str(), value));
        let name = Value::String(self.field_name(key).to_owned());
        seed.deserialize(ValueDeserializer::new(&name, self.tag))
            .map(Some)
            .map_err(|err| err.at(key))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, DecodeError> {
        let Some((key, value)) = self.pending.take() else {
            return Err(de::Error::custom("map value requested before its key"));
        };
        seed.deserialize(ValueDeserializer::new(value, self.tag))
            .map_err(|err| err.at(key))
    }

    fn size_hint(&self) -> Option<usize> {
        self.entries.as_ref().map(ExactSizeIterator::len)
    }
}

struct EnumAccessor<'a> {
    variant: &'a str,
    content: &'a Value,
    tag: FieldTag,
}

impl<'de, 'a> EnumAccess<'de> for EnumAccessor<'a> {
    type Error = DecodeError;
    type Variant = ValueDeserializer<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), DecodeError> {
        let name: StrDeserializer<'_, DecodeError> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, ValueDeserializer::new(self.content, self.tag)))
    }
}

impl<'de> VariantAccess<'de> for ValueDeserializer<'_> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, DecodeError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_struct("", fields, visitor)
    }
}
