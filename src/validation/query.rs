//! Typed decoding of parsed query maps.

use std::marker::PhantomData;

use serde::de::value::{Error, MapDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{DeserializeOwned, Deserializer, Error as _, IntoDeserializer, Visitor};

use crate::pipeline::validation::{QueryMap, QueryMapValidator, QueryValue, ValidationError};

/// Deserializes a [`QueryMap`] into `T`.
///
/// Repeated keys become sequences; single values parse into numbers and
/// bools on demand.
pub struct QueryStruct<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> QueryStruct<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for QueryStruct<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueryMapValidator for QueryStruct<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Output = T;

    fn validate(&self, query: &QueryMap) -> Result<T, ValidationError> {
        let entries = query.iter().map(|(key, value)| (key.as_str(), Entry(value)));
        T::deserialize(MapDeserializer::<_, Error>::new(entries))
            .map_err(|e| ValidationError::new(e.to_string()))
    }
}

/// One query string value.
struct Text<'a>(&'a str);

/// One query entry, single or repeated.
struct Entry<'a>(&'a QueryValue);

macro_rules! parse_text {
    ($($method:ident => $visit:ident),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            let value = self
                .0
                .parse()
                .map_err(|_| Error::custom(format!("invalid value `{}`", self.0)))?;
            visitor.$visit(value)
        }
    )*};
}

macro_rules! single_only {
    ($($method:ident),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            match self.0 {
                QueryValue::Single(text) => Text(text.as_str()).$method(visitor),
                QueryValue::Multiple(_) => Err(Error::custom("expected a single value")),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Text<'_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_str(self.0)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let variant: StrDeserializer<'_, Error> = self.0.into_deserializer();
        visitor.visit_enum(variant)
    }

    parse_text! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
    }

    serde::forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct newtype_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for Text<'_> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> Deserializer<'de> for Entry<'_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            QueryValue::Single(text) => visitor.visit_str(text),
            QueryValue::Multiple(all) => self.deserialize_seq_of(all, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            QueryValue::Single(text) => self.deserialize_seq_of(std::slice::from_ref(text), visitor),
            QueryValue::Multiple(all) => self.deserialize_seq_of(all, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.0 {
            QueryValue::Single(text) => Text(text.as_str()).deserialize_enum(name, variants, visitor),
            QueryValue::Multiple(_) => Err(Error::custom("expected a single value")),
        }
    }

    single_only! {
        deserialize_bool,
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
        deserialize_f32,
        deserialize_f64,
    }

    serde::forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct newtype_struct
        tuple tuple_struct map struct identifier ignored_any
    }
}

impl Entry<'_> {
    fn deserialize_seq_of<'de, V: Visitor<'de>>(&self, items: &[String], visitor: V) -> Result<V::Value, Error> {
        let mut seq = SeqDeserializer::<_, Error>::new(items.iter().map(|item| Text(item.as_str())));
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }
}

impl<'de> IntoDeserializer<'de, Error> for Entry<'_> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
