//! # Bridgeable Codec
//!
//! Converts typed domain values to and from the keyed map used as message
//! payload. Every encoded map carries [`TYPE_TAG_KEY`] mapped to the value's
//! [`TypeTag`], and decoding refuses maps whose tag is missing or foreign
//! before any field is read.
//!
//! Optional fields are omitted when absent. On decode an omitted key means
//! "not present"; an explicit `null` is not the same thing and is rejected.

use serde_json::{Map, Value};

use crate::error::{DecodeError, DecodeResult};
use crate::model::TypeTag;

pub type KeyedMap = Map<String, Value>;

/// Key holding the type tag in every encoded map.
pub const TYPE_TAG_KEY: &str = "className";

pub trait Bridgeable: Sized {
    const TYPE_TAG: TypeTag;

    /// Writes every present field. The type tag is added by [`Bridgeable::encode`].
    fn encode_fields(&self, map: &mut KeyedMap);

    /// Reads fields from a map whose tag has already been checked.
    fn decode_fields(fields: &FieldReader<'_>) -> DecodeResult<Self>;

    fn encode(&self) -> KeyedMap {
        let mut map = KeyedMap::new();
        self.encode_fields(&mut map);
        map.insert(
            TYPE_TAG_KEY.to_string(),
            Value::String(Self::TYPE_TAG.to_string()),
        );
        map
    }

    fn decode(map: &KeyedMap) -> DecodeResult<Self> {
        expect_tag(map, Self::TYPE_TAG)?;
        Self::decode_fields(&FieldReader::new(map))
    }

    fn to_payload(&self) -> Value {
        Value::Object(self.encode())
    }

    fn from_payload(value: &Value) -> DecodeResult<Self> {
        let map = value.as_object().ok_or(DecodeError::NotAMap)?;
        Self::decode(map)
    }
}

pub fn read_tag(map: &KeyedMap) -> DecodeResult<&str> {
    match map.get(TYPE_TAG_KEY) {
        Some(Value::String(tag)) => Ok(tag.as_str()),
        Some(_) => Err(DecodeError::InvalidField {
            field: TYPE_TAG_KEY.to_string(),
            expected: "string",
        }),
        None => Err(DecodeError::MissingTypeTag),
    }
}

pub fn expect_tag(map: &KeyedMap, expected: TypeTag) -> DecodeResult<()> {
    let found = read_tag(map)?;
    if found != expected.as_ref() {
        return Err(DecodeError::TypeTagMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

pub fn put_nested<T: Bridgeable>(map: &mut KeyedMap, key: &str, value: &T) {
    map.insert(key.to_string(), value.to_payload());
}

/// Typed read access to the fields of an encoded map.
pub struct FieldReader<'a> {
    map: &'a KeyedMap,
}

impl<'a> FieldReader<'a> {
    pub fn new(map: &'a KeyedMap) -> Self {
        Self { map }
    }

    fn present(&self, key: &str) -> DecodeResult<Option<&'a Value>> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Null) => Err(DecodeError::InvalidField {
                field: key.to_string(),
                expected: "a value or no entry (null is not absent)",
            }),
            Some(value) => Ok(Some(value)),
        }
    }

    fn required(&self, key: &str) -> DecodeResult<&'a Value> {
        self.present(key)?
            .ok_or_else(|| DecodeError::MissingField(key.to_string()))
    }

    pub fn required_str(&self, key: &str) -> DecodeResult<String> {
        as_str(key, self.required(key)?)
    }

    pub fn required_bool(&self, key: &str) -> DecodeResult<bool> {
        as_bool(key, self.required(key)?)
    }

    pub fn required_f64(&self, key: &str) -> DecodeResult<f64> {
        as_f64(key, self.required(key)?)
    }

    pub fn required_int<T: TryFrom<i64>>(&self, key: &str) -> DecodeResult<T> {
        as_int(key, self.required(key)?)
    }

    pub fn optional_bool(&self, key: &str) -> DecodeResult<Option<bool>> {
        self.present(key)?.map(|v| as_bool(key, v)).transpose()
    }

    pub fn optional_int<T: TryFrom<i64>>(&self, key: &str) -> DecodeResult<Option<T>> {
        self.present(key)?.map(|v| as_int(key, v)).transpose()
    }

    pub fn optional_nested<T: Bridgeable>(&self, key: &str) -> DecodeResult<Option<T>> {
        self.present(key)?
            .map(|value| {
                let map = value.as_object().ok_or_else(|| DecodeError::InvalidField {
                    field: key.to_string(),
                    expected: "keyed map",
                })?;
                T::decode(map)
            })
            .transpose()
    }
}

fn as_str(key: &str, value: &Value) -> DecodeResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DecodeError::InvalidField {
            field: key.to_string(),
            expected: "string",
        })
}

fn as_bool(key: &str, value: &Value) -> DecodeResult<bool> {
    value.as_bool().ok_or_else(|| DecodeError::InvalidField {
        field: key.to_string(),
        expected: "boolean",
    })
}

fn as_f64(key: &str, value: &Value) -> DecodeResult<f64> {
    value.as_f64().ok_or_else(|| DecodeError::InvalidField {
        field: key.to_string(),
        expected: "number",
    })
}

fn as_int<T: TryFrom<i64>>(key: &str, value: &Value) -> DecodeResult<T> {
    value
        .as_i64()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| DecodeError::InvalidField {
            field: key.to_string(),
            expected: "integer in range",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> KeyedMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_read_tag() {
        assert_eq!(read_tag(&map(json!({"className": "Person"}))), Ok("Person"));
        assert_eq!(read_tag(&map(json!({}))), Err(DecodeError::MissingTypeTag));
        assert!(matches!(
            read_tag(&map(json!({"className": 3}))),
            Err(DecodeError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_expect_tag_mismatch() {
        let result = expect_tag(&map(json!({"className": "Status"})), TypeTag::Person);
        assert_eq!(
            result,
            Err(DecodeError::TypeTagMismatch {
                expected: "Person".to_string(),
                found: "Status".to_string()
            })
        );
    }

    #[test]
    fn test_field_reader_null_is_not_absent() {
        let fields = map(json!({"age": null, "name": "Ann"}));
        let reader = FieldReader::new(&fields);
        assert!(reader.optional_int::<u32>("age").is_err());
        assert_eq!(reader.optional_int::<u32>("missing"), Ok(None));
        assert_eq!(reader.required_str("name"), Ok("Ann".to_string()));
        assert_eq!(
            reader.required_bool("member"),
            Err(DecodeError::MissingField("member".to_string()))
        );
    }

    #[test]
    fn test_int_out_of_range() {
        let fields = map(json!({"age": -1, "month": 3.5}));
        let reader = FieldReader::new(&fields);
        assert!(reader.required_int::<u32>("age").is_err());
        assert!(reader.required_int::<i32>("month").is_err());
    }
}
