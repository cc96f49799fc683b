//! Sample bridgeable data model.
//!
//! Each type has one [`TypeTag`]; [`decode_any`] maps a tag read from the wire
//! to the matching decoder.

mod birth_year;
mod person;
mod position;
mod status;

use std::str::FromStr;

use thiserror::Error;

pub use birth_year::BirthYear;
pub use person::{Person, PersonBuilder, PersonOption};
pub use position::Position;
pub use status::Status;

use crate::codec::{read_tag, Bridgeable, FieldReader, KeyedMap};
use crate::error::{DecodeError, DecodeResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display, strum::AsRefStr,
)]
pub enum TypeTag {
    Person,
    Status,
    Position,
    BirthYear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnyModel {
    Person(Person),
    Status(Status),
    Position(Position),
    BirthYear(BirthYear),
}

impl AnyModel {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            AnyModel::Person(_) => TypeTag::Person,
            AnyModel::Status(_) => TypeTag::Status,
            AnyModel::Position(_) => TypeTag::Position,
            AnyModel::BirthYear(_) => TypeTag::BirthYear,
        }
    }

    pub fn encode(&self) -> KeyedMap {
        match self {
            AnyModel::Person(v) => v.encode(),
            AnyModel::Status(v) => v.encode(),
            AnyModel::Position(v) => v.encode(),
            AnyModel::BirthYear(v) => v.encode(),
        }
    }
}

pub fn decode_any(map: &KeyedMap) -> DecodeResult<AnyModel> {
    let tag = read_tag(map)?;
    let tag = TypeTag::from_str(tag).map_err(|_| DecodeError::UnknownTypeTag(tag.to_string()))?;
    let fields = FieldReader::new(map);
    match tag {
        TypeTag::Person => Person::decode_fields(&fields).map(AnyModel::Person),
        TypeTag::Status => Status::decode_fields(&fields).map(AnyModel::Status),
        TypeTag::Position => Position::decode_fields(&fields).map(AnyModel::Position),
        TypeTag::BirthYear => BirthYear::decode_fields(&fields).map(AnyModel::BirthYear),
    }
}

/// A construction request that does not describe a valid value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} out of range: {value} not in {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} supplied more than once")]
    Duplicate { field: &'static str },
}

pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ModelError> {
    // NaN fails both comparisons.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ModelError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_any_dispatches_on_tag() {
        let status = Status::new(true, None);
        let decoded = decode_any(&status.encode()).unwrap();
        assert_eq!(decoded, AnyModel::Status(status));
        assert_eq!(decoded.type_tag(), TypeTag::Status);
    }

    #[test]
    fn test_decode_any_unknown_tag() {
        let map = json!({"className": "Invoice"}).as_object().cloned().unwrap();
        assert_eq!(
            decode_any(&map),
            Err(DecodeError::UnknownTypeTag("Invoice".to_string()))
        );
    }

    #[test]
    fn test_check_range_rejects_nan() {
        assert!(check_range("lat", f64::NAN, -90.0, 90.0).is_err());
        assert!(check_range("lat", 45.0, -90.0, 90.0).is_ok());
    }
}
