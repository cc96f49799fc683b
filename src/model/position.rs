use crate::codec::{Bridgeable, FieldReader, KeyedMap};
use crate::error::DecodeResult;
use crate::model::{check_range, ModelError, TypeTag};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    lat: f64,
    lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ModelError> {
        check_range("lat", lat, -90.0, 90.0)?;
        check_range("lng", lng, -180.0, 180.0)?;
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl Bridgeable for Position {
    const TYPE_TAG: TypeTag = TypeTag::Position;

    fn encode_fields(&self, map: &mut KeyedMap) {
        map.insert("lat".to_string(), self.lat.into());
        map.insert("lng".to_string(), self.lng.into());
    }

    fn decode_fields(fields: &FieldReader<'_>) -> DecodeResult<Self> {
        Ok(Self::new(
            fields.required_f64("lat")?,
            fields.required_f64("lng")?,
        )?)
    }
}
