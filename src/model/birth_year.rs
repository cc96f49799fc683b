use crate::codec::{Bridgeable, FieldReader, KeyedMap};
use crate::error::DecodeResult;
use crate::model::{check_range, ModelError, TypeTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthYear {
    month: u8,
    year: i32,
}

impl BirthYear {
    pub fn new(month: u8, year: i32) -> Result<Self, ModelError> {
        check_range("month", f64::from(month), 1.0, 12.0)?;
        Ok(Self { month, year })
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl Bridgeable for BirthYear {
    const TYPE_TAG: TypeTag = TypeTag::BirthYear;

    fn encode_fields(&self, map: &mut KeyedMap) {
        map.insert("month".to_string(), self.month.into());
        map.insert("year".to_string(), self.year.into());
    }

    fn decode_fields(fields: &FieldReader<'_>) -> DecodeResult<Self> {
        Ok(Self::new(
            fields.required_int("month")?,
            fields.required_int("year")?,
        )?)
    }
}
