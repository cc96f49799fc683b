use crate::codec::{Bridgeable, FieldReader, KeyedMap};
use crate::error::DecodeResult;
use crate::model::TypeTag;

/// Membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    member: bool,
    log: Option<bool>,
}

impl Status {
    pub fn new(member: bool, log: Option<bool>) -> Self {
        Self { member, log }
    }

    pub fn member(&self) -> bool {
        self.member
    }

    pub fn log(&self) -> Option<bool> {
        self.log
    }
}

impl Bridgeable for Status {
    const TYPE_TAG: TypeTag = TypeTag::Status;

    fn encode_fields(&self, map: &mut KeyedMap) {
        map.insert("member".to_string(), self.member.into());
        if let Some(log) = self.log {
            map.insert("log".to_string(), log.into());
        }
    }

    fn decode_fields(fields: &FieldReader<'_>) -> DecodeResult<Self> {
        Ok(Self::new(
            fields.required_bool("member")?,
            fields.optional_bool("log")?,
        ))
    }
}
