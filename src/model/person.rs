use crate::codec::{put_nested, Bridgeable, FieldReader, KeyedMap};
use crate::error::DecodeResult;
use crate::model::{BirthYear, ModelError, Position, Status, TypeTag};

/// Optional fields of a [`Person`], supplied as part of the construction request.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonOption {
    Age(u32),
    /// Membership status
    Status(Status),
    Position(Position),
    BirthYear(BirthYear),
}

impl PersonOption {
    fn key(&self) -> &'static str {
        match self {
            PersonOption::Age(_) => "age",
            PersonOption::Status(_) => "status",
            PersonOption::Position(_) => "position",
            PersonOption::BirthYear(_) => "birthYear",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    name: String,
    month: i32,
    age: Option<u32>,
    status: Option<Status>,
    position: Option<Position>,
    birth_year: Option<BirthYear>,
}

impl Person {
    /// Validates a complete construction request.
    ///
    /// `name` must be non-empty. `month` is the month hired as a plain count
    /// and is not range checked. Each optional field may be given at most once.
    pub fn new(
        name: impl Into<String>,
        month: i32,
        options: impl IntoIterator<Item = PersonOption>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::Empty { field: "name" });
        }

        let mut person = Self {
            name,
            month,
            age: None,
            status: None,
            position: None,
            birth_year: None,
        };
        for option in options {
            let key = option.key();
            let duplicate = match option {
                PersonOption::Age(age) => person.age.replace(age).is_some(),
                PersonOption::Status(status) => person.status.replace(status).is_some(),
                PersonOption::Position(position) => person.position.replace(position).is_some(),
                PersonOption::BirthYear(birth_year) => {
                    person.birth_year.replace(birth_year).is_some()
                }
            };
            if duplicate {
                return Err(ModelError::Duplicate { field: key });
            }
        }
        Ok(person)
    }

    pub fn builder(name: impl Into<String>, month: i32) -> PersonBuilder {
        PersonBuilder {
            name: name.into(),
            month,
            options: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn month(&self) -> i32 {
        self.month
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn birth_year(&self) -> Option<&BirthYear> {
        self.birth_year.as_ref()
    }
}

impl Bridgeable for Person {
    const TYPE_TAG: TypeTag = TypeTag::Person;

    fn encode_fields(&self, map: &mut KeyedMap) {
        map.insert("name".to_string(), self.name.clone().into());
        map.insert("month".to_string(), self.month.into());
        if let Some(age) = self.age {
            map.insert("age".to_string(), age.into());
        }
        if let Some(status) = &self.status {
            put_nested(map, "status", status);
        }
        if let Some(position) = &self.position {
            put_nested(map, "position", position);
        }
        if let Some(birth_year) = &self.birth_year {
            put_nested(map, "birthYear", birth_year);
        }
    }

    fn decode_fields(fields: &FieldReader<'_>) -> DecodeResult<Self> {
        let options = [
            fields.optional_int("age")?.map(PersonOption::Age),
            fields.optional_nested("status")?.map(PersonOption::Status),
            fields.optional_nested("position")?.map(PersonOption::Position),
            fields
                .optional_nested("birthYear")?
                .map(PersonOption::BirthYear),
        ];
        Ok(Self::new(
            fields.required_str("name")?,
            fields.required_int("month")?,
            options.into_iter().flatten(),
        )?)
    }
}

/// Collects optional fields before handing the whole request to [`Person::new`].
#[derive(Debug, Clone)]
pub struct PersonBuilder {
    name: String,
    month: i32,
    options: Vec<PersonOption>,
}

impl PersonBuilder {
    pub fn age(mut self, age: u32) -> Self {
        self.options.push(PersonOption::Age(age));
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.options.push(PersonOption::Status(status));
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.options.push(PersonOption::Position(position));
        self
    }

    pub fn birth_year(mut self, birth_year: BirthYear) -> Self {
        self.options.push(PersonOption::BirthYear(birth_year));
        self
    }

    pub fn build(self) -> Result<Person, ModelError> {
        Person::new(self.name, self.month, self.options)
    }
}
