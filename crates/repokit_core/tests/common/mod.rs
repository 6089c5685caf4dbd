#![allow(dead_code)]

use repokit_core::{
    open_db_in_memory, DataContext, Entity, FieldValue, FixedClock, FromRow, Migration,
    PropertyMapper, PropertyMapperService, PropertyMapperValue, Shape,
};
use rusqlite::Row;

pub const NOW_MS: i64 = 1_700_000_000_000;

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE people (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            city TEXT NOT NULL,
            deleted_at INTEGER NULL
        );",
    ),
    Migration::new(
        2,
        "CREATE TABLE tags (
            id INTEGER PRIMARY KEY NOT NULL,
            label TEXT NOT NULL
        );",
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub city: String,
}

impl Person {
    pub fn new(id: i64, name: &str, age: i64, city: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
            city: city.to_string(),
        }
    }
}

impl Shape for Person {
    const TYPE_NAME: &'static str = "Person";

    fn fields() -> &'static [&'static str] {
        &["id", "name", "age", "city"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "age" => Some(self.age.into()),
            "city" => Some(self.city.as_str().into()),
            _ => None,
        }
    }
}

impl FromRow for Person {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            age: row.get("age")?,
            city: row.get("city")?,
        })
    }
}

impl Entity for Person {
    const TABLE: &'static str = "people";
    const KEY_COLUMN: &'static str = "id";
}

/// Entity without a soft-delete column.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

impl Shape for Tag {
    const TYPE_NAME: &'static str = "Tag";

    fn fields() -> &'static [&'static str] {
        &["id", "label"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(self.id.into()),
            "label" => Some(self.label.as_str().into()),
            _ => None,
        }
    }
}

impl FromRow for Tag {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            label: row.get("label")?,
        })
    }
}

impl Entity for Tag {
    const TABLE: &'static str = "tags";
    const KEY_COLUMN: &'static str = "id";
    const SOFT_DELETE_COLUMN: Option<&'static str> = None;
}

/// Resource view of a person.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonDto {
    pub id: i64,
    pub display_name: String,
    pub age: i64,
    pub city: String,
}

impl From<Person> for PersonDto {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            display_name: format!("{} ({})", person.name, person.city),
            age: person.age,
            city: person.city,
        }
    }
}

impl Shape for PersonDto {
    const TYPE_NAME: &'static str = "PersonDto";

    fn fields() -> &'static [&'static str] {
        &["Id", "DisplayName", "Age", "City"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "Id" => Some(self.id.into()),
            "DisplayName" => Some(self.display_name.as_str().into()),
            "Age" => Some(self.age.into()),
            "City" => Some(self.city.as_str().into()),
            _ => None,
        }
    }
}

pub fn people() -> Vec<Person> {
    vec![
        Person::new(1, "Alice", 30, "Paris"),
        Person::new(2, "Bob", 25, "London"),
        Person::new(3, "Carol", 35, "Paris"),
        Person::new(4, "Dave", 25, "Berlin"),
        Person::new(5, "Eve", 40, "London"),
    ]
}

pub fn context() -> DataContext {
    DataContext::new(open_db_in_memory(MIGRATIONS).unwrap()).with_clock(FixedClock(NOW_MS))
}

/// Maps resource properties onto `people` columns; `Seniority` is age reversed.
pub fn mapper_service() -> PropertyMapperService {
    let mapper = PropertyMapper::<PersonDto, Person>::try_from_entries([
        ("Id", PropertyMapperValue::new(["id"])),
        ("DisplayName", PropertyMapperValue::new(["name", "city"])),
        ("Age", PropertyMapperValue::new(["age"])),
        ("City", PropertyMapperValue::new(["city"])),
        ("Seniority", PropertyMapperValue::new(["age"]).reverted()),
    ])
    .unwrap();
    PropertyMapperService::new().with_mapper(mapper)
}

pub fn ids(people: &[Person]) -> Vec<i64> {
    people.iter().map(|person| person.id).collect()
}
