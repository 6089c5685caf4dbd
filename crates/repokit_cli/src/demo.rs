//! Demo author catalog used by the CLI.

use repokit_core::{
    DataContext, Entity, FieldValue, FromRow, Migration, ProcedureCatalog, PropertyMapper,
    PropertyMapperService, PropertyMapperValue, Repository, Shape, SqliteRepository,
};
use rusqlite::Row;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const MIGRATIONS: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE IF NOT EXISTS authors (
        id TEXT PRIMARY KEY NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        born_year INTEGER NOT NULL,
        genre TEXT NOT NULL,
        deleted_at INTEGER NULL
    );
    CREATE INDEX IF NOT EXISTS idx_authors_deleted_at ON authors(deleted_at);",
)];

const SEED: &[(&str, &str, i64, &str)] = &[
    ("Stephen", "King", 1947, "Horror"),
    ("George", "Martin", 1948, "Fantasy"),
    ("Ursula", "Le Guin", 1929, "Fantasy"),
    ("Douglas", "Adams", 1952, "Comedy"),
    ("Agatha", "Christie", 1890, "Mystery"),
    ("Neil", "Gaiman", 1960, "Fantasy"),
    ("Mary", "Shelley", 1797, "Horror"),
];

/// Schema the demo procedures are registered under.
pub const SCHEMA: &str = "demo";

/// Demo procedures, registered under their `demo.` qualified names.
pub fn procedures() -> ProcedureCatalog {
    ProcedureCatalog::new().with_procedure(
        "demo.genre_counts",
        ["SELECT genre, COUNT(*) AS authors FROM authors
          WHERE deleted_at IS NULL OR :show_deleted = 1
          GROUP BY genre ORDER BY genre;"],
    )
}

/// One row of `demo.genre_counts`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreCount {
    pub genre: String,
    pub authors: i64,
}

impl FromRow for GenreCount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            genre: row.get("genre")?,
            authors: row.get("authors")?,
        })
    }
}

/// Row of the `authors` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub born_year: i64,
    pub genre: String,
}

impl Shape for Author {
    const TYPE_NAME: &'static str = "Author";

    fn fields() -> &'static [&'static str] {
        &["id", "first_name", "last_name", "born_year", "genre"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "first_name" => Some(self.first_name.as_str().into()),
            "last_name" => Some(self.last_name.as_str().into()),
            "born_year" => Some(self.born_year.into()),
            "genre" => Some(self.genre.as_str().into()),
            _ => None,
        }
    }
}

impl FromRow for Author {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            born_year: row.get("born_year")?,
            genre: row.get("genre")?,
        })
    }
}

impl Entity for Author {
    const TABLE: &'static str = "authors";
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> FieldValue {
        self.id.as_str().into()
    }
}

/// Outward-facing author resource.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorDto {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub genre: String,
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            name: format!("{} {}", author.first_name, author.last_name),
            age: current_year() - author.born_year,
            genre: author.genre,
        }
    }
}

impl Shape for AuthorDto {
    const TYPE_NAME: &'static str = "AuthorDto";

    fn fields() -> &'static [&'static str] {
        &["Id", "Name", "Age", "Genre"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "Id" => Some(self.id.as_str().into()),
            "Name" => Some(self.name.as_str().into()),
            "Age" => Some(self.age.into()),
            "Genre" => Some(self.genre.as_str().into()),
            _ => None,
        }
    }
}

/// Sort mapping from resource properties to `authors` columns. Sorting by
/// age ascending means birth year descending.
pub fn mapper_service() -> Result<PropertyMapperService, repokit_core::ConfigurationError> {
    let mapper = PropertyMapper::<AuthorDto, Author>::try_from_entries([
        ("Id", PropertyMapperValue::new(["id"])),
        ("Genre", PropertyMapperValue::new(["genre"])),
        ("Name", PropertyMapperValue::new(["first_name", "last_name"])),
        ("Age", PropertyMapperValue::new(["born_year"]).reverted()),
    ])?;
    Ok(PropertyMapperService::new().with_mapper(mapper))
}

/// Inserts the demo authors when the table is empty; the last one is
/// soft-deleted so `--show-deleted` has something to reveal.
pub fn seed_if_empty(ctx: &DataContext) -> repokit_core::RepoResult<usize> {
    let repo = SqliteRepository::<Author>::try_new(ctx)?;
    if repo.count(&Default::default(), true)? > 0 {
        return Ok(0);
    }

    let authors = SEED
        .iter()
        .map(|(first_name, last_name, born_year, genre)| Author {
            id: Uuid::new_v4().to_string(),
            first_name: (*first_name).to_string(),
            last_name: (*last_name).to_string(),
            born_year: *born_year,
            genre: (*genre).to_string(),
        })
        .collect::<Vec<_>>();
    let inserted = repo.insert_range(&authors)?;
    if let Some(last) = authors.last() {
        repo.delete(last)?;
    }
    Ok(inserted)
}

fn current_year() -> i64 {
    const MS_PER_YEAR: f64 = 365.2425 * 24.0 * 60.0 * 60.0 * 1000.0;
    let elapsed_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as f64)
        .unwrap_or(0.0);
    1970 + (elapsed_ms / MS_PER_YEAR) as i64
}
