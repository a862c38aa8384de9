use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: &str) -> Result<Self, AuthorNameEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(AuthorNameEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Author name cannot be empty")]
pub struct AuthorNameEmptyError;

#[derive(Debug, Clone)]
pub struct Author {
    id: i64,
    name: AuthorName,
    bio: Option<String>,
}

impl Author {
    pub const fn new(id: i64, name: AuthorName, bio: Option<String>) -> Self {
        Self { id, name, bio }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }
}

#[derive(Debug)]
pub struct Book {
    id: i64,
    title: String,
    summary: String,
    publication_date: NaiveDate,
    author_id: Option<i64>,
    author: Option<Author>,
}

impl Book {
    pub const fn new(
        id: i64,
        title: String,
        summary: String,
        publication_date: NaiveDate,
        author_id: Option<i64>,
        author: Option<Author>,
    ) -> Self {
        Self {
            id,
            title,
            summary,
            publication_date,
            author_id,
            author,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub const fn publication_date(&self) -> NaiveDate {
        self.publication_date
    }

    pub const fn author_id(&self) -> Option<i64> {
        self.author_id
    }

    pub const fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }
}

#[derive(Debug)]
pub struct CreateAuthorRequest {
    name: AuthorName,
    bio: Option<String>,
}

impl CreateAuthorRequest {
    pub const fn new(name: AuthorName, bio: Option<String>) -> Self {
        Self { name, bio }
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }
}

#[derive(Error, Debug)]
pub enum CreateAuthorError {
    #[error("Author with name \"{name}\" already exists")]
    Duplicate { name: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

/// Partial patch for an author. A field left at `None` is not touched.
/// `bio` is doubly optional: `Some(None)` clears it, `None` leaves it alone.
#[derive(Debug)]
pub struct UpdateAuthorRequest {
    id: i64,
    name: Option<AuthorName>,
    bio: Option<Option<String>>,
}

impl UpdateAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            bio: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> Option<&AuthorName> {
        self.name.as_ref()
    }

    pub fn set_name(&mut self, name: AuthorName) {
        self.name = Some(name);
    }

    pub fn bio(&self) -> Option<Option<&str>> {
        self.bio.as_ref().map(Option::as_deref)
    }

    pub fn set_bio(&mut self, bio: Option<String>) {
        self.bio = Some(bio);
    }
}

#[derive(Debug)]
pub struct CreateBookRequest {
    title: String,
    summary: String,
    publication_date: NaiveDate,
    author_id: Option<i64>,
}

impl CreateBookRequest {
    pub const fn new(
        title: String,
        summary: String,
        publication_date: NaiveDate,
        author_id: Option<i64>,
    ) -> Self {
        Self {
            title,
            summary,
            publication_date,
            author_id,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub const fn publication_date(&self) -> NaiveDate {
        self.publication_date
    }

    pub const fn author_id(&self) -> Option<i64> {
        self.author_id
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("Author with id \"{author_id}\" does not exist")]
    AuthorNotFound { author_id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

/// Partial patch for a book. `author_id` is doubly optional so that a book
/// can be detached from its author (`Some(None)`) without conflating that
/// with an omitted field (`None`).
#[derive(Debug)]
pub struct UpdateBookRequest {
    id: i64,
    title: Option<String>,
    summary: Option<String>,
    publication_date: Option<NaiveDate>,
    author_id: Option<Option<i64>>,
}

impl UpdateBookRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            title: None,
            summary: None,
            publication_date: None,
            author_id: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: String) {
        self.title = Some(title);
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn set_summary(&mut self, summary: String) {
        self.summary = Some(summary);
    }

    pub const fn publication_date(&self) -> Option<NaiveDate> {
        self.publication_date
    }

    pub fn set_publication_date(&mut self, publication_date: NaiveDate) {
        self.publication_date = Some(publication_date);
    }

    pub const fn author_id(&self) -> Option<Option<i64>> {
        self.author_id
    }

    pub fn set_author_id(&mut self, author_id: Option<i64>) {
        self.author_id = Some(author_id);
    }
}

/// Store fault with no business meaning. Absence of an entity is never
/// reported through this type; lookups return `Ok(None)` instead.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct RepositoryError(#[from] pub anyhow::Error);
