use crate::models::{
    Author, AuthorName, Book, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, RepositoryError, UpdateAuthorRequest, UpdateBookRequest,
};
use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::str::FromStr;

static MIGRATOR: Migrator = sqlx::migrate!();

/// Every book read goes through this join so the author comes back eagerly.
const BOOK_SELECT: &str = "SELECT b.id, b.title, b.summary, b.publication_date, b.author_id, \
     a.name AS author_name, a.bio AS author_bio \
     FROM book b LEFT JOIN author a ON a.id = b.author_id";

pub async fn establish_pool(path: &str) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path {path}"))?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePool::connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {path}"))?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

#[derive(Debug)]
pub struct DefaultAuthorRepository {
    pool: SqlitePool,
}

impl DefaultAuthorRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug)]
pub struct DefaultBookRepository {
    pool: SqlitePool,
}

impl DefaultBookRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let bio = row.try_get("bio")?;

        Ok(Self::new(id, AuthorName::new_unchecked(&name), bio))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let title = row.try_get("title")?;
        let summary = row.try_get("summary")?;
        let publication_date = row.try_get("publication_date")?;
        let author_id: Option<i64> = row.try_get("author_id")?;
        let author_name: Option<String> = row.try_get("author_name")?;

        let author = match (author_id, author_name) {
            (Some(author_id), Some(name)) => {
                let bio = row.try_get("author_bio")?;
                Some(Author::new(author_id, AuthorName::new_unchecked(&name), bio))
            }
            _ => None,
        };

        Ok(Self::new(id, title, summary, publication_date, author_id, author))
    }
}

#[async_trait]
impl AuthorRepository for DefaultAuthorRepository {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let author =
            sqlx::query_as("INSERT INTO author (name, bio) VALUES (?, ?) RETURNING id, name, bio")
                .bind(req.name().to_string())
                .bind(req.bio())
                .fetch_one(&self.pool)
                .await
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        CreateAuthorError::Duplicate {
                            name: req.name().to_string(),
                        }
                    } else {
                        let err = anyhow!(err).context(format!(
                            r#"Failed to create author with name "{}""#,
                            req.name()
                        ));
                        CreateAuthorError::Other(err)
                    }
                })?;

        Ok(author)
    }

    async fn find_author(&self, id: i64) -> Result<Option<Author>, RepositoryError> {
        let author = sqlx::query_as("SELECT id, name, bio FROM author WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to retrieve author with id "{id}""#))
            })?;

        Ok(author)
    }

    async fn find_author_by_name(
        &self,
        name: &AuthorName,
    ) -> Result<Option<Author>, RepositoryError> {
        let author = sqlx::query_as("SELECT id, name, bio FROM author WHERE name = ?")
            .bind(name.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to retrieve author with name "{name}""#))
            })?;

        Ok(author)
    }

    async fn find_all_authors(&self) -> Result<Vec<Author>, RepositoryError> {
        let authors = sqlx::query_as("SELECT id, name, bio FROM author")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| anyhow!(err).context("Failed to retrieve all authors"))?;

        Ok(authors)
    }

    async fn update_author(
        &self,
        req: &UpdateAuthorRequest,
    ) -> Result<Option<Author>, RepositoryError> {
        let mut parts = Vec::new();
        if req.name().is_some() {
            parts.push("name = ?");
        }
        if req.bio().is_some() {
            parts.push("bio = ?");
        }

        // An empty patch changes nothing; it degenerates to a lookup.
        if parts.is_empty() {
            return self.find_author(req.id()).await;
        }

        let sql = format!(
            "UPDATE author SET {} WHERE id = ? RETURNING id, name, bio",
            parts.join(", ")
        );
        let mut query = sqlx::query_as(&sql);
        if let Some(name) = req.name() {
            query = query.bind(name.to_string());
        }
        if let Some(bio) = req.bio() {
            query = query.bind(bio.map(str::to_string));
        }

        let author = query
            .bind(req.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(
                    r#"Failed to update author with id "{}""#,
                    req.id()
                ))
            })?;

        Ok(author)
    }

    async fn delete_author(&self, id: i64) -> Result<Option<Author>, RepositoryError> {
        let author = sqlx::query_as("DELETE FROM author WHERE id = ? RETURNING id, name, bio")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to delete author with id "{id}""#))
            })?;

        Ok(author)
    }
}

#[async_trait]
impl BookRepository for DefaultBookRepository {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO book (title, summary, publication_date, author_id) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(req.title())
        .bind(req.summary())
        .bind(req.publication_date())
        .bind(req.author_id())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match req.author_id() {
            Some(author_id) if is_foreign_key_violation(&err) => {
                CreateBookError::AuthorNotFound { author_id }
            }
            _ => {
                let err = anyhow!(err).context(format!(
                    r#"Failed to create book with title "{}""#,
                    req.title()
                ));
                CreateBookError::Other(err)
            }
        })?;

        let book = self
            .find_book(id)
            .await
            .map_err(|RepositoryError(err)| CreateBookError::Other(err))?
            .with_context(|| format!(r#"Book with id "{id}" missing immediately after insert"#))
            .map_err(CreateBookError::Other)?;

        Ok(book)
    }

    async fn find_book(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
        let book = sqlx::query_as(&format!("{BOOK_SELECT} WHERE b.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to retrieve book with id "{id}""#))
            })?;

        Ok(book)
    }

    async fn find_all_books(&self) -> Result<Vec<Book>, RepositoryError> {
        let books = sqlx::query_as(BOOK_SELECT)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| anyhow!(err).context("Failed to retrieve all books"))?;

        Ok(books)
    }

    async fn find_books_by_author(&self, author_id: i64) -> Result<Vec<Book>, RepositoryError> {
        let books = sqlx::query_as(&format!("{BOOK_SELECT} WHERE b.author_id = ?"))
            .bind(author_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(
                    r#"Failed to retrieve books for author with id "{author_id}""#
                ))
            })?;

        Ok(books)
    }

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Option<Book>, RepositoryError> {
        let mut parts = Vec::new();
        if req.title().is_some() {
            parts.push("title = ?");
        }
        if req.summary().is_some() {
            parts.push("summary = ?");
        }
        if req.publication_date().is_some() {
            parts.push("publication_date = ?");
        }
        if req.author_id().is_some() {
            parts.push("author_id = ?");
        }

        if parts.is_empty() {
            return self.find_book(req.id()).await;
        }

        let sql = format!(
            "UPDATE book SET {} WHERE id = ? RETURNING id",
            parts.join(", ")
        );
        let mut query = sqlx::query_scalar(&sql);
        if let Some(title) = req.title() {
            query = query.bind(title.to_string());
        }
        if let Some(summary) = req.summary() {
            query = query.bind(summary.to_string());
        }
        if let Some(publication_date) = req.publication_date() {
            query = query.bind(publication_date);
        }
        if let Some(author_id) = req.author_id() {
            query = query.bind(author_id);
        }

        let id: Option<i64> = query
            .bind(req.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to update book with id "{}""#, req.id()))
            })?;

        match id {
            Some(id) => self.find_book(id).await,
            None => Ok(None),
        }
    }

    async fn delete_book(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query(
            "DELETE FROM book WHERE id = ? \
             RETURNING id, title, summary, publication_date, author_id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| anyhow!(err).context(format!(r#"Failed to delete book with id "{id}""#)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let book = deleted_book_from_row(&row)
            .map_err(|err| anyhow!(err).context(format!(r#"Failed to decode deleted book "{id}""#)))?;

        // The author row outlives the book; re-attach it for the response.
        let author = match book.author_id() {
            Some(author_id) => {
                sqlx::query_as("SELECT id, name, bio FROM author WHERE id = ?")
                    .bind(author_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|err| {
                        anyhow!(err).context(format!(
                            r#"Failed to retrieve author with id "{author_id}""#
                        ))
                    })?
            }
            None => None,
        };

        Ok(Some(Book::new(
            book.id(),
            book.title().to_string(),
            book.summary().to_string(),
            book.publication_date(),
            book.author_id(),
            author,
        )))
    }
}

fn deleted_book_from_row(row: &SqliteRow) -> Result<Book, sqlx::Error> {
    Ok(Book::new(
        row.try_get("id")?,
        row.try_get("title")?,
        row.try_get("summary")?,
        row.try_get("publication_date")?,
        row.try_get("author_id")?,
        None,
    ))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_foreign_key_violation();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .unwrap();
        MIGRATOR.run(&pool).await.unwrap();
        pool
    }

    fn create_author_req(name: &str, bio: Option<&str>) -> CreateAuthorRequest {
        CreateAuthorRequest::new(
            AuthorName::new(name).unwrap(),
            bio.map(str::to_string),
        )
    }

    fn create_book_req(title: &str, author_id: Option<i64>) -> CreateBookRequest {
        CreateBookRequest::new(
            title.to_string(),
            "a summary".to_string(),
            NaiveDate::from_ymd_opt(1843, 1, 1).unwrap(),
            author_id,
        )
    }

    #[tokio::test]
    async fn created_author_gets_generated_id_and_keeps_fields() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);

        let author = repo
            .create_author(&create_author_req("Ada", Some("mathematician")))
            .await
            .unwrap();

        assert_eq!(author.id(), 1);
        assert_eq!(author.name().to_string(), "Ada");
        assert_eq!(author.bio(), Some("mathematician"));
    }

    #[tokio::test]
    async fn duplicate_author_name_is_rejected_by_the_store() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);
        repo.create_author(&create_author_req("Ada", None))
            .await
            .unwrap();

        let err = repo
            .create_author(&create_author_req("Ada", Some("someone else")))
            .await
            .unwrap_err();

        assert!(matches!(err, CreateAuthorError::Duplicate { name } if name == "Ada"));
        assert_eq!(repo.find_all_authors().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_author_by_name_returns_exact_match_or_none() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);
        repo.create_author(&create_author_req("Ada", None))
            .await
            .unwrap();

        let found = repo
            .find_author_by_name(&AuthorName::new("Ada").unwrap())
            .await
            .unwrap();
        assert_eq!(found.unwrap().id(), 1);

        let missing = repo
            .find_author_by_name(&AuthorName::new("Grace").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_author_touches_only_set_fields() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);
        repo.create_author(&create_author_req("Ada", Some("mathematician")))
            .await
            .unwrap();

        let mut req = UpdateAuthorRequest::new(1);
        req.set_bio(Some("analyst".to_string()));
        let updated = repo.update_author(&req).await.unwrap().unwrap();

        assert_eq!(updated.name().to_string(), "Ada");
        assert_eq!(updated.bio(), Some("analyst"));
    }

    #[tokio::test]
    async fn update_author_can_clear_bio_with_explicit_null() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);
        repo.create_author(&create_author_req("Ada", Some("mathematician")))
            .await
            .unwrap();

        let mut req = UpdateAuthorRequest::new(1);
        req.set_bio(None);
        let updated = repo.update_author(&req).await.unwrap().unwrap();

        assert_eq!(updated.bio(), None);
        assert_eq!(updated.name().to_string(), "Ada");
    }

    #[tokio::test]
    async fn empty_author_patch_returns_current_row_unchanged() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);
        repo.create_author(&create_author_req("Ada", Some("mathematician")))
            .await
            .unwrap();

        let updated = repo
            .update_author(&UpdateAuthorRequest::new(1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name().to_string(), "Ada");
        assert_eq!(updated.bio(), Some("mathematician"));
    }

    #[tokio::test]
    async fn updating_missing_author_returns_none_and_changes_nothing() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);

        let mut req = UpdateAuthorRequest::new(42);
        req.set_name(AuthorName::new("Ghost").unwrap());
        assert!(repo.update_author(&req).await.unwrap().is_none());
        assert!(repo.find_all_authors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_author_returns_removed_row_exactly_once() {
        let repo = DefaultAuthorRepository::new(memory_pool().await);
        repo.create_author(&create_author_req("Ada", None))
            .await
            .unwrap();

        let deleted = repo.delete_author(1).await.unwrap().unwrap();
        assert_eq!(deleted.name().to_string(), "Ada");

        assert!(repo.find_author(1).await.unwrap().is_none());
        assert!(repo.delete_author(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_book_with_unknown_author_is_rejected_and_not_persisted() {
        let pool = memory_pool().await;
        let books = DefaultBookRepository::new(pool);

        let err = books
            .create_book(&create_book_req("Notes", Some(99)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CreateBookError::AuthorNotFound { author_id: 99 }
        ));
        assert!(books.find_all_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_book_reads_back_with_joined_author() {
        let pool = memory_pool().await;
        let authors = DefaultAuthorRepository::new(pool.clone());
        let books = DefaultBookRepository::new(pool);

        authors
            .create_author(&create_author_req("Ada", None))
            .await
            .unwrap();
        let book = books
            .create_book(&create_book_req("Notes", Some(1)))
            .await
            .unwrap();

        assert_eq!(book.id(), 1);
        assert_eq!(book.author_id(), Some(1));
        assert_eq!(book.author().unwrap().name().to_string(), "Ada");
    }

    #[tokio::test]
    async fn book_without_author_reads_back_authorless() {
        let books = DefaultBookRepository::new(memory_pool().await);

        let book = books
            .create_book(&create_book_req("Anonymous", None))
            .await
            .unwrap();

        assert_eq!(book.author_id(), None);
        assert!(book.author().is_none());
    }

    #[tokio::test]
    async fn books_by_author_filters_on_author_id() {
        let pool = memory_pool().await;
        let authors = DefaultAuthorRepository::new(pool.clone());
        let books = DefaultBookRepository::new(pool);

        authors
            .create_author(&create_author_req("Ada", None))
            .await
            .unwrap();
        authors
            .create_author(&create_author_req("Grace", None))
            .await
            .unwrap();
        books
            .create_book(&create_book_req("Notes", Some(1)))
            .await
            .unwrap();
        books
            .create_book(&create_book_req("Compilers", Some(2)))
            .await
            .unwrap();

        let adas = books.find_books_by_author(1).await.unwrap();
        assert_eq!(adas.len(), 1);
        assert_eq!(adas[0].title(), "Notes");

        assert!(books.find_books_by_author(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_book_can_detach_author_with_explicit_null() {
        let pool = memory_pool().await;
        let authors = DefaultAuthorRepository::new(pool.clone());
        let books = DefaultBookRepository::new(pool);

        authors
            .create_author(&create_author_req("Ada", None))
            .await
            .unwrap();
        books
            .create_book(&create_book_req("Notes", Some(1)))
            .await
            .unwrap();

        let mut req = UpdateBookRequest::new(1);
        req.set_author_id(None);
        let updated = books.update_book(&req).await.unwrap().unwrap();

        assert_eq!(updated.author_id(), None);
        assert!(updated.author().is_none());
        assert_eq!(updated.title(), "Notes");
    }

    #[tokio::test]
    async fn update_book_patches_only_set_fields() {
        let books = DefaultBookRepository::new(memory_pool().await);
        books
            .create_book(&create_book_req("Notes", None))
            .await
            .unwrap();

        let mut req = UpdateBookRequest::new(1);
        req.set_title("Notes, revised".to_string());
        let updated = books.update_book(&req).await.unwrap().unwrap();

        assert_eq!(updated.title(), "Notes, revised");
        assert_eq!(updated.summary(), "a summary");
        assert_eq!(
            updated.publication_date(),
            NaiveDate::from_ymd_opt(1843, 1, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn deleting_author_detaches_their_books() {
        let pool = memory_pool().await;
        let authors = DefaultAuthorRepository::new(pool.clone());
        let books = DefaultBookRepository::new(pool);

        authors
            .create_author(&create_author_req("Ada", None))
            .await
            .unwrap();
        books
            .create_book(&create_book_req("Notes", Some(1)))
            .await
            .unwrap();

        authors.delete_author(1).await.unwrap().unwrap();

        // ON DELETE SET NULL: the book survives without an author.
        let book = books.find_book(1).await.unwrap().unwrap();
        assert_eq!(book.author_id(), None);
        assert!(book.author().is_none());
    }

    #[tokio::test]
    async fn delete_book_returns_removed_row_with_author_attached() {
        let pool = memory_pool().await;
        let authors = DefaultAuthorRepository::new(pool.clone());
        let books = DefaultBookRepository::new(pool);

        authors
            .create_author(&create_author_req("Ada", None))
            .await
            .unwrap();
        books
            .create_book(&create_book_req("Notes", Some(1)))
            .await
            .unwrap();

        let deleted = books.delete_book(1).await.unwrap().unwrap();
        assert_eq!(deleted.title(), "Notes");
        assert_eq!(deleted.author().unwrap().name().to_string(), "Ada");

        assert!(books.find_book(1).await.unwrap().is_none());
        assert!(books.delete_book(1).await.unwrap().is_none());
    }
}
