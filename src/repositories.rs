use crate::models::{
    Author, AuthorName, Book, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, RepositoryError, UpdateAuthorRequest, UpdateBookRequest,
};
use async_trait::async_trait;

#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError>;

    async fn find_author(&self, id: i64) -> Result<Option<Author>, RepositoryError>;

    async fn find_author_by_name(
        &self,
        name: &AuthorName,
    ) -> Result<Option<Author>, RepositoryError>;

    async fn find_all_authors(&self) -> Result<Vec<Author>, RepositoryError>;

    /// Applies only the fields set on the request. Returns `None` when no
    /// author with the given id exists.
    async fn update_author(
        &self,
        req: &UpdateAuthorRequest,
    ) -> Result<Option<Author>, RepositoryError>;

    /// Deletes in one statement and returns the removed row, or `None` when
    /// nothing matched.
    async fn delete_author(&self, id: i64) -> Result<Option<Author>, RepositoryError>;
}

#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError>;

    async fn find_book(&self, id: i64) -> Result<Option<Book>, RepositoryError>;

    async fn find_all_books(&self) -> Result<Vec<Book>, RepositoryError>;

    async fn find_books_by_author(&self, author_id: i64) -> Result<Vec<Book>, RepositoryError>;

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Option<Book>, RepositoryError>;

    async fn delete_book(&self, id: i64) -> Result<Option<Book>, RepositoryError>;
}
