use crate::http::AppState;
use crate::models::{
    Author, AuthorName, AuthorNameEmptyError, Book, CreateAuthorError, CreateAuthorRequest,
    CreateBookError, CreateBookRequest, RepositoryError, UpdateAuthorRequest, UpdateBookRequest,
};
use crate::repositories::{AuthorRepository, BookRepository};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<ApiResponse<T>>);

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self(status, Json(ApiResponse::new(status, data)))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    status_code: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    const fn new(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    InternalServerError(String),
    NotFound(String),
    BadRequest(String),
    UnprocessableEntity(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg) = match self {
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        (status, Json(ApiResponse::new(status, msg))).into_response()
    }
}

impl From<AuthorNameEmptyError> for ApiError {
    fn from(err: AuthorNameEmptyError) -> Self {
        Self::UnprocessableEntity(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        tracing::error!("{:#}", err.0);
        Self::InternalServerError("Internal server error".to_string())
    }
}

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        match err {
            CreateAuthorError::Duplicate { .. } => {
                Self::BadRequest("Author already exists".to_string())
            }
            CreateAuthorError::Other(cause) => {
                tracing::error!("{cause:#}");
                Self::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

impl From<CreateBookError> for ApiError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::AuthorNotFound { .. } => {
                Self::NotFound("Author not found".to_string())
            }
            CreateBookError::Other(cause) => {
                tracing::error!("{cause:#}");
                Self::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

/// Distinguishes an omitted field from one explicitly set to null: wrap in
/// `Option<Option<T>>` with `#[serde(default)]` so that omitted stays `None`
/// while a present key (null or not) becomes `Some(..)`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct CreateAuthorHttpRequest {
    name: String,
    bio: String,
}

impl TryFrom<CreateAuthorHttpRequest> for CreateAuthorRequest {
    type Error = AuthorNameEmptyError;

    fn try_from(value: CreateAuthorHttpRequest) -> Result<Self, Self::Error> {
        let name = AuthorName::new(&value.name)?;
        Ok(Self::new(name, Some(value.bio)))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAuthorHttpRequest {
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    bio: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct AuthorHttpResponse {
    id: i64,
    name: String,
    bio: Option<String>,
}

impl From<Author> for AuthorHttpResponse {
    fn from(value: Author) -> Self {
        Self {
            id: value.id(),
            name: value.name().to_string(),
            bio: value.bio().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookHttpRequest {
    title: String,
    summary: String,
    publication_date: NaiveDate,
    author_id: i64,
}

impl From<CreateBookHttpRequest> for CreateBookRequest {
    fn from(value: CreateBookHttpRequest) -> Self {
        Self::new(
            value.title,
            value.summary,
            value.publication_date,
            Some(value.author_id),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookHttpRequest {
    title: Option<String>,
    summary: Option<String>,
    publication_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    author_id: Option<Option<i64>>,
}

#[derive(Debug, Serialize)]
pub struct BookHttpResponse {
    id: i64,
    title: String,
    summary: String,
    publication_date: NaiveDate,
    author_id: Option<i64>,
    author: Option<AuthorHttpResponse>,
}

impl From<Book> for BookHttpResponse {
    fn from(value: Book) -> Self {
        Self {
            id: value.id(),
            title: value.title().to_string(),
            summary: value.summary().to_string(),
            publication_date: value.publication_date(),
            author_id: value.author_id(),
            author: value.author().cloned().map(Into::into),
        }
    }
}

pub async fn create_author<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Json(body): Json<CreateAuthorHttpRequest>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let req = body.try_into()?;
    let author = state.author_repo.create_author(&req).await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn list_authors<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Query(pagination): Query<Pagination>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let authors = state.author_repo.find_all_authors().await?;
    let page = authors
        .into_iter()
        .skip(pagination.skip)
        .take(pagination.limit)
        .map(Into::into)
        .collect();
    Ok(ApiSuccess::new(StatusCode::OK, page))
}

pub async fn get_author<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<i64>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let author = state
        .author_repo
        .find_author(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Author not found".to_string()))?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn update_author<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAuthorHttpRequest>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let mut req = UpdateAuthorRequest::new(id);
    if let Some(name) = &body.name {
        req.set_name(AuthorName::new(name)?);
    }
    if let Some(bio) = body.bio {
        req.set_bio(bio);
    }

    let author = state
        .author_repo
        .update_author(&req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Author not found".to_string()))?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn delete_author<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<i64>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let author = state
        .author_repo
        .delete_author(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Author not found".to_string()))?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn create_book<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Json(body): Json<CreateBookHttpRequest>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let req = body.into();
    let book = state.book_repo.create_book(&req).await?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn list_books<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Query(pagination): Query<Pagination>,
) -> Result<ApiSuccess<Vec<BookHttpResponse>>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let books = state.book_repo.find_all_books().await?;
    let page = books
        .into_iter()
        .skip(pagination.skip)
        .take(pagination.limit)
        .map(Into::into)
        .collect();
    Ok(ApiSuccess::new(StatusCode::OK, page))
}

/// An unknown author and an author with an empty shelf both come back 404;
/// the store does not distinguish them here.
pub async fn list_books_by_author<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<i64>,
) -> Result<ApiSuccess<Vec<BookHttpResponse>>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let books = state.book_repo.find_books_by_author(id).await?;
    if books.is_empty() {
        return Err(ApiError::NotFound(
            "No books found for this author".to_string(),
        ));
    }
    Ok(ApiSuccess::new(
        StatusCode::OK,
        books.into_iter().map(Into::into).collect(),
    ))
}

pub async fn update_book<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBookHttpRequest>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let mut req = UpdateBookRequest::new(id);
    if let Some(title) = body.title {
        req.set_title(title);
    }
    if let Some(summary) = body.summary {
        req.set_summary(summary);
    }
    if let Some(publication_date) = body.publication_date {
        req.set_publication_date(publication_date);
    }
    if let Some(author_id) = body.author_id {
        req.set_author_id(author_id);
    }

    let book = state
        .book_repo
        .update_book(&req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn delete_book<AR, BR>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<i64>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    let book = state
        .book_repo
        .delete_book(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}
