use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post, put};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod handler;

pub struct AppState<AR, BR> {
    pub author_repo: Arc<AR>,
    pub book_repo: Arc<BR>,
}

impl<AR, BR> AppState<AR, BR> {
    pub fn new(author_repo: AR, book_repo: BR) -> Self {
        Self {
            author_repo: Arc::new(author_repo),
            book_repo: Arc::new(book_repo),
        }
    }
}

impl<AR, BR> Clone for AppState<AR, BR> {
    fn clone(&self) -> Self {
        Self {
            author_repo: Arc::clone(&self.author_repo),
            book_repo: Arc::clone(&self.book_repo),
        }
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<AR, BR>(
        state: AppState<AR, BR>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self>
    where
        AR: AuthorRepository,
        BR: BookRepository,
    {
        let router = app(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router)
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

/// Full application router; tests mount this directly.
pub fn app<AR, BR>(state: AppState<AR, BR>) -> Router
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    Router::new()
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes<AR, BR>() -> Router<AppState<AR, BR>>
where
    AR: AuthorRepository,
    BR: BookRepository,
{
    Router::new()
        .route(
            "/authors/",
            post(handler::create_author).get(handler::list_authors),
        )
        .route(
            "/authors/{id}/",
            get(handler::get_author)
                .put(handler::update_author)
                .delete(handler::delete_author),
        )
        .route(
            "/books/",
            post(handler::create_book).get(handler::list_books),
        )
        .route("/books/author/{id}/", get(handler::list_books_by_author))
        .route(
            "/books/{id}/",
            put(handler::update_book).delete(handler::delete_book),
        )
}
