use bookshelf::config::Config;
use bookshelf::database::{DefaultAuthorRepository, DefaultBookRepository, establish_pool};
use bookshelf::http::{AppState, HttpServer, HttpServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let pool = establish_pool(config.database_url()).await?;
    let state = AppState::new(
        DefaultAuthorRepository::new(pool.clone()),
        DefaultBookRepository::new(pool),
    );

    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
