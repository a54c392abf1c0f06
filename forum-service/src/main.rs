use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forum_service::{
    http, AccountRepository, AccountService, ForumConfig, InMemoryAccountRepository,
    MySqlAccountRepository,
};

/// Log filter used when `RUST_LOG` is unset; covers every workspace crate.
const DEFAULT_LOG_FILTER: &str = "forum_service=info,auth=info,db=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ForumConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting forum service v{}", config.version);

    if config.use_in_memory_store {
        tracing::warn!("Using in-memory account store; accounts are lost on restart");
        serve(InMemoryAccountRepository::new(), &config).await
    } else {
        let pool = db::create_pool(&config.db).await?;
        db::health_check(&pool).await?;
        db::ensure_schema(&pool).await?;
        serve(MySqlAccountRepository::new(pool), &config).await
    }
}

async fn serve<R>(repository: R, config: &ForumConfig) -> anyhow::Result<()>
where
    R: AccountRepository + 'static,
{
    let service = AccountService::new(repository, &config.jwt, config.password_hasher()?)?;

    if let Some(admin) = &config.admin {
        service
            .bootstrap_admin(&admin.username, &admin.email, &admin.password)
            .await
            .context("failed to create admin account")?;
    }

    let app = http::router(Arc::new(service));

    let listener = TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
