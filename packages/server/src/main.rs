use std::net::SocketAddr;
use std::sync::Arc;

use common::kv::{RedisSessionStore, SessionStore};
use common::mq::{MqConfig, init_mq};
use common::storage::{MemoryObjectStore, ObjectStore, S3Config, S3ObjectStore};
use tracing::{Level, info};

use server::config::AppConfig;
use server::state::AppState;
use server::{database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = database::init_db(&config.database.url).await?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_indexes(&db).await?;

    let store: Arc<dyn ObjectStore> = match config.storage.provider.as_str() {
        "s3" => Arc::new(S3ObjectStore::new(&S3Config {
            bucket: config.storage.bucket.clone(),
            region: config.storage.region.clone(),
            endpoint: config.storage.endpoint.clone(),
            access_key: config.storage.access_key.clone(),
            secret_key: config.storage.secret_key.clone(),
            path_style: config.storage.path_style,
        })?),
        "memory" => {
            info!("Using in-memory object store; uploads will not survive a restart");
            Arc::new(MemoryObjectStore::new())
        }
        other => anyhow::bail!("unknown storage provider: {other}"),
    };

    let sessions: Arc<dyn SessionStore> =
        Arc::new(RedisSessionStore::connect(&config.session.url).await?);

    let mq = if config.mq.enabled {
        let queue = init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await?;
        Some(Arc::new(queue))
    } else {
        info!("MQ disabled; thumbnail jobs will not be published");
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        db,
        config,
        store,
        sessions,
        mq,
    };
    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
