//! Inkflow - AI 辅助长篇小说创作服务
//!
//! - Domain: novel/, document/
//! - Application: commands, queries, ports, generation
//! - Infrastructure: http, memory, persistence, adapters, events

use std::sync::Arc;

use inkflow::application::GenerationContext;
use inkflow::config::{load_config, print_config, AppConfig};
use inkflow::domain::document::DocumentParser;
use inkflow::infrastructure::adapters::llm::ProviderRouter;
use inkflow::infrastructure::events::EventPublisher;
use inkflow::infrastructure::http::{AppState, HttpServer, ServerConfig};
use inkflow::infrastructure::memory::{InMemoryGenerationSlots, InMemorySessionStore};
use inkflow::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteSessionRepository,
};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},inkflow={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Inkflow - AI 辅助小说创作服务");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 事件发布器与会话存储（启动时从 SQLite 加载全部会话）
    let event_publisher = EventPublisher::new().arc();
    let session_repo = Arc::new(SqliteSessionRepository::new(pool.clone()));
    let store = InMemorySessionStore::new(event_publisher.clone())
        .with_repository(session_repo)
        .arc();
    store.load().await?;

    let slots = InMemoryGenerationSlots::new().arc();

    // 模型服务（按会话配置选择 Gemini / OpenAI 兼容接口）
    let provider = ProviderRouter::new(&config.llm.client_config())?.arc();

    let parser = Arc::new(DocumentParser::new(config.document.clone()));
    let ctx = GenerationContext::new(
        provider,
        store,
        slots,
        event_publisher.clone(),
        parser,
        config.generation.policy(),
    );

    let state = Arc::new(AppState::new(ctx, event_publisher));
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
