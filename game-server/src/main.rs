use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use game_server::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("game_server=debug".parse()?))
        .init();

    let config = ServerConfig::from_env(std::env::args().nth(1))?;
    info!(addr = %config.network.addr(), "对战服务端启动中...");

    game_server::run(config).await
}
