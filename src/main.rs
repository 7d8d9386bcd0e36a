use anyhow::Result;
use lecture_monitor::{cancel_pair, logger, App, Config};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::load()?;

    // Ctrl+C 时停止在下一个等待点
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在停止...");
            handle.cancel();
        }
    });

    // 初始化并运行应用
    let _summary = App::initialize(config).await?.run(&signal).await?;

    Ok(())
}
