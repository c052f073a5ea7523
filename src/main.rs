use anyhow::Result;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use class_sniper::{logger, App, Config};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            // 配置读取失败时日志可能尚未初始化
            logger::init(false);
            error!("❌ 运行失败: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logger::init(config.verbose_logging);

    // Ctrl-C 取消当前运行
    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，正在停止...");
            signal.cancel();
        }
    });

    // 初始化并运行应用
    let report = App::initialize(config).await?.run(cancel).await?;

    if report.is_aborted() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
