//! # Federated Auth 主程序
//!
//! 加载配置、初始化日志和数据库，启动 HTTP 服务

use std::sync::Arc;

use federated_auth::{
    Result,
    api::run_server,
    app::AppContext,
    config::ConfigManager,
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            "服务启动失败",
            error = ?e
        );
        std::process::exit(1);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
}

async fn run() -> Result<()> {
    let config_manager = match ConfigManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            // 配置无效时仍需要日志输出错误原因
            logging::init_logging(std::env::var("LOG_LEVEL").ok().as_deref());
            return Err(e);
        }
    };
    let config = config_manager.config();
    logging::init_logging(config.log_level.as_deref());

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动",
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.bind_address(),
        config_file = ?config_manager.source()
    );

    let context = Arc::new(AppContext::build(config).await?);
    run_server(context).await
}
