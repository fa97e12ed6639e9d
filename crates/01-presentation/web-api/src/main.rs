//! Web API 入口

use clap::Parser;
use config_impl::{JsonConfigProvider, TomlConfigProvider};
use infrastructure_composition::{Host, LoggingConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "web-api")]
#[command(about = "Lorn Basics 示例 Web API", version)]
struct Args {
    /// 配置文件路径，`.toml` 以外按 JSON 解析，不存在时忽略
    #[arg(short, long, default_value = "appsettings.json")]
    config: PathBuf,

    /// 监听地址
    #[arg(short, long, default_value = "127.0.0.1:5000", env = "WEB_API_LISTEN")]
    listen: SocketAddr,

    /// 环境变量前缀，如 `WEBAPI_AppSettings__Version=2.0`
    #[arg(long, default_value = "WEBAPI_")]
    env_prefix: String,

    /// 是否启用配置热重载
    #[arg(long)]
    hot_reload: bool,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 输出 JSON 格式日志
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = if args.json_logs {
        LoggingConfig::production()
    } else {
        LoggingConfig::development()
    }
    .with_level(&args.log_level);

    let is_toml = args
        .config
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("toml"));
    let builder = if is_toml {
        Host::builder().add_provider(TomlConfigProvider::optional(&args.config)?)
    } else {
        Host::builder().add_provider(JsonConfigProvider::optional(&args.config)?)
    };

    let builder = builder
        .add_env_vars(&args.env_prefix)
        .enable_hot_reload(args.hot_reload)
        .with_logging(logging);

    let host = web_api::configure(builder).build().await?;
    info!("配置文件: {}", args.config.display());

    host.start().await?;
    let listener = TcpListener::bind(args.listen).await?;
    let served = host.serve(listener, shutdown_signal()).await;
    host.stop().await?;
    served?;

    info!("应用已关闭");
    Ok(())
}

/// 等待 Ctrl-C
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("收到退出信号，正在关闭应用"),
        Err(e) => error!("监听退出信号失败: {}", e),
    }
}
