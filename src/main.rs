//! DCF 估值后端服务
//!
//! 根据股票代码拉取经营现金流，计算两阶段现金流折现估值
//! 数据来源：Yahoo Finance

mod config;     // 配置加载
mod error;      // 错误类型
mod handlers;   // HTTP 请求处理器
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use std::env;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::LevelFilter;

use crate::config::AppConfig;
use crate::services::cash_flow::YahooCashFlowProvider;
use crate::services::valuation_service::ValuationService;

/// 应用程序入口
///
/// 启动 HTTP 服务器，默认监听 0.0.0.0:5000，端口可由 PORT 环境变量指定
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 先启动日志，加载配置过程中的日志才能输出
    let rust_log_set = env::var_os("RUST_LOG").is_some();
    env_logger::init_from_env(Env::default().default_filter_or("trace"));
    if !rust_log_set {
        log::set_max_level(LevelFilter::Info);
    }

    let config = AppConfig::load();

    // RUST_LOG 优先，未设置时使用配置文件中的级别
    if !rust_log_set {
        match config.log.level_filter() {
            Some(level) => log::set_max_level(level),
            None => log::warn!("日志级别无效: {}，使用 info", config.log.level),
        }
    }

    let provider = YahooCashFlowProvider::new(&config.provider)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let service = web::Data::new(ValuationService::new(
        Arc::new(provider),
        config.valuation.fallback_fcf,
    ));

    let bind_addr = config.bind_addr();
    log::info!("启动 DCF 估值服务，监听 {}", bind_addr);

    // 创建并启动 HTTP 服务器
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(handlers::cors())  // 允许任意来源跨域访问
            .wrap(Logger::default())  // 添加请求日志中间件
            .app_data(service.clone())
            .configure(handlers::config)  // 配置路由
    });

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(bind_addr)?.run().await
}
