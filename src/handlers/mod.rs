pub mod analyze;
pub mod health;

use actix_cors::Cors;
use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(health::config)
            .configure(analyze::config)
    );
}

/// 跨域配置：允许任意来源，并让前端可以读取兜底标记头
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .expose_headers([analyze::FALLBACK_HEADER])
}
