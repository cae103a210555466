//! 估值接口处理器
//!
//! - POST /api/analyze - 根据股票代码和估值参数计算 DCF 估值
//!
//! 请求体按原始字节读取后自行解析，非法 JSON 与字段转换失败统一走 `{"error": ...}` 响应

use actix_web::{web, HttpResponse, ResponseError, Result};

use crate::error::ValuationError;
use crate::models::ValuationRequest;
use crate::services::valuation_service::{build_response, ValuationService};

/// 是否使用了兜底现金流
pub const FALLBACK_HEADER: &str = "X-Valuation-Fallback";

/// POST /api/analyze
pub async fn analyze_stock(
    service: web::Data<ValuationService>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let result = match ValuationRequest::from_slice(&body) {
        Ok(request) => service.analyze(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(valuation) => {
            let response = build_response(&valuation);
            Ok(HttpResponse::Ok()
                .insert_header((FALLBACK_HEADER, valuation.used_fallback.to_string()))
                .json(response))
        }
        Err(e) => {
            log_failure(&e);
            Ok(e.error_response())
        }
    }
}

fn log_failure(e: &ValuationError) {
    match e {
        ValuationError::InvalidRequest(msg) => log::error!("估值请求参数无效: {}", msg),
        ValuationError::Upstream(msg) => log::error!("行情数据源失败: {}", msg),
        ValuationError::Computation(msg) => log::error!("估值计算失败: {}", msg),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/analyze", web::post().to(analyze_stock));
}
