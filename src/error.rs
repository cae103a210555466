//! 估值错误类型
//!
//! 所有不可恢复的错误统一返回 500 和 `{"error": "..."}`

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Debug, Error)]
pub enum ValuationError {
    /// 请求体或字段无法转换
    #[error("{0}")]
    InvalidRequest(String),
    /// 行情数据源失败（正常流程中会被兜底值吸收）
    #[error("{0}")]
    Upstream(String),
    /// 计算失败，例如除零或数值溢出
    #[error("{0}")]
    Computation(String),
}

impl ValuationError {
    pub fn division_by_zero() -> Self {
        Self::Computation("float division by zero".to_string())
    }

    pub fn out_of_range() -> Self {
        Self::Computation("numerical result out of range".to_string())
    }
}

impl ResponseError for ValuationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
