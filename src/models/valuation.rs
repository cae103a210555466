//! 估值数据模型
//!
//! 请求参数在这里做类型转换：缺失的字段取默认值，存在但无法转换的字段直接报错

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValuationError;

pub const DEFAULT_GROWTH_RATE: f64 = 10.0;
pub const DEFAULT_DISCOUNT_RATE: f64 = 8.0;
pub const DEFAULT_TERMINAL_GROWTH_RATE: f64 = 2.0;
pub const DEFAULT_YEARS: i64 = 5;

/// 估值请求参数（百分比形式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRequest {
    /// 股票代码（已转大写，可能为空）
    pub ticker: String,
    /// 预测期增长率（%）
    pub growth_rate: f64,
    /// 折现率（%）
    pub discount_rate: f64,
    /// 永续增长率（%）
    pub terminal_growth_rate: f64,
    /// 预测年数
    pub years: i64,
}

impl Default for ValuationRequest {
    fn default() -> Self {
        Self {
            ticker: String::new(),
            growth_rate: DEFAULT_GROWTH_RATE,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            terminal_growth_rate: DEFAULT_TERMINAL_GROWTH_RATE,
            years: DEFAULT_YEARS,
        }
    }
}

impl ValuationRequest {
    /// 从原始请求体解析
    pub fn from_slice(body: &[u8]) -> Result<Self, ValuationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValuationError::InvalidRequest(format!("invalid JSON body: {}", e)))?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self, ValuationError> {
        let obj = value.as_object().ok_or_else(|| {
            ValuationError::InvalidRequest(format!(
                "request body must be a JSON object, not {}",
                json_kind(value)
            ))
        })?;

        Ok(Self {
            ticker: ticker_field(obj)?,
            growth_rate: float_field(obj, "growth_rate", DEFAULT_GROWTH_RATE)?,
            discount_rate: float_field(obj, "discount_rate", DEFAULT_DISCOUNT_RATE)?,
            terminal_growth_rate: float_field(
                obj,
                "terminal_growth_rate",
                DEFAULT_TERMINAL_GROWTH_RATE,
            )?,
            years: int_field(obj, "years", DEFAULT_YEARS)?,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn ticker_field(obj: &Map<String, Value>) -> Result<String, ValuationError> {
    match obj.get("ticker") {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.to_uppercase()),
        Some(other) => Err(ValuationError::InvalidRequest(format!(
            "ticker must be a string, not {}",
            json_kind(other)
        ))),
    }
}

fn float_field(obj: &Map<String, Value>, name: &str, default: f64) -> Result<f64, ValuationError> {
    match obj.get(name) {
        None => Ok(default),
        Some(value) => coerce_float(value).map_err(|msg| {
            ValuationError::InvalidRequest(format!("{}: {}", name, msg))
        }),
    }
}

fn int_field(obj: &Map<String, Value>, name: &str, default: i64) -> Result<i64, ValuationError> {
    match obj.get(name) {
        None => Ok(default),
        Some(value) => coerce_int(value).map_err(|msg| {
            ValuationError::InvalidRequest(format!("{}: {}", name, msg))
        }),
    }
}

/// 数字原样返回，字符串按浮点数解析，布尔转 1/0
pub fn coerce_float(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("could not convert number to float: {}", n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("could not convert string to float: '{}'", s)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(format!(
            "float() argument must be a string or a number, not {}",
            json_kind(other)
        )),
    }
}

/// 整数原样返回，浮点数向零截断，字符串必须是十进制整数
pub fn coerce_int(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            let f = n.as_f64().unwrap_or(f64::NAN);
            if !f.is_finite() || f.trunc() < i64::MIN as f64 || f.trunc() >= i64::MAX as f64 {
                return Err(format!("cannot convert float {} to integer", n));
            }
            Ok(f.trunc() as i64)
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid literal for int() with base 10: '{}'", s)),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(format!(
            "int() argument must be a string or a number, not {}",
            json_kind(other)
        )),
    }
}

/// 单次估值计算结果
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationResult {
    /// 估值总额
    pub total_value: f64,
    /// 预测期折现和
    pub dcf_value: f64,
    /// 折现后的终值
    pub terminal_value: f64,
    /// 计算使用的基准自由现金流
    pub baseline_fcf: f64,
    /// 是否使用了兜底现金流
    pub used_fallback: bool,
}

/// `POST /api/analyze` 的成功响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub problem_it_solves: String,
    pub customer_base_size: String,
    pub moat_strength: String,
    pub operational_efficiency: String,
    pub dcf_valuation: String,
    pub ai_opportunities: String,
}
