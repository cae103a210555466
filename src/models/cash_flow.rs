//! 现金流数据模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 单个财报期的经营现金流
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPoint {
    /// 财报截止日
    pub as_of_date: NaiveDate,
    /// 报告期类型（如 12M）
    pub period_type: Option<String>,
    /// 币种
    pub currency: Option<String>,
    /// 经营现金流
    pub operating_cash_flow: f64,
}

/// 某只股票的经营现金流序列，按财报期升序排列，最近一期在最后
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub symbol: String,
    pub points: Vec<CashFlowPoint>,
}

impl CashFlowSeries {
    pub fn new(symbol: impl Into<String>, mut points: Vec<CashFlowPoint>) -> Self {
        points.sort_by_key(|p| p.as_of_date);
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// 最近一期经营现金流，非有限值视为缺失
    pub fn latest_operating_cash_flow(&self) -> Option<f64> {
        self.points
            .last()
            .map(|p| p.operating_cash_flow)
            .filter(|v| v.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
