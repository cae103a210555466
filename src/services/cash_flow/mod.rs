//! 现金流数据源模块
//!
//! 数据源只负责按股票代码返回经营现金流序列，失败如何处理由估值服务决定

pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CashFlowSeries;

pub use yahoo::YahooCashFlowProvider;

/// 按股票代码获取经营现金流序列
#[async_trait]
pub trait CashFlowProvider: Send + Sync {
    async fn fetch_cash_flow(&self, ticker: &str) -> Result<CashFlowSeries>;
}
