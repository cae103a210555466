//! 业务逻辑服务模块
//!
//! 封装数据获取和估值计算逻辑

pub mod cash_flow;          // 现金流数据源
pub mod valuation_service;  // DCF 估值服务
