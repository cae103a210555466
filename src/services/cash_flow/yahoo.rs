//! Yahoo Finance 现金流接口实现
//!
//! 对接 fundamentals-timeseries 接口，取年度经营现金流
//! `{base}/ws/fundamentals-timeseries/v1/finance/timeseries/{SYMBOL}?type=annualOperatingCashFlow`

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::CashFlowProvider;
use crate::config::ProviderConfig;
use crate::models::{CashFlowPoint, CashFlowSeries};

/// 年度经营现金流字段名
pub const ANNUAL_OPERATING_CASH_FLOW: &str = "annualOperatingCashFlow";
/// 时间序列接口路径前缀
const TIMESERIES_PATH: &str = "/ws/fundamentals-timeseries/v1/finance/timeseries/";
/// 查询起始时间戳（1985-08-22）
const PERIOD_START: i64 = 493_590_046;

/// Yahoo Finance 现金流数据源
pub struct YahooCashFlowProvider {
    /// HTTP 客户端
    client: Client,
    /// 数据源根地址
    base_url: Url,
}

impl YahooCashFlowProvider {
    /// 按配置创建数据源，客户端带请求超时和连接超时
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self { client, base_url })
    }

    /// 构造查询地址
    fn timeseries_url(&self, ticker: &str) -> Result<Url> {
        let mut url = self.base_url.join(TIMESERIES_PATH)?;
        // 代码作为单独的路径段写入，避免被当成相对或绝对地址解析
        url.path_segments_mut()
            .map_err(|_| anyhow!("数据源地址无效: {}", self.base_url))?
            .pop_if_empty()
            .push(ticker);
        url.query_pairs_mut()
            .append_pair("symbol", ticker)
            .append_pair("type", ANNUAL_OPERATING_CASH_FLOW)
            .append_pair("period1", &PERIOD_START.to_string())
            .append_pair("period2", &Utc::now().timestamp().to_string());
        Ok(url)
    }
}

#[async_trait]
impl CashFlowProvider for YahooCashFlowProvider {
    async fn fetch_cash_flow(&self, ticker: &str) -> Result<CashFlowSeries> {
        if ticker.trim().is_empty() {
            return Err(anyhow!("股票代码为空"));
        }

        let url = self.timeseries_url(ticker)?;
        log::info!("📡 请求现金流数据 {}", ticker);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("获取现金流数据失败: {}", response.status()));
        }

        let json_data: Value = response.json().await?;
        parse_timeseries(&json_data, ticker)
    }
}

/// 解析时间序列响应
///
/// 格式: {"timeseries":{"result":[{"meta":{...},"annualOperatingCashFlow":[{"asOfDate":"2023-09-30",
/// "periodType":"12M","currencyCode":"USD","reportedValue":{"raw":110543000000,"fmt":"110.54B"}}, null]}],"error":null}}
pub fn parse_timeseries(data: &Value, ticker: &str) -> Result<CashFlowSeries> {
    let timeseries = &data["timeseries"];

    if !timeseries["error"].is_null() {
        return Err(anyhow!("数据源返回错误: {}", timeseries["error"]));
    }

    let results = timeseries["result"]
        .as_array()
        .ok_or_else(|| anyhow!("解析现金流数据失败"))?;

    let mut points = Vec::new();
    for result in results {
        let Some(items) = result[ANNUAL_OPERATING_CASH_FLOW].as_array() else {
            continue;
        };
        // 数组中可能夹杂 null 或缺少 raw 值的期次
        points.extend(items.iter().filter_map(parse_point));
    }

    let series = CashFlowSeries::new(ticker, points);
    if series.is_empty() {
        return Err(anyhow!("股票代码 {} 没有经营现金流数据，可能无效或已退市", ticker));
    }

    Ok(series)
}

fn parse_point(item: &Value) -> Option<CashFlowPoint> {
    let as_of_date = NaiveDate::parse_from_str(item["asOfDate"].as_str()?, "%Y-%m-%d").ok()?;
    let operating_cash_flow = item["reportedValue"]["raw"].as_f64()?;

    Some(CashFlowPoint {
        as_of_date,
        period_type: item["periodType"].as_str().map(str::to_string),
        currency: item["currencyCode"].as_str().map(str::to_string),
        operating_cash_flow,
    })
}
