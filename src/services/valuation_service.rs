//! DCF 估值服务
//!
//! 两阶段现金流折现：
//! - 预测期：基准现金流按 growth 复利增长 years 年，逐年按 discount 折现
//! - 终值：Gordon 永续增长模型 fcf * (1 + terminal) / (discount - terminal)，再折现 years 年
//!
//! 基准现金流取数据源最近一期经营现金流，取不到时使用配置的兜底值

use std::sync::Arc;

use crate::error::ValuationError;
use crate::models::{AnalyzeResponse, ValuationRequest, ValuationResult};
use crate::services::cash_flow::CashFlowProvider;

pub const FALLBACK_FCF: f64 = 5_000_000_000.0;

// 固定说明文字，与股票代码和估值结果无关
pub const PROBLEM_IT_SOLVES: &str =
    "Helps enterprises manage large-scale cloud and AI infrastructure efficiently.";
pub const CUSTOMER_BASE_SIZE: &str =
    "Thousands of enterprise clients, including major hyperscalers.";
pub const MOAT_STRENGTH: &str =
    "Unified software stack, high switching costs, and strong hyperscaler partnerships.";
pub const OPERATIONAL_EFFICIENCY: &str =
    "Gross margin ~60%, operating margin ~38%. Asset-light model.";
pub const AI_OPPORTUNITIES: &str =
    "Positioned to power next-gen AI data centers with high-throughput, low-latency networking fabrics.";

/// 估值服务
///
/// 不持有可变状态，可在所有 worker 间共享
pub struct ValuationService {
    /// 现金流数据源
    provider: Arc<dyn CashFlowProvider>,
    /// 兜底现金流
    fallback_fcf: f64,
}

impl ValuationService {
    pub fn new(provider: Arc<dyn CashFlowProvider>, fallback_fcf: f64) -> Self {
        Self {
            provider,
            fallback_fcf,
        }
    }

    /// 从数据源读取最近一期经营现金流
    pub async fn fetch_baseline(&self, ticker: &str) -> Result<f64, ValuationError> {
        let series = self
            .provider
            .fetch_cash_flow(ticker)
            .await
            .map_err(|e| ValuationError::Upstream(e.to_string()))?;

        series.latest_operating_cash_flow().ok_or_else(|| {
            ValuationError::Upstream(format!("{} 没有可用的经营现金流", ticker))
        })
    }

    /// 获取基准自由现金流，返回 (现金流, 是否使用兜底值)
    ///
    /// 数据源的任何失败都不会让请求失败，而是换成兜底值
    pub async fn resolve_baseline(&self, ticker: &str) -> (f64, bool) {
        match self.fetch_baseline(ticker).await {
            Ok(fcf) => (fcf, false),
            Err(e) => {
                log::warn!("{}，使用兜底值 {}", e, self.fallback_fcf);
                (self.fallback_fcf, true)
            }
        }
    }

    /// 执行一次完整估值
    pub async fn analyze(&self, request: &ValuationRequest) -> Result<ValuationResult, ValuationError> {
        let (fcf, used_fallback) = self.resolve_baseline(&request.ticker).await;

        let mut result = compute_dcf(
            fcf,
            request.growth_rate,
            request.discount_rate,
            request.terminal_growth_rate,
            request.years,
        )?;
        result.used_fallback = used_fallback;

        log::info!(
            "{} 估值完成: total={:.2} (预测期 {:.2}, 终值 {:.2}, 基准 {:.0}, 兜底 {})",
            request.ticker,
            result.total_value,
            result.dcf_value,
            result.terminal_value,
            fcf,
            used_fallback
        );

        Ok(result)
    }
}

/// 按百分比参数计算 DCF
///
/// `years <= 0` 时预测期不产生任何项，终值按 `(1 + discount)^years` 原样折现
pub fn compute_dcf(
    fcf: f64,
    growth_rate_pct: f64,
    discount_rate_pct: f64,
    terminal_growth_rate_pct: f64,
    years: i64,
) -> Result<ValuationResult, ValuationError> {
    let growth = growth_rate_pct / 100.0;
    let discount = discount_rate_pct / 100.0;
    let terminal = terminal_growth_rate_pct / 100.0;

    // years 不设上限，请求参数只做类型转换
    let mut dcf_value = 0.0;
    for year in 1..=years.max(0) {
        let projected_fcf = fcf * checked_pow(1.0 + growth, year)?;
        dcf_value += checked_div(projected_fcf, checked_pow(1.0 + discount, year)?)?;
        if !dcf_value.is_finite() {
            return Err(ValuationError::out_of_range());
        }
    }

    let terminal_value = checked_div(fcf * (1.0 + terminal), discount - terminal)?;
    let terminal_value = checked_div(terminal_value, checked_pow(1.0 + discount, years)?)?;

    let total_value = dcf_value + terminal_value;
    if !total_value.is_finite() {
        return Err(ValuationError::out_of_range());
    }

    Ok(ValuationResult {
        total_value,
        dcf_value,
        terminal_value,
        baseline_fcf: fcf,
        used_fallback: false,
    })
}

fn checked_pow(base: f64, exp: i64) -> Result<f64, ValuationError> {
    if base == 0.0 && exp < 0 {
        return Err(ValuationError::division_by_zero());
    }
    let value = base.powf(exp as f64);
    if value.is_infinite() {
        return Err(ValuationError::out_of_range());
    }
    Ok(value)
}

fn checked_div(numerator: f64, denominator: f64) -> Result<f64, ValuationError> {
    if denominator == 0.0 {
        return Err(ValuationError::division_by_zero());
    }
    Ok(numerator / denominator)
}

/// 货币格式：`$` + 千分位 + 两位小数，负数为 `$-1,234.50`
pub fn format_currency(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let (sign, digits) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("${}{}.{}", sign, grouped, frac_part)
}

/// 组装接口响应
pub fn build_response(result: &ValuationResult) -> AnalyzeResponse {
    AnalyzeResponse {
        problem_it_solves: PROBLEM_IT_SOLVES.to_string(),
        customer_base_size: CUSTOMER_BASE_SIZE.to_string(),
        moat_strength: MOAT_STRENGTH.to_string(),
        operational_efficiency: OPERATIONAL_EFFICIENCY.to_string(),
        dcf_valuation: format_currency(result.total_value),
        ai_opportunities: AI_OPPORTUNITIES.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::models::{CashFlowPoint, CashFlowSeries};

    /// 固定返回结果的数据源
    pub(crate) struct StubProvider {
        pub(crate) ocf: Option<f64>,
    }

    #[async_trait]
    impl CashFlowProvider for StubProvider {
        async fn fetch_cash_flow(&self, ticker: &str) -> Result<CashFlowSeries> {
            match self.ocf {
                Some(v) => Ok(CashFlowSeries::new(
                    ticker,
                    vec![
                        CashFlowPoint {
                            as_of_date: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
                            period_type: Some("12M".to_string()),
                            currency: Some("USD".to_string()),
                            operating_cash_flow: 1.0,
                        },
                        CashFlowPoint {
                            as_of_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
                            period_type: Some("12M".to_string()),
                            currency: Some("USD".to_string()),
                            operating_cash_flow: v,
                        },
                    ],
                )),
                None => Err(anyhow!("股票代码 {} 没有经营现金流数据", ticker)),
            }
        }
    }

    fn service(ocf: Option<f64>) -> ValuationService {
        ValuationService::new(Arc::new(StubProvider { ocf }), FALLBACK_FCF)
    }

    /// 逐项展开的参考值
    fn reference_total(fcf: f64, g: f64, d: f64, t: f64, years: i32) -> f64 {
        let mut sum = 0.0;
        for y in 1..=years {
            sum += fcf * (1.0 + g).powi(y) / (1.0 + d).powi(y);
        }
        sum + fcf * (1.0 + t) / (d - t) / (1.0 + d).powi(years)
    }

    #[test]
    fn test_golden_default_parameters() {
        println!("\n========== 测试默认参数估值 ==========");
        let result = compute_dcf(FALLBACK_FCF, 10.0, 8.0, 2.0, 5).unwrap();
        let expected = reference_total(5e9, 0.10, 0.08, 0.02, 5);

        println!("  预测期: {:.2}", result.dcf_value);
        println!("  终值: {:.2}", result.terminal_value);
        println!("  总额: {}", format_currency(result.total_value));

        assert!((result.total_value - expected).abs() < 1e-3);
        assert!((result.dcf_value - 26_423_662_280.078).abs() < 1.0);
        assert!((result.terminal_value - 57_849_571_747.869).abs() < 1.0);
        assert_eq!(format_currency(result.total_value), "$84,273,234,027.95");
        println!("✅ 默认参数估值测试通过！");
    }

    #[test]
    fn test_zero_years_is_undiscounted_terminal() {
        let result = compute_dcf(FALLBACK_FCF, 10.0, 8.0, 2.0, 0).unwrap();
        let terminal = 5e9 * 1.02 / (0.08 - 0.02);

        assert_eq!(result.dcf_value, 0.0);
        assert!((result.total_value - terminal).abs() < 1e-3);
        assert!((result.total_value - 85_000_000_000.0).abs() < 1.0);
    }

    #[test]
    fn test_negative_years_discounts_with_literal_exponent() {
        let result = compute_dcf(FALLBACK_FCF, 10.0, 8.0, 2.0, -2).unwrap();
        let expected = 5e9 * 1.02 / 0.06 * 1.08f64.powi(2);

        assert_eq!(result.dcf_value, 0.0);
        assert!((result.total_value - expected).abs() < 1e-3);
    }

    #[test]
    fn test_long_horizon_is_not_rejected() {
        // 增长为 0 时预测期之和收敛到 fcf * (1/d)
        let result = compute_dcf(FALLBACK_FCF, 0.0, 8.0, 2.0, 5_000).unwrap();
        assert!((result.dcf_value - 5e9 / 0.08).abs() < 1.0);
        assert!(result.terminal_value.abs() < 1e-6);
    }

    #[test]
    fn test_equal_discount_and_terminal_is_division_by_zero() {
        let err = compute_dcf(FALLBACK_FCF, 10.0, 2.0, 2.0, 5).unwrap_err();
        assert!(matches!(err, ValuationError::Computation(_)));
        assert_eq!(err.to_string(), "float division by zero");
    }

    #[test]
    fn test_minus_hundred_discount_is_division_by_zero() {
        assert!(compute_dcf(FALLBACK_FCF, 10.0, -100.0, 2.0, 5).is_err());
        assert!(compute_dcf(FALLBACK_FCF, 10.0, -100.0, 2.0, -1).is_err());
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = compute_dcf(FALLBACK_FCF, 1000.0, 8.0, 2.0, 5000).unwrap_err();
        assert_eq!(err.to_string(), "numerical result out of range");
    }

    #[test]
    fn test_format_currency() {
        let cases = vec![
            (0.0, "$0.00"),
            (12.345, "$12.35"),
            (999.999, "$1,000.00"),
            (1234.5, "$1,234.50"),
            (1_234_567.891, "$1,234,567.89"),
            (84_273_234_027.947, "$84,273,234,027.95"),
            (-1234.5, "$-1,234.50"),
            (-12.0, "$-12.00"),
        ];

        for (input, expected) in &cases {
            let result = format_currency(*input);
            println!("  {} -> {} (期望: {})", input, result, expected);
            assert_eq!(result, *expected);
        }
    }

    #[test]
    fn test_build_response_is_static_apart_from_value() {
        let a = compute_dcf(1e9, 10.0, 8.0, 2.0, 5).unwrap();
        let b = compute_dcf(2e9, 10.0, 8.0, 2.0, 5).unwrap();
        let ra = build_response(&a);
        let rb = build_response(&b);

        assert_ne!(ra.dcf_valuation, rb.dcf_valuation);
        assert_eq!(ra.problem_it_solves, rb.problem_it_solves);
        assert_eq!(ra.moat_strength, MOAT_STRENGTH);
        assert_eq!(rb.ai_opportunities, AI_OPPORTUNITIES);
    }

    #[tokio::test]
    async fn test_uses_latest_operating_cash_flow() {
        let service = service(Some(2e9));
        let (fcf, used_fallback) = service.resolve_baseline("ANET").await;
        assert_eq!(fcf, 2e9);
        assert!(!used_fallback);
    }

    #[tokio::test]
    async fn test_falls_back_when_provider_fails() {
        let service = service(None);
        let result = service.analyze(&ValuationRequest::default()).await.unwrap();

        assert!(result.used_fallback);
        assert_eq!(result.baseline_fcf, FALLBACK_FCF);
        let expected = compute_dcf(FALLBACK_FCF, 10.0, 8.0, 2.0, 5).unwrap();
        assert_eq!(result.total_value, expected.total_value);
    }

    #[tokio::test]
    async fn test_fetch_baseline_reports_upstream_error() {
        let err = service(None).fetch_baseline("NOPE").await.unwrap_err();
        assert!(matches!(err, ValuationError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_falls_back_on_non_finite_value() {
        let service = service(Some(f64::NAN));
        let (fcf, used_fallback) = service.resolve_baseline("ANET").await;
        assert_eq!(fcf, FALLBACK_FCF);
        assert!(used_fallback);
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let service = service(Some(3.3e9));
        let request = ValuationRequest {
            ticker: "ANET".to_string(),
            ..ValuationRequest::default()
        };

        let first = service.analyze(&request).await.unwrap();
        let second = service.analyze(&request).await.unwrap();
        assert_eq!(first, second);
    }
}
