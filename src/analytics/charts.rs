//! Chart-ready series derived from a `CashFlowAnalysis`

use super::{finite_or_zero, round_half_up, safe_ratio, CashFlowAnalysis};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyTrendPoint {
    pub month: String,
    pub revenue: f64,
    pub expenses: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalPoint {
    pub period: String,
    pub operating_cash_flow: f64,
    pub free_cash_flow: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectionPoint {
    pub month: String,
    pub operating_cash_flow: f64,
    pub free_cash_flow: f64,
    pub debt_service: f64,
    pub dscr: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceBreakdownEntry {
    pub name: String,
    pub value: f64,
    /// Whole percent, rounded half up
    pub percentage: u32,
}

/// All four series for one analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashFlowCharts {
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    pub historical: Vec<HistoricalPoint>,
    pub projections: Vec<ProjectionPoint>,
    pub source_breakdown: Vec<SourceBreakdownEntry>,
}

pub fn cash_flow_charts(analysis: &CashFlowAnalysis) -> CashFlowCharts {
    CashFlowCharts {
        monthly_trend: derive_monthly_trend(analysis),
        historical: derive_historical(analysis),
        projections: derive_projections(analysis),
        source_breakdown: derive_source_breakdown(analysis),
    }
}

/// Trailing twelve months, oldest first, ending with the analysis month.
///
/// Seasonality is a sine whose amplitude reproduces the peak-to-trough
/// ratio; the year-over-year trend ramps linearly into the latest month.
pub fn derive_monthly_trend(analysis: &CashFlowAnalysis) -> Vec<MonthlyTrendPoint> {
    let ratio = analysis.volatility_metrics.peak_to_trough_ratio.max(1.0);
    let amplitude = safe_ratio(ratio - 1.0, ratio + 1.0);
    let trend = analysis.historical_data.cash_flow_trend / 100.0;
    let last_month = analysis.generated_at.month0() as usize;

    (0..12)
        .map(|k| {
            let month_index = (last_month + 1 + k) % 12;
            let ramp = 1.0 + trend * (k as f64 - 11.0) / 11.0;
            let season = 1.0 + amplitude * (2.0 * std::f64::consts::PI * k as f64 / 12.0).sin();
            let revenue =
                finite_or_zero(analysis.average_monthly_revenue * ramp.max(0.0) * season).round();
            let expenses = (revenue * analysis.expense_ratio).round();
            MonthlyTrendPoint {
                month: MONTHS[month_index].to_string(),
                revenue,
                expenses,
                net: revenue - expenses,
            }
        })
        .collect()
}

/// Last four completed quarters; the series sums to the trailing totals
pub fn derive_historical(analysis: &CashFlowAnalysis) -> Vec<HistoricalPoint> {
    let trend = analysis.historical_data.cash_flow_trend / 100.0;
    let weights: Vec<f64> = (0..4)
        .map(|k| (1.0 + trend * (k as f64 - 3.0) / 3.0).max(0.05))
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let current_quarter = analysis.generated_at.month0() / 3;
    let current_year = analysis.generated_at.year();

    weights
        .iter()
        .enumerate()
        .map(|(k, weight)| {
            // k = 3 is the quarter just before the current one
            let quarters_back = 4 - k as i32;
            let absolute = current_year * 4 + current_quarter as i32 - quarters_back;
            let share = safe_ratio(*weight, total_weight);
            HistoricalPoint {
                period: format!("Q{} {}", absolute.rem_euclid(4) + 1, absolute.div_euclid(4)),
                operating_cash_flow: (analysis.historical_data.operating_cash_flow * share).round(),
                free_cash_flow: (analysis.historical_data.free_cash_flow * share).round(),
            }
        })
        .collect()
}

/// Next twelve months of operating and free cash flow against debt service
pub fn derive_projections(analysis: &CashFlowAnalysis) -> Vec<ProjectionPoint> {
    let monthly_operating = analysis.historical_data.operating_cash_flow / 12.0;
    let free_share = safe_ratio(
        analysis.historical_data.free_cash_flow,
        analysis.historical_data.operating_cash_flow,
    );
    let growth = (1.0 + analysis.projections.annual_growth_rate / 100.0).max(0.0);
    let debt_service = analysis.monthly_debt_service;
    let first_month = analysis.generated_at.month0() as usize + 1;

    (0..12)
        .map(|k| {
            let operating =
                finite_or_zero(monthly_operating * growth.powf((k + 1) as f64 / 12.0));
            ProjectionPoint {
                month: MONTHS[(first_month + k) % 12].to_string(),
                operating_cash_flow: operating.round(),
                free_cash_flow: (operating * free_share).round(),
                debt_service,
                dscr: (safe_ratio(operating, debt_service) * 100.0).round() / 100.0,
            }
        })
        .collect()
}

/// Revenue by source; percentages are rounded half up independently
pub fn derive_source_breakdown(analysis: &CashFlowAnalysis) -> Vec<SourceBreakdownEntry> {
    let total_weight: f64 = analysis
        .revenue_sources
        .iter()
        .map(|s| s.weight.max(0.0))
        .sum();

    analysis
        .revenue_sources
        .iter()
        .map(|source| {
            let share = safe_ratio(source.weight.max(0.0), total_weight);
            SourceBreakdownEntry {
                name: source.name.clone(),
                value: (analysis.total_revenue * share).round(),
                percentage: round_half_up(share * 100.0) as u32,
            }
        })
        .collect()
}
