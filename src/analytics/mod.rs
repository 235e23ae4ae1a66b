//! Cash-flow analysis synthesis
//!
//! `synthesize_cash_flow_analysis` builds one `CashFlowAnalysis` per
//! application. The chart series in `charts` are pure functions of that
//! object and never regenerate it.

pub mod charts;

pub use charts::{
    cash_flow_charts, derive_historical, derive_monthly_trend, derive_projections,
    derive_source_breakdown, CashFlowCharts, HistoricalPoint, MonthlyTrendPoint, ProjectionPoint,
    SourceBreakdownEntry,
};

use crate::models::{AssetClass, LoanApplication};
use crate::rng::SeededRng;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalCashFlow {
    /// Trailing twelve months
    pub operating_cash_flow: f64,
    pub free_cash_flow: f64,
    /// Year-over-year change, percent
    pub cash_flow_trend: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashFlowProjections {
    /// Sum of projected operating cash flow over the next twelve months
    pub next_twelve_months: f64,
    /// Percent
    pub annual_growth_rate: f64,
    pub debt_service_coverage_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolatilityMetrics {
    /// Highest month over lowest month of the seasonal pattern
    pub peak_to_trough_ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CashFlowHealth {
    Strong,
    Adequate,
    Weak,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RepaymentCapacity {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueSource {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashFlowAnalysis {
    pub application_id: String,
    pub generated_at: DateTime<Utc>,
    /// Trailing twelve-month revenue (income for individuals)
    pub total_revenue: f64,
    pub average_monthly_revenue: f64,
    /// Share of revenue consumed by expenses, 0..1
    pub expense_ratio: f64,
    pub monthly_debt_service: f64,
    pub historical_data: HistoricalCashFlow,
    pub projections: CashFlowProjections,
    pub volatility_metrics: VolatilityMetrics,
    pub cash_flow_health: CashFlowHealth,
    pub repayment_capacity: RepaymentCapacity,
    pub recommendation: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub revenue_sources: Vec<RevenueSource>,
}

/// Build a fresh analysis for one application
pub fn synthesize_cash_flow_analysis(
    application: &LoanApplication,
    as_of: DateTime<Utc>,
    rng: &mut SeededRng,
) -> CashFlowAnalysis {
    let business = application.borrower.annual_revenue.is_some();
    let monthly_debt_service =
        monthly_debt_service(application.amount, application.interest_rate, application.term);

    let total_revenue = match application.borrower.annual_revenue {
        Some(revenue) => revenue * rng.range_f64(0.9, 1.1),
        None => {
            // Individuals: payment lands between 15% and 45% of income
            let payment_to_income = rng.range_f64(0.15, 0.45);
            safe_ratio(monthly_debt_service, payment_to_income) * 12.0
        }
    }
    .round();

    let expense_ratio = if business {
        rng.range_f64(0.60, 0.85)
    } else {
        rng.range_f64(0.30, 0.55)
    };

    let operating_cash_flow = (total_revenue * (1.0 - expense_ratio)).round();
    let free_cash_flow = (operating_cash_flow * rng.range_f64(0.70, 0.95)).round();
    let cash_flow_trend = round1(rng.range_f64(-12.0, 18.0));
    let annual_growth_rate = round1(cash_flow_trend * 0.5 + rng.range_f64(-2.0, 4.0));
    let peak_to_trough_ratio = round2(rng.range_f64(1.1, 2.2));

    let dscr = round2(safe_ratio(operating_cash_flow / 12.0, monthly_debt_service));

    let monthly_operating = operating_cash_flow / 12.0;
    let growth = (1.0 + annual_growth_rate / 100.0).max(0.0);
    let next_twelve_months = (1..=12)
        .map(|k| monthly_operating * growth.powf(k as f64 / 12.0))
        .sum::<f64>()
        .round();

    let cash_flow_health = if dscr >= 1.5 {
        CashFlowHealth::Strong
    } else if dscr >= 1.15 {
        CashFlowHealth::Adequate
    } else {
        CashFlowHealth::Weak
    };

    let repayment_capacity = if dscr >= 1.75 && cash_flow_trend >= 0.0 {
        RepaymentCapacity::High
    } else if dscr >= 1.2 {
        RepaymentCapacity::Moderate
    } else {
        RepaymentCapacity::Low
    };

    let recommendation = match (cash_flow_health, repayment_capacity) {
        (CashFlowHealth::Strong, RepaymentCapacity::High) => {
            "Approve: cash flow comfortably covers proposed debt service."
        }
        (CashFlowHealth::Weak, _) | (_, RepaymentCapacity::Low) => {
            "Decline or restructure: projected cash flow does not cover debt service."
        }
        _ => "Approve with conditions: require covenants on minimum coverage and quarterly reporting.",
    }
    .to_string();

    let mut strengths = Vec::new();
    let mut concerns = Vec::new();

    if dscr >= 1.25 {
        strengths.push(format!("Debt service coverage of {:.2}x", dscr));
    } else {
        concerns.push(format!("Debt service coverage of {:.2}x is below 1.25x", dscr));
    }
    if cash_flow_trend > 5.0 {
        strengths.push(format!("Cash flow grew {:.1}% year over year", cash_flow_trend));
    } else if cash_flow_trend < 0.0 {
        concerns.push(format!("Cash flow declined {:.1}% year over year", -cash_flow_trend));
    }
    if peak_to_trough_ratio > 1.8 {
        concerns.push(format!(
            "High seasonality: peak month is {:.1}x the trough",
            peak_to_trough_ratio
        ));
    } else if peak_to_trough_ratio < 1.3 {
        strengths.push("Stable month-to-month revenue".to_string());
    }
    if expense_ratio < 0.5 {
        strengths.push("Low expense base relative to revenue".to_string());
    } else if expense_ratio > 0.8 {
        concerns.push("Thin operating margin".to_string());
    }

    let revenue_sources = revenue_source_names(application.asset_class)
        .iter()
        .enumerate()
        .map(|(i, name)| RevenueSource {
            name: name.to_string(),
            // Primary source dominates
            weight: round2(if i == 0 {
                rng.range_f64(40.0, 70.0)
            } else {
                rng.range_f64(5.0, 25.0)
            }),
        })
        .collect();

    CashFlowAnalysis {
        application_id: application.id.clone(),
        generated_at: as_of,
        total_revenue,
        average_monthly_revenue: (total_revenue / 12.0).round(),
        expense_ratio: round2(expense_ratio),
        monthly_debt_service: monthly_debt_service.round(),
        historical_data: HistoricalCashFlow {
            operating_cash_flow,
            free_cash_flow,
            cash_flow_trend,
        },
        projections: CashFlowProjections {
            next_twelve_months,
            annual_growth_rate,
            debt_service_coverage_ratio: dscr,
        },
        volatility_metrics: VolatilityMetrics {
            peak_to_trough_ratio,
        },
        cash_flow_health,
        repayment_capacity,
        recommendation,
        strengths,
        concerns,
        revenue_sources,
    }
}

fn revenue_source_names(class: AssetClass) -> &'static [&'static str] {
    match class {
        AssetClass::CommercialRealEstate => {
            &["Rental Income", "Parking & Fees", "Service Charges", "Other Income"]
        }
        AssetClass::SmeLoan | AssetClass::EquipmentFinance => {
            &["Product Sales", "Services", "Recurring Contracts", "Other Income"]
        }
        _ => &["Salary", "Bonus", "Investment Income", "Other Income"],
    }
}

/// Level monthly payment for an amortising loan.
///
/// A zero rate amortises straight-line; a zero term yields 0.
pub fn monthly_debt_service(amount: f64, annual_rate_percent: f64, term_months: u32) -> f64 {
    if term_months == 0 || amount <= 0.0 {
        return 0.0;
    }
    let n = term_months as f64;
    let r = annual_rate_percent / 1200.0;
    if r <= 0.0 {
        return amount / n;
    }
    finite_or_zero(amount * r / (1.0 - (1.0 + r).powf(-n)))
}

/// Ratio that is 0 instead of NaN or infinity
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Round half up to a whole number (2.5 -> 3, -2.5 -> -2)
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl fmt::Display for CashFlowHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CashFlowHealth::Strong => "Strong",
            CashFlowHealth::Adequate => "Adequate",
            CashFlowHealth::Weak => "Weak",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RepaymentCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepaymentCapacity::High => "High",
            RepaymentCapacity::Moderate => "Moderate",
            RepaymentCapacity::Low => "Low",
        };
        write!(f, "{}", s)
    }
}
