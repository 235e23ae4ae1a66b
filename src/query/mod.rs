//! Read-only queries over a generated population
//!
//! Every function here borrows the population, never mutates it and never
//! regenerates it. All of them are a single linear pass.

use crate::error::LoanDeskError;
use crate::models::{AgentStage, AssetClass, Borrower, LoanApplication, LoanStatus, RiskRating};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Applications whose status belongs to the stage's status set
pub fn applications_for_stage(
    population: &[LoanApplication],
    stage: AgentStage,
) -> Vec<&LoanApplication> {
    let statuses = stage.statuses();
    population
        .iter()
        .filter(|app| statuses.contains(&app.status))
        .collect()
}

/// Same as `applications_for_stage`; an unknown stage name yields nothing
pub fn applications_for_stage_name<'a>(
    population: &'a [LoanApplication],
    stage: &str,
) -> Vec<&'a LoanApplication> {
    match AgentStage::parse(stage) {
        Some(stage) => applications_for_stage(population, stage),
        None => Vec::new(),
    }
}

pub fn applications_with_status<'a>(
    population: &'a [LoanApplication],
    statuses: &[LoanStatus],
) -> Vec<&'a LoanApplication> {
    population
        .iter()
        .filter(|app| statuses.contains(&app.status))
        .collect()
}

pub fn count_by_status(population: &[LoanApplication], statuses: &[LoanStatus]) -> usize {
    if statuses.is_empty() {
        return 0;
    }
    population
        .iter()
        .filter(|app| statuses.contains(&app.status))
        .count()
}

/// Approved or conditionally approved share of decided applications.
///
/// `None` when nothing has been decided yet.
pub fn approval_rate(population: &[LoanApplication]) -> Option<f64> {
    let decided = count_by_status(population, &LoanStatus::DECIDED);
    if decided == 0 {
        return None;
    }
    let approved = count_by_status(population, &LoanStatus::APPROVED);
    Some(approved as f64 / decided as f64)
}

pub fn format_approval_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) if rate.is_finite() => format!("{}%", (rate * 100.0).round() as i64),
        _ => "N/A".to_string(),
    }
}

/// US-dollar rendering with thousands separators and no decimals.
///
/// Rounds to the nearest unit (half away from zero). Non-finite input
/// renders as `$0`.
pub fn format_currency(amount: f64) -> String {
    let rounded = if amount.is_finite() { amount.round() } else { 0.0 };
    let negative = rounded < 0.0;
    let digits = format!("{}", rounded.abs() as u64);

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

pub fn find_application<'a>(
    population: &'a [LoanApplication],
    id: &str,
) -> Result<&'a LoanApplication> {
    population
        .iter()
        .find(|app| app.id == id)
        .ok_or_else(|| LoanDeskError::ApplicationNotFound(id.to_string()))
}

pub fn find_borrower<'a>(population: &'a [LoanApplication], id: &str) -> Result<&'a Borrower> {
    population
        .iter()
        .map(|app| &app.borrower)
        .find(|borrower| borrower.id == id)
        .ok_or_else(|| LoanDeskError::BorrowerNotFound(id.to_string()))
}

//
// ================= Dashboard Summary =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    pub total_applications: usize,
    pub in_process: usize,
    pub decided: usize,
    pub approval_rate: Option<f64>,
    pub approval_rate_display: String,
    pub total_amount: f64,
    pub total_amount_display: String,
    pub average_amount: f64,
    pub average_credit_score: f64,
    pub by_status: BTreeMap<LoanStatus, usize>,
    pub by_asset_class: BTreeMap<AssetClass, usize>,
    pub by_risk: BTreeMap<RiskRating, usize>,
}

pub fn portfolio_summary(population: &[LoanApplication]) -> PortfolioSummary {
    let mut by_status = BTreeMap::new();
    let mut by_asset_class = BTreeMap::new();
    let mut by_risk = BTreeMap::new();
    let mut total_amount = 0.0;
    let mut credit_total = 0u64;

    for app in population {
        *by_status.entry(app.status).or_insert(0) += 1;
        *by_asset_class.entry(app.asset_class).or_insert(0) += 1;
        *by_risk.entry(app.risk).or_insert(0) += 1;
        total_amount += app.amount;
        credit_total += app.borrower.credit_score as u64;
    }

    let total = population.len();
    let (average_amount, average_credit_score) = if total == 0 {
        (0.0, 0.0)
    } else {
        (total_amount / total as f64, credit_total as f64 / total as f64)
    };
    let approval_rate = approval_rate(population);

    PortfolioSummary {
        total_applications: total,
        in_process: count_by_status(population, &LoanStatus::IN_PROCESS),
        decided: count_by_status(population, &LoanStatus::DECIDED),
        approval_rate,
        approval_rate_display: format_approval_rate(approval_rate),
        total_amount,
        total_amount_display: format_currency(total_amount),
        average_amount,
        average_credit_score,
        by_status,
        by_asset_class,
        by_risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_population_seeded;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn population(count: usize) -> Vec<LoanApplication> {
        let as_of = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        generate_population_seeded(count, 2024, as_of)
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1_234_567.0), "$1,234,567");
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.5), "$1,000");
        assert_eq!(format_currency(999.49), "$999");
        assert_eq!(format_currency(100.0), "$100");
        assert_eq!(format_currency(-45_000.0), "-$45,000");
        assert_eq!(format_currency(f64::NAN), "$0");
    }

    #[test]
    fn test_decision_stage_matches_filter() {
        let pop = population(150);
        let by_stage: HashSet<_> = applications_for_stage(&pop, AgentStage::Decision)
            .into_iter()
            .map(|a| a.id.clone())
            .collect();
        let expected: HashSet<_> = pop
            .iter()
            .filter(|a| {
                matches!(
                    a.status,
                    LoanStatus::Underwriting
                        | LoanStatus::Approved
                        | LoanStatus::ConditionallyApproved
                        | LoanStatus::Rejected
                )
            })
            .map(|a| a.id.clone())
            .collect();
        assert_eq!(by_stage, expected);
    }

    #[test]
    fn test_unknown_stage_is_empty() {
        let pop = population(30);
        assert!(applications_for_stage_name(&pop, "servicing").is_empty());
        assert!(!applications_for_stage_name(&pop, "processing").is_empty() || pop.is_empty());
    }

    #[test]
    fn test_count_by_status() {
        let pop = population(80);
        assert_eq!(count_by_status(&pop, &[]), 0);
        assert_eq!(count_by_status(&pop, &LoanStatus::ALL), pop.len());

        let s1 = [LoanStatus::Draft, LoanStatus::Submitted];
        let s2 = [LoanStatus::Funded];
        let union = [LoanStatus::Draft, LoanStatus::Submitted, LoanStatus::Funded];
        assert_eq!(
            count_by_status(&pop, &union),
            count_by_status(&pop, &s1) + count_by_status(&pop, &s2)
        );
    }

    #[test]
    fn test_approval_rate_sentinel() {
        assert_eq!(approval_rate(&[]), None);
        assert_eq!(format_approval_rate(None), "N/A");

        let undecided: Vec<_> = population(60)
            .into_iter()
            .filter(|a| !a.status.is_decided())
            .collect();
        assert_eq!(approval_rate(&undecided), None);
    }

    #[test]
    fn test_approval_rate_value() {
        let pop = population(150);
        let rate = approval_rate(&pop).expect("population covers decided statuses");
        assert!((0.0..=1.0).contains(&rate));
        assert_eq!(format_approval_rate(Some(0.666)), "67%");
    }

    #[test]
    fn test_lookup_miss_is_not_found() {
        let pop = population(10);
        let err = find_application(&pop, "APP-99999").unwrap_err();
        assert!(err.is_not_found());
        assert!(find_borrower(&pop, "nobody").unwrap_err().is_not_found());

        let first = &pop[0];
        assert_eq!(find_application(&pop, &first.id).unwrap().id, first.id);
        assert_eq!(find_borrower(&pop, &first.borrower.id).unwrap(), &first.borrower);
    }

    #[test]
    fn test_summary_of_empty_population() {
        let summary = portfolio_summary(&[]);
        assert_eq!(summary.total_applications, 0);
        assert_eq!(summary.average_amount, 0.0);
        assert_eq!(summary.approval_rate_display, "N/A");
        assert_eq!(summary.total_amount_display, "$0");
    }

    #[test]
    fn test_summary_counts_add_up() {
        let pop = population(100);
        let summary = portfolio_summary(&pop);
        assert_eq!(summary.by_status.values().sum::<usize>(), 100);
        assert_eq!(summary.by_asset_class.values().sum::<usize>(), 100);
        assert_eq!(summary.by_risk.values().sum::<usize>(), 100);
    }
}
