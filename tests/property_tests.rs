/// Property-based tests using proptest
/// Invariants of generation, queries, formatting and chart derivation
use chrono::{DateTime, TimeZone, Utc};
use loan_desk::analytics::{cash_flow_charts, derive_source_breakdown, synthesize_cash_flow_analysis};
use loan_desk::generator::generate_population_seeded;
use loan_desk::models::{AgentStage, Decision, LoanStatus};
use loan_desk::query::{
    applications_for_stage, approval_rate, count_by_status, format_approval_rate, format_currency,
};
use loan_desk::rng::SeededRng;
use loan_desk::state::Portfolio;
use proptest::prelude::*;
use std::collections::HashSet;

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
}

fn status_subset() -> impl Strategy<Value = Vec<LoanStatus>> {
    proptest::sample::subsequence(LoanStatus::ALL.to_vec(), 0..=LoanStatus::ALL.len())
}

// Property: population size and id uniqueness
proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn population_has_exact_count_and_unique_ids(count in 0usize..200, seed in any::<u64>()) {
        let pop = generate_population_seeded(count, seed, as_of());
        prop_assert_eq!(pop.len(), count);

        let ids: HashSet<_> = pop.iter().map(|a| a.id.as_str()).collect();
        prop_assert_eq!(ids.len(), count);
    }

    #[test]
    fn display_status_is_table_projection(count in 1usize..120, seed in any::<u64>()) {
        for app in generate_population_seeded(count, seed, as_of()) {
            prop_assert_eq!(app.display_status(), app.status.display_status());
        }
    }

    #[test]
    fn every_status_present_when_count_covers_enum(count in 11usize..150, seed in any::<u64>()) {
        let pop = generate_population_seeded(count, seed, as_of());
        for status in LoanStatus::ALL {
            prop_assert!(pop.iter().any(|a| a.status == status), "missing {}", status);
        }
    }

    #[test]
    fn same_seed_same_population(count in 0usize..60, seed in any::<u64>()) {
        prop_assert_eq!(
            generate_population_seeded(count, seed, as_of()),
            generate_population_seeded(count, seed, as_of())
        );
    }

    #[test]
    fn completeness_matches_documents(count in 1usize..80, seed in any::<u64>()) {
        for app in generate_population_seeded(count, seed, as_of()) {
            prop_assert!(app.completeness <= 100);
            prop_assert_eq!(app.completeness, app.compute_completeness());
            prop_assert_eq!(app.completeness == 100, app.missing_documents().is_empty());
        }
    }
}

// Property: count_by_status is additive over disjoint subsets
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn count_by_status_is_additive(
        seed in any::<u64>(),
        count in 0usize..150,
        subset in status_subset(),
        split in any::<prop::sample::Index>(),
    ) {
        let pop = generate_population_seeded(count, seed, as_of());
        let cut = if subset.is_empty() { 0 } else { split.index(subset.len() + 1) };
        let (s1, s2) = subset.split_at(cut);

        prop_assert_eq!(
            count_by_status(&pop, &subset),
            count_by_status(&pop, s1) + count_by_status(&pop, s2)
        );
    }

    #[test]
    fn approval_rate_sentinel_without_decisions(seed in any::<u64>(), count in 0usize..100) {
        let undecided: Vec<_> = generate_population_seeded(count, seed, as_of())
            .into_iter()
            .filter(|a| !a.status.is_decided())
            .collect();

        prop_assert_eq!(approval_rate(&undecided), None);
        prop_assert_eq!(format_approval_rate(approval_rate(&undecided)), "N/A");
    }

    #[test]
    fn approval_rate_is_a_fraction(seed in any::<u64>(), count in 0usize..150) {
        let pop = generate_population_seeded(count, seed, as_of());
        if let Some(rate) = approval_rate(&pop) {
            prop_assert!(rate.is_finite());
            prop_assert!((0.0..=1.0).contains(&rate));
        }
    }
}

// Property: currency formatting
proptest! {
    #[test]
    fn currency_keeps_digits_and_groups_by_three(amount in 0u64..1_000_000_000_000) {
        let formatted = format_currency(amount as f64);
        prop_assert!(formatted.starts_with('$'));

        let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();
        prop_assert_eq!(digits, amount.to_string());

        for group in formatted[1..].split(',').skip(1) {
            prop_assert_eq!(group.len(), 3);
        }
    }

    #[test]
    fn currency_rounds_instead_of_truncating(whole in 0u64..1_000_000, cents in 50u32..100) {
        let amount = whole as f64 + cents as f64 / 100.0;
        let expected = format_currency((whole + 1) as f64);
        prop_assert_eq!(format_currency(amount), expected);
    }

    #[test]
    fn currency_never_panics(amount in any::<f64>()) {
        let formatted = format_currency(amount);
        prop_assert!(formatted.contains('$'));
    }
}

// Property: chart derivation
proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn source_breakdown_sums_to_hundred(seed in any::<u64>(), analysis_seed in any::<u64>()) {
        let pop = generate_population_seeded(12, seed, as_of());
        let mut rng = SeededRng::new(analysis_seed);
        for app in &pop {
            let analysis = synthesize_cash_flow_analysis(app, as_of(), &mut rng);
            let breakdown = derive_source_breakdown(&analysis);
            let total: i64 = breakdown.iter().map(|e| e.percentage as i64).sum();
            prop_assert!((total - 100).abs() <= breakdown.len() as i64, "total {}", total);
        }
    }

    #[test]
    fn chart_series_are_finite(seed in any::<u64>(), analysis_seed in any::<u64>()) {
        let pop = generate_population_seeded(12, seed, as_of());
        let mut rng = SeededRng::new(analysis_seed);
        for app in &pop {
            let analysis = synthesize_cash_flow_analysis(app, as_of(), &mut rng);
            let charts = cash_flow_charts(&analysis);

            prop_assert_eq!(charts.monthly_trend.len(), 12);
            prop_assert_eq!(charts.historical.len(), 4);
            prop_assert_eq!(charts.projections.len(), 12);

            for p in &charts.monthly_trend {
                prop_assert!(p.revenue.is_finite() && p.expenses.is_finite() && p.net.is_finite());
            }
            for p in &charts.historical {
                prop_assert!(p.operating_cash_flow.is_finite() && p.free_cash_flow.is_finite());
            }
            for p in &charts.projections {
                prop_assert!(p.operating_cash_flow.is_finite() && p.dscr.is_finite());
            }
            for e in &charts.source_breakdown {
                prop_assert!(e.value.is_finite());
            }
        }
    }
}

// Scenario: decision stage filter equals the explicit status filter
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn decision_stage_equals_status_filter(seed in any::<u64>()) {
        let pop = generate_population_seeded(150, seed, as_of());

        let by_stage: HashSet<_> = applications_for_stage(&pop, AgentStage::Decision)
            .into_iter()
            .map(|a| a.id.clone())
            .collect();
        let by_filter: HashSet<_> = pop
            .iter()
            .filter(|a| matches!(
                a.status,
                LoanStatus::Underwriting
                    | LoanStatus::Approved
                    | LoanStatus::ConditionallyApproved
                    | LoanStatus::Rejected
            ))
            .map(|a| a.id.clone())
            .collect();

        prop_assert_eq!(by_stage, by_filter);
    }

    // Scenario: approved → rejected changes only that record
    #[test]
    fn decision_override_touches_one_record(seed in any::<u64>(), pick in any::<prop::sample::Index>()) {
        let mut portfolio = Portfolio::generate(60, Some(seed), as_of());
        let approved: Vec<String> = portfolio
            .applications()
            .iter()
            .filter(|a| a.status == LoanStatus::Approved)
            .map(|a| a.id.clone())
            .collect();
        prop_assume!(!approved.is_empty());

        let target = approved[pick.index(approved.len())].clone();
        let before = portfolio.applications().to_vec();
        let at = as_of() + chrono::Duration::days(3);

        portfolio.apply_decision(&target, Decision::Reject, at).unwrap();

        for (old, new) in before.iter().zip(portfolio.applications()) {
            if old.id == target {
                let mut expected = old.clone();
                expected.status = LoanStatus::Rejected;
                prop_assert_eq!(new, &expected);
                prop_assert_eq!(new.display_status(), "Rejected");
            } else {
                prop_assert_eq!(old, new);
            }
        }
    }
}
