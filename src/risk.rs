//! Risk Classifier
//!
//! Rates an application Low / Medium / High from:
//! - Credit score band of the borrower
//! - Leverage (amount against revenue for companies, size for individuals)
//! - Asset class and business maturity

use crate::models::{AssetClass, Borrower, RiskRating};

/// Static credit bands: (minimum score, risk points)
const CREDIT_BANDS: &[(u16, u32)] = &[(740, 0), (670, 1), (580, 2), (0, 3)];

/// Classes that carry an extra point regardless of borrower quality
const ELEVATED_CLASSES: &[AssetClass] = &[
    AssetClass::PersonalLoan,
    AssetClass::SmeLoan,
    AssetClass::Other,
];

/// Individual loan size above which leverage counts against the borrower
const INDIVIDUAL_LARGE_LOAN: f64 = 500_000.0;

pub struct RiskClassifier;

impl RiskClassifier {
    pub fn classify(borrower: &Borrower, asset_class: AssetClass, amount: f64) -> RiskRating {
        match Self::points(borrower, asset_class, amount) {
            0..=1 => RiskRating::Low,
            2..=3 => RiskRating::Medium,
            _ => RiskRating::High,
        }
    }

    /// Raw risk points; higher is riskier
    pub fn points(borrower: &Borrower, asset_class: AssetClass, amount: f64) -> u32 {
        let mut points = credit_points(borrower.credit_score);

        if ELEVATED_CLASSES.contains(&asset_class) {
            points += 1;
        }

        points += match borrower.annual_revenue {
            Some(revenue) if revenue > 0.0 => {
                let leverage = amount / revenue;
                if leverage > 2.0 {
                    2
                } else if leverage > 1.0 {
                    1
                } else {
                    0
                }
            }
            Some(_) => 2,
            None => u32::from(amount > INDIVIDUAL_LARGE_LOAN),
        };

        if matches!(borrower.years_in_business, Some(years) if years < 2) {
            points += 1;
        }

        points
    }
}

fn credit_points(score: u16) -> u32 {
    CREDIT_BANDS
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, points)| *points)
        .unwrap_or(3)
}
