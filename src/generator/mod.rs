//! Synthetic data generator
//!
//! Produces a population of loan applications with plausible correlations:
//! amount and term follow the asset class, risk follows credit quality and
//! leverage, and dates, documents and agent assignments follow the status.
//! Generation is pure: the same seed and `as_of` give the same population.

mod catalog;

use crate::models::{
    credit_rating_for, Address, AgentAssignments, AgentStage, AssetClass, Borrower, Document,
    DocumentAnalysis, DocumentStatus, LoanApplication, LoanStatus, Note, RiskRating,
};
use crate::risk::RiskClassifier;
use crate::rng::SeededRng;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use catalog::*;

const FIRST_APPLICATION_NUMBER: usize = 10001;
const FIRST_BORROWER_NUMBER: usize = 50001;

/// Seeded generator for applications and borrowers
pub struct PopulationGenerator {
    rng: SeededRng,
    seed: u64,
    as_of: DateTime<Utc>,
}

impl PopulationGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SeededRng::new(seed),
            seed,
            as_of: Utc::now(),
        }
    }

    /// Reference "now" for every generated timestamp
    pub fn as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate exactly `count` applications with unique ids.
    ///
    /// When `count` covers the status enum, every status appears at least once.
    pub fn generate(&mut self, count: usize) -> Vec<LoanApplication> {
        let statuses = self.status_plan(count);

        let applications: Vec<LoanApplication> = statuses
            .into_iter()
            .enumerate()
            .map(|(index, status)| self.application(index, status))
            .collect();

        debug!(
            seed = self.seed,
            count = applications.len(),
            "Generated application population"
        );

        applications
    }

    /// Standalone borrowers for the borrowers page
    pub fn generate_borrowers(&mut self, count: usize) -> Vec<Borrower> {
        (0..count)
            .map(|index| {
                let class = self.rng.pick_weighted(ASSET_CLASS_WEIGHTS);
                self.borrower(index, class)
            })
            .collect()
    }

    fn status_plan(&mut self, count: usize) -> Vec<LoanStatus> {
        let mut statuses = Vec::with_capacity(count);
        if count >= LoanStatus::ALL.len() {
            statuses.extend_from_slice(&LoanStatus::ALL);
        }
        while statuses.len() < count {
            statuses.push(self.rng.pick_weighted(STATUS_WEIGHTS));
        }
        self.rng.shuffle(&mut statuses);
        statuses
    }

    fn application(&mut self, index: usize, status: LoanStatus) -> LoanApplication {
        let id = format!("APP-{:05}", FIRST_APPLICATION_NUMBER + index);
        let asset_class = self.rng.pick_weighted(ASSET_CLASS_WEIGHTS);
        let borrower = self.borrower(index, asset_class);

        let band = amount_band(asset_class);
        let steps = (band.max - band.min) / band.step;
        let amount = (band.min + self.rng.range(0, steps + 1) * band.step) as f64;
        let term = *self.rng.pick(terms(asset_class));

        let mut risk = RiskClassifier::classify(&borrower, asset_class, amount);
        if self.rng.chance(0.1) {
            risk = if self.rng.chance(0.5) { risk.raise() } else { risk.lower() };
        }

        let spread = match risk {
            RiskRating::Low => 0.0,
            RiskRating::Medium => 1.25,
            RiskRating::High => 3.0,
        };
        let interest_rate =
            round2(base_rate(asset_class) + spread + self.rng.range_f64(-0.25, 0.25));

        let purpose = self.rng.pick(purposes(asset_class)).to_string();

        // Lifecycle timestamps, clamped to `as_of`
        let as_of = self.as_of;
        let date_created = as_of
            - Duration::days(self.rng.range(10, 240))
            - Duration::minutes(self.rng.range(0, 24 * 60));
        let date_submitted = (status.progress() >= 1)
            .then(|| (date_created + Duration::days(self.rng.range(1, 6))).min(as_of));
        let date_decided = match date_submitted {
            Some(submitted) if status.has_decision() => {
                Some((submitted + Duration::days(self.rng.range(7, 31))).min(as_of))
            }
            _ => None,
        };
        let date_funded = match date_decided {
            Some(decided) if status.progress() >= 6 => {
                Some((decided + Duration::days(self.rng.range(3, 15))).min(as_of))
            }
            _ => None,
        };
        let date_closed = match date_funded {
            Some(funded) if status == LoanStatus::Closed => {
                Some((funded + Duration::days(self.rng.range(30, 121))).min(as_of))
            }
            _ => None,
        };
        let last_updated = [date_submitted, date_decided, date_funded, date_closed]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(date_created);

        let documents = self.documents(&id, asset_class, status, date_created);
        let notes = self.notes(&id, date_created);

        let mut agent_assignments = AgentAssignments::default();
        for stage in AgentStage::ALL {
            if stage.entry_progress() <= status.progress() {
                let agent_id = format!("{}-agent-{:02}", stage.as_str(), self.rng.range(1, 6));
                agent_assignments.assign(stage, agent_id);
            }
        }

        let mut application = LoanApplication {
            id,
            borrower,
            asset_class,
            amount,
            term,
            interest_rate,
            purpose,
            status,
            completeness: 0,
            risk,
            documents,
            notes,
            date_created,
            date_submitted,
            date_decided,
            date_funded,
            date_closed,
            last_updated,
            agent_assignments,
        };
        application.refresh_completeness();
        application
    }

    fn borrower(&mut self, index: usize, asset_class: AssetClass) -> Borrower {
        let first_name = self.rng.pick(FIRST_NAMES).to_string();
        let last_name = self.rng.pick(LAST_NAMES).to_string();
        let domain = self.rng.pick(EMAIL_DOMAINS);
        let email = format!(
            "{}.{}{}@{}",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            index,
            domain
        );
        let phone = format!(
            "({}) {}-{:04}",
            self.rng.range(201, 990),
            self.rng.range(201, 990),
            self.rng.range(0, 10_000)
        );

        // Average of two draws gives a hump around the middle of the band
        let spread = (self.rng.next_f64() + self.rng.next_f64()) / 2.0;
        let credit_score = (540.0 + spread * 310.0).round() as u16;

        let (company_name, industry, annual_revenue, years_in_business) =
            if asset_class.is_business() {
                let company = format!(
                    "{} {}",
                    self.rng.pick(COMPANY_STEMS),
                    self.rng.pick(COMPANY_SUFFIXES)
                );
                let revenue = (self.rng.range(250, 25_000) * 1_000) as f64;
                (
                    Some(company),
                    Some(self.rng.pick(INDUSTRIES).to_string()),
                    Some(revenue),
                    Some(self.rng.range(1, 31) as u32),
                )
            } else {
                (None, None, None, None)
            };

        let (city, state, zip_prefix) = *self.rng.pick(CITIES);
        let address = Address {
            street: format!("{} {}", self.rng.range(100, 9_999), self.rng.pick(STREETS)),
            city: city.to_string(),
            state: state.to_string(),
            zip_code: format!("{}{:02}", zip_prefix, self.rng.range(0, 100)),
        };

        Borrower {
            id: format!("BOR-{:05}", FIRST_BORROWER_NUMBER + index),
            first_name,
            last_name,
            email,
            phone,
            credit_score,
            credit_rating: credit_rating_for(credit_score).to_string(),
            company_name,
            industry,
            annual_revenue,
            years_in_business,
            address,
        }
    }

    fn documents(
        &mut self,
        application_id: &str,
        asset_class: AssetClass,
        status: LoanStatus,
        date_created: DateTime<Utc>,
    ) -> Vec<Document> {
        let upload_probability = match status.progress() {
            0 => 0.4,
            1 => 0.65,
            2 => 0.8,
            _ => 0.95,
        };

        let mut documents = Vec::new();
        for kind in asset_class.required_documents() {
            if !self.rng.chance(upload_probability) {
                continue;
            }
            let uploaded_at =
                (date_created + Duration::hours(self.rng.range(1, 96))).min(self.as_of);
            let roll = self.rng.next_f64();
            let doc_status = if status.has_decision() {
                if roll < 0.93 {
                    DocumentStatus::Verified
                } else {
                    DocumentStatus::Rejected
                }
            } else if roll < 0.5 {
                DocumentStatus::Pending
            } else if roll < 0.9 {
                DocumentStatus::Verified
            } else {
                DocumentStatus::Rejected
            };
            documents.push(self.document(
                application_id,
                documents.len(),
                kind,
                doc_status,
                uploaded_at,
            ));
        }

        // Waiting on the borrower implies something is outstanding
        if status == LoanStatus::InformationNeeded
            && asset_class.required_documents().iter().all(|kind| {
                documents.iter().any(|d| d.kind == *kind && d.status.is_usable())
            })
        {
            if let Some(last) = documents.last_mut() {
                last.status = DocumentStatus::Rejected;
                if last.reviewed_at.is_none() {
                    let reviewed_at = last.uploaded_at + Duration::hours(self.rng.range(2, 72));
                    last.reviewed_at = Some(reviewed_at.min(self.as_of));
                }
                last.analysis = Some(DocumentAnalysis {
                    summary: "Document illegible; re-upload requested.".to_string(),
                    confidence: 0.41,
                    flags: vec!["illegible".to_string()],
                });
            }
        }

        documents
    }

    fn document(
        &mut self,
        application_id: &str,
        ordinal: usize,
        kind: &str,
        status: DocumentStatus,
        uploaded_at: DateTime<Utc>,
    ) -> Document {
        let reviewed_at = (status != DocumentStatus::Pending)
            .then(|| (uploaded_at + Duration::hours(self.rng.range(2, 72))).min(self.as_of));
        let analysis = match status {
            DocumentStatus::Pending => None,
            DocumentStatus::Verified => Some(DocumentAnalysis {
                summary: format!("{} matches application data.", document_name(kind)),
                confidence: round2(self.rng.range_f64(0.85, 0.99)) as f32,
                flags: Vec::new(),
            }),
            DocumentStatus::Rejected => Some(DocumentAnalysis {
                summary: format!("{} could not be verified.", document_name(kind)),
                confidence: round2(self.rng.range_f64(0.40, 0.70)) as f32,
                flags: vec!["mismatch".to_string()],
            }),
        };

        Document {
            id: format!("DOC-{}-{:02}", &application_id[4..], ordinal + 1),
            name: document_name(kind).to_string(),
            kind: kind.to_string(),
            status,
            uploaded_at,
            reviewed_at,
            analysis,
        }
    }

    fn notes(&mut self, application_id: &str, date_created: DateTime<Utc>) -> Vec<Note> {
        let count = self.rng.range(0, 4) as usize;
        (0..count)
            .map(|i| Note {
                id: format!("NOTE-{}-{}", &application_id[4..], i + 1),
                author: self.rng.pick(NOTE_AUTHORS).to_string(),
                body: self.rng.pick(NOTE_BODIES).to_string(),
                created_at: (date_created + Duration::days(self.rng.range(0, 20))).min(self.as_of),
            })
            .collect()
    }
}

/// Unseeded population, as the dashboard loads it
pub fn generate_population(count: usize) -> Vec<LoanApplication> {
    PopulationGenerator::new(SeededRng::from_clock().next_u64()).generate(count)
}

/// Deterministic population for a given seed and reference time
pub fn generate_population_seeded(
    count: usize,
    seed: u64,
    as_of: DateTime<Utc>,
) -> Vec<LoanApplication> {
    PopulationGenerator::new(seed).as_of(as_of).generate(count)
}

pub fn generate_borrowers(count: usize, seed: u64) -> Vec<Borrower> {
    PopulationGenerator::new(seed).generate_borrowers(count)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_exact_count_and_unique_ids() {
        for count in [0, 1, 10, 50, 150] {
            let population = generate_population_seeded(count, 7, as_of());
            assert_eq!(population.len(), count);
            let ids: HashSet<_> = population.iter().map(|a| a.id.as_str()).collect();
            assert_eq!(ids.len(), count);
        }
    }

    #[test]
    fn test_reviewed_documents_carry_review_time() {
        for seed in 0..50 {
            for app in generate_population_seeded(150, seed, as_of()) {
                for doc in &app.documents {
                    match doc.status {
                        DocumentStatus::Pending => assert!(doc.reviewed_at.is_none(), "{}", doc.id),
                        _ => {
                            let reviewed_at = doc.reviewed_at.unwrap_or_else(|| {
                                panic!("{} {} has no review time", app.id, doc.id)
                            });
                            assert!(reviewed_at >= doc.uploaded_at && reviewed_at <= as_of());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_population() {
        let a = generate_population_seeded(50, 1234, as_of());
        let b = generate_population_seeded(50, 1234, as_of());
        assert_eq!(a, b);

        let c = generate_population_seeded(50, 4321, as_of());
        assert_ne!(a, c);
    }

    #[test]
    fn test_every_status_present_when_count_covers_enum() {
        let population = generate_population_seeded(LoanStatus::ALL.len(), 99, as_of());
        let statuses: HashSet<_> = population.iter().map(|a| a.status).collect();
        assert_eq!(statuses.len(), LoanStatus::ALL.len());
    }

    #[test]
    fn test_every_asset_class_reachable() {
        let population = generate_population_seeded(1000, 5, as_of());
        let classes: HashSet<_> = population.iter().map(|a| a.asset_class).collect();
        assert_eq!(classes.len(), AssetClass::ALL.len());
    }

    #[test]
    fn test_amounts_and_terms_follow_asset_class() {
        for app in generate_population_seeded(300, 11, as_of()) {
            let band = amount_band(app.asset_class);
            assert!(app.amount >= band.min as f64 && app.amount <= band.max as f64);
            assert!(terms(app.asset_class).contains(&app.term));
            assert!(app.interest_rate > 0.0);
        }
    }

    #[test]
    fn test_dates_follow_status() {
        for app in generate_population_seeded(300, 21, as_of()) {
            assert_eq!(app.date_submitted.is_some(), app.status != LoanStatus::Draft);
            assert_eq!(app.date_decided.is_some(), app.status.has_decision());
            assert_eq!(
                app.date_closed.is_some(),
                app.status == LoanStatus::Closed
            );
            assert!(app.last_updated <= as_of());
            assert!(app.date_created <= app.last_updated);
        }
    }

    #[test]
    fn test_completeness_matches_documents() {
        for app in generate_population_seeded(200, 8, as_of()) {
            assert_eq!(app.completeness, app.compute_completeness());
            if app.missing_documents().is_empty() {
                assert_eq!(app.completeness, 100);
            } else {
                assert!(app.completeness < 100);
            }
        }
    }

    #[test]
    fn test_information_needed_has_outstanding_documents() {
        let population = generate_population_seeded(400, 13, as_of());
        for app in population
            .iter()
            .filter(|a| a.status == LoanStatus::InformationNeeded)
        {
            assert!(!app.missing_documents().is_empty(), "{} has nothing outstanding", app.id);
        }
    }

    #[test]
    fn test_business_classes_have_company_fields() {
        for app in generate_population_seeded(200, 17, as_of()) {
            assert_eq!(
                app.borrower.company_name.is_some(),
                app.asset_class.is_business()
            );
        }
    }

    #[test]
    fn test_low_credit_biases_toward_high_risk() {
        let population = generate_population_seeded(1500, 23, as_of());
        let high_share = |apps: Vec<&LoanApplication>| {
            let total = apps.len().max(1) as f64;
            apps.iter().filter(|a| a.risk == RiskRating::High).count() as f64 / total
        };
        let weak = high_share(
            population
                .iter()
                .filter(|a| a.borrower.credit_score < 620)
                .collect(),
        );
        let strong = high_share(
            population
                .iter()
                .filter(|a| a.borrower.credit_score >= 760)
                .collect(),
        );
        assert!(weak > strong);
    }

    #[test]
    fn test_agent_assignments_follow_progress() {
        for app in generate_population_seeded(100, 31, as_of()) {
            assert!(app.agent_assignments.get(AgentStage::Intake).is_some());
            assert_eq!(
                app.agent_assignments.get(AgentStage::Decision).is_some(),
                app.status.has_decision()
            );
        }
    }

    #[test]
    fn test_generate_borrowers() {
        let borrowers = generate_borrowers(25, 3);
        assert_eq!(borrowers.len(), 25);
        assert!(borrowers.iter().all(|b| (540..=850).contains(&b.credit_score)));
    }
}
