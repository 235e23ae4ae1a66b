//! Static pools the generator draws from

use crate::models::{AssetClass, LoanStatus};

pub const FIRST_NAMES: &[&str] = &[
    "James", "Maria", "Robert", "Linda", "Michael", "Aisha", "David", "Elena", "Daniel", "Priya",
    "Thomas", "Grace", "Kevin", "Sofia", "Brian", "Hannah", "Samuel", "Chloe", "Marcus", "Yuki",
    "Andre", "Fatima", "Peter", "Olivia", "Victor", "Nadia",
];

pub const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Garcia", "Nguyen", "Patel", "Brown", "Okafor", "Miller", "Davis",
    "Rodriguez", "Kim", "Walker", "Hughes", "Novak", "Bennett", "Schmidt", "Rossi", "Chen",
    "Martin", "Lopez", "Fischer", "Reyes",
];

pub const STREETS: &[&str] = &[
    "Main St", "Oak Ave", "Maple Dr", "Cedar Ln", "Park Blvd", "Lakeview Rd", "Pine St",
    "Harbor Way", "Elm Ct", "Commerce Pkwy",
];

/// (city, state, zip prefix)
pub const CITIES: &[(&str, &str, &str)] = &[
    ("Austin", "TX", "787"),
    ("Denver", "CO", "802"),
    ("Columbus", "OH", "432"),
    ("Charlotte", "NC", "282"),
    ("Phoenix", "AZ", "850"),
    ("Seattle", "WA", "981"),
    ("Atlanta", "GA", "303"),
    ("Minneapolis", "MN", "554"),
    ("Portland", "OR", "972"),
    ("Nashville", "TN", "372"),
];

pub const EMAIL_DOMAINS: &[&str] = &["example.com", "mailbox.test", "inbox.example.org"];

pub const COMPANY_STEMS: &[&str] = &[
    "Summit", "Bluewater", "Ironbridge", "Northstar", "Redwood", "Keystone", "Silverline",
    "Harborview", "Granite", "Evergreen", "Pioneer", "Crescent",
];

pub const COMPANY_SUFFIXES: &[&str] = &["LLC", "Inc.", "Holdings", "Group", "Partners", "Co."];

pub const INDUSTRIES: &[&str] = &[
    "Manufacturing", "Retail", "Healthcare", "Construction", "Logistics", "Hospitality",
    "Technology", "Agriculture", "Professional Services", "Real Estate",
];

pub const ASSET_CLASS_WEIGHTS: &[(AssetClass, u32)] = &[
    (AssetClass::ResidentialMortgage, 25),
    (AssetClass::CommercialRealEstate, 15),
    (AssetClass::AutoLoan, 15),
    (AssetClass::PersonalLoan, 14),
    (AssetClass::SmeLoan, 14),
    (AssetClass::EquipmentFinance, 11),
    (AssetClass::Other, 6),
];

pub const STATUS_WEIGHTS: &[(LoanStatus, u32)] = &[
    (LoanStatus::Draft, 6),
    (LoanStatus::Submitted, 10),
    (LoanStatus::Reviewing, 14),
    (LoanStatus::InformationNeeded, 8),
    (LoanStatus::Underwriting, 14),
    (LoanStatus::Approved, 12),
    (LoanStatus::ConditionallyApproved, 8),
    (LoanStatus::Rejected, 8),
    (LoanStatus::Funding, 6),
    (LoanStatus::Funded, 8),
    (LoanStatus::Closed, 6),
];

pub const NOTE_AUTHORS: &[&str] = &[
    "Loan Officer",
    "Credit Analyst",
    "Underwriter",
    "Processing Team",
    "Compliance",
];

pub const NOTE_BODIES: &[&str] = &[
    "Borrower confirmed contact details by phone.",
    "Requested updated bank statements for the last quarter.",
    "Collateral valuation scheduled with external appraiser.",
    "Income figures reconciled against tax returns.",
    "Borrower asked about early repayment terms.",
    "Flagged for secondary review due to loan size.",
    "Employment verification completed.",
];

/// Amount range in currency units, rounded to `step`
pub struct AmountBand {
    pub min: i64,
    pub max: i64,
    pub step: i64,
}

pub fn amount_band(class: AssetClass) -> AmountBand {
    match class {
        AssetClass::ResidentialMortgage => AmountBand {
            min: 150_000,
            max: 1_200_000,
            step: 5_000,
        },
        AssetClass::CommercialRealEstate => AmountBand {
            min: 500_000,
            max: 10_000_000,
            step: 25_000,
        },
        AssetClass::AutoLoan => AmountBand {
            min: 15_000,
            max: 90_000,
            step: 500,
        },
        AssetClass::PersonalLoan => AmountBand {
            min: 5_000,
            max: 75_000,
            step: 500,
        },
        AssetClass::SmeLoan => AmountBand {
            min: 50_000,
            max: 2_000_000,
            step: 5_000,
        },
        AssetClass::EquipmentFinance => AmountBand {
            min: 25_000,
            max: 1_500_000,
            step: 5_000,
        },
        AssetClass::Other => AmountBand {
            min: 10_000,
            max: 500_000,
            step: 1_000,
        },
    }
}

/// Term choices in months
pub fn terms(class: AssetClass) -> &'static [u32] {
    match class {
        AssetClass::ResidentialMortgage => &[180, 240, 360],
        AssetClass::CommercialRealEstate => &[60, 84, 120],
        AssetClass::AutoLoan => &[36, 48, 60, 72],
        AssetClass::PersonalLoan => &[12, 24, 36, 60],
        AssetClass::SmeLoan => &[12, 24, 36, 60, 84],
        AssetClass::EquipmentFinance => &[24, 36, 48, 60, 84],
        AssetClass::Other => &[12, 24, 36, 60],
    }
}

/// Base annual rate in percent before the risk spread
pub fn base_rate(class: AssetClass) -> f64 {
    match class {
        AssetClass::ResidentialMortgage => 6.25,
        AssetClass::CommercialRealEstate => 7.10,
        AssetClass::AutoLoan => 7.40,
        AssetClass::PersonalLoan => 10.90,
        AssetClass::SmeLoan => 8.60,
        AssetClass::EquipmentFinance => 7.90,
        AssetClass::Other => 9.50,
    }
}

pub fn purposes(class: AssetClass) -> &'static [&'static str] {
    match class {
        AssetClass::ResidentialMortgage => &[
            "Purchase of primary residence",
            "Refinance existing mortgage",
            "Purchase of second home",
        ],
        AssetClass::CommercialRealEstate => &[
            "Acquisition of multi-tenant office building",
            "Refinance retail center",
            "Construction of warehouse facility",
        ],
        AssetClass::AutoLoan => &["New vehicle purchase", "Used vehicle purchase", "Fleet vehicle"],
        AssetClass::PersonalLoan => &[
            "Debt consolidation",
            "Home improvement",
            "Medical expenses",
        ],
        AssetClass::SmeLoan => &[
            "Working capital",
            "Business expansion",
            "Inventory financing",
        ],
        AssetClass::EquipmentFinance => &[
            "CNC machinery purchase",
            "Medical imaging equipment",
            "Construction equipment",
        ],
        AssetClass::Other => &["Education financing", "Bridge financing", "Special purpose"],
    }
}

pub fn document_name(kind: &str) -> &'static str {
    match kind {
        "identity_document" => "Government ID",
        "proof_of_income" => "Proof of Income",
        "bank_statements" => "Bank Statements (3 months)",
        "property_appraisal" => "Property Appraisal Report",
        "purchase_agreement" => "Purchase Agreement",
        "business_registration" => "Certificate of Incorporation",
        "financial_statements" => "Audited Financial Statements",
        "tax_returns" => "Tax Returns (2 years)",
        "rent_roll" => "Current Rent Roll",
        "environmental_report" => "Phase I Environmental Report",
        "vehicle_invoice" => "Dealer Invoice",
        "business_plan" => "Business Plan",
        "equipment_quote" => "Vendor Equipment Quote",
        _ => "Supporting Document",
    }
}
