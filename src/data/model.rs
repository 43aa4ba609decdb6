use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PaymentCategory – closed vocabulary for the payment-nature column
// ---------------------------------------------------------------------------

/// Short label for a disclosed "nature of payment" string.
///
/// The mapping is an exact-match lookup over the long-form strings used in
/// the disclosure files. Anything not in the table, including a missing
/// value, lands in [`PaymentCategory::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaymentCategory {
    NonConsultingServices,
    Consulting,
    FoodAndBeverage,
    TravelAndLodging,
    RoyaltyOrLicense,
    Honoraria,
    Education,
    Grant,
    Acquisitions,
    Entertainment,
    DeviceLoan,
    Other,
}

impl PaymentCategory {
    /// Map a raw nature-of-payment string to its category.
    pub fn from_nature(nature: Option<&str>) -> Self {
        match nature {
            Some(
                "Compensation for services other than consulting, including serving as faculty \
                 or as a speaker at a venue other than a continuing education program",
            ) => PaymentCategory::NonConsultingServices,
            Some("Consulting Fee") => PaymentCategory::Consulting,
            Some("Food and Beverage") => PaymentCategory::FoodAndBeverage,
            Some("Travel and Lodging") => PaymentCategory::TravelAndLodging,
            Some("Royalty or License") => PaymentCategory::RoyaltyOrLicense,
            Some("Honoraria") => PaymentCategory::Honoraria,
            Some("Education") => PaymentCategory::Education,
            Some("Grant") => PaymentCategory::Grant,
            Some("Acquisitions") => PaymentCategory::Acquisitions,
            Some("Entertainment") => PaymentCategory::Entertainment,
            Some("Long term medical supply or device loan") => PaymentCategory::DeviceLoan,
            _ => PaymentCategory::Other,
        }
    }

    /// Label written to the derived tables.
    pub fn label(self) -> &'static str {
        match self {
            PaymentCategory::NonConsultingServices => "Non-consulting professional services",
            PaymentCategory::Consulting => "Consulting",
            PaymentCategory::FoodAndBeverage => "Food & Beverage",
            PaymentCategory::TravelAndLodging => "Travel & Lodging",
            PaymentCategory::RoyaltyOrLicense => "Royalty / License",
            PaymentCategory::Honoraria => "Honoraria",
            PaymentCategory::Education => "Education",
            PaymentCategory::Grant => "Grant",
            PaymentCategory::Acquisitions => "Acquisitions",
            PaymentCategory::Entertainment => "Entertainment",
            PaymentCategory::DeviceLoan => "Device / Supply Loan",
            PaymentCategory::Other => "Other",
        }
    }
}

// ---------------------------------------------------------------------------
// Cleaned inputs
// ---------------------------------------------------------------------------

/// One disclosed transfer after cleaning. `payment_amount` is always > 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub recipient_id: Option<String>,
    /// Canonical specialty: last non-empty segment of the pipe-delimited list.
    pub specialty: String,
    pub payment_amount: f64,
    pub payment_date: Option<String>,
    /// Raw nature-of-payment text as disclosed.
    pub payment_nature: Option<String>,
    pub payment_type: PaymentCategory,
    /// Two-letter code, or `"Unknown"` when the source left it blank.
    pub state: String,
}

/// Census indicators for one state (one column of the census cross-tab).
#[derive(Debug, Clone, PartialEq)]
pub struct StateIndicator {
    pub state_name: String,
    pub state_abbr: String,
    pub median_income: Option<f64>,
    pub total_households: Option<u64>,
}

// ---------------------------------------------------------------------------
// Derived tables
// ---------------------------------------------------------------------------

/// One row of the per-state summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub state: String,
    pub total_payment_amount: f64,
    #[serde(alias = "median_household_income", alias = "household_income")]
    pub median_income: Option<f64>,
    pub total_households: Option<u64>,
    pub payment_per_household: Option<f64>,
    #[serde(default)]
    pub fips_code: Option<u8>,
    #[serde(default)]
    pub income_percentile: Option<f64>,
}

/// Summed payments for one (state, specialty, payment type) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailAggregate {
    pub state: String,
    pub specialty_clean: String,
    pub payment_type_clean: String,
    pub payment_amount: f64,
}

/// The two derived tables, as persisted by the pipeline and read by the
/// dashboard. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTables {
    pub states: Vec<StateSummary>,
    pub details: Vec<DetailAggregate>,
}

impl DerivedTables {
    /// Sorted, de-duplicated state codes from the summary table.
    pub fn state_codes(&self) -> Vec<String> {
        self.states
            .iter()
            .map(|s| s.state.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted, de-duplicated specialties from the detail table.
    pub fn specialties(&self) -> Vec<String> {
        self.details
            .iter()
            .map(|d| d.specialty_clean.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn state(&self, code: &str) -> Option<&StateSummary> {
        self.states.iter().find(|s| s.state == code)
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}
