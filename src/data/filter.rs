use std::collections::{BTreeMap, BTreeSet};

use super::model::{DerivedTables, DetailAggregate, StateSummary};
use super::stats::{self, LorenzPoint};

/// Quantile used for the top-1% share.
const TOP_ONE_QUANTILE: f64 = 0.99;

/// Specialties selected when the dashboard first opens, if the data has them.
pub const DEFAULT_SPECIALTIES: [&str; 2] = ["Orthopaedic Surgery", "Internal Medicine"];

// ---------------------------------------------------------------------------
// Constraints – the four user-chosen inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub specialties: BTreeSet<String>,
    pub states: BTreeSet<String>,
    /// Inclusive income-percentile band, both ends in [0, 100].
    pub income_range: (f64, f64),
    /// Keep the highest `top_percent` of rows by amount. 100 keeps everything.
    pub top_percent: f64,
}

impl Constraints {
    /// Everything selected: every specialty, every state, full band, 100%.
    pub fn select_all(tables: &DerivedTables) -> Self {
        Self {
            specialties: tables.specialties().into_iter().collect(),
            states: tables.state_codes().into_iter().collect(),
            income_range: (0.0, 100.0),
            top_percent: 100.0,
        }
    }

    /// Dashboard start-up selection: all states, the default specialties
    /// that exist in the data (or all specialties if none do).
    pub fn initial(tables: &DerivedTables) -> Self {
        let mut c = Self::select_all(tables);
        let defaults: BTreeSet<String> = DEFAULT_SPECIALTIES
            .iter()
            .filter(|s| c.specialties.contains(**s))
            .map(|s| s.to_string())
            .collect();
        if !defaults.is_empty() {
            c.specialties = defaults;
        }
        c
    }
}

// ---------------------------------------------------------------------------
// Outcome – filtered rows plus derived metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Indices into `DerivedTables::details` that pass every constraint.
    pub rows: Vec<usize>,
    /// Amount threshold applied by the top-% step, if it ran.
    pub threshold: Option<f64>,
    pub total_payments: f64,
    /// In [0, 1]; zero when `total_payments` is zero.
    pub top_1_share: f64,
    pub record_count: usize,
    pub lorenz: Vec<LorenzPoint>,
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// States whose income percentile lies in `[lo, hi]`. States without a
/// percentile are never in the band.
pub fn income_band_states(states: &[StateSummary], (lo, hi): (f64, f64)) -> BTreeSet<&str> {
    states
        .iter()
        .filter(|s| s.income_percentile.is_some_and(|p| p >= lo && p <= hi))
        .map(|s| s.state.as_str())
        .collect()
}

/// Apply `constraints` to the detail table and compute the concentration
/// metrics over the surviving aggregate rows.
///
/// A state must be both explicitly selected and inside the income band.
/// Pure: the tables are only read, and an empty result yields zeroed
/// metrics and an empty Lorenz curve.
pub fn evaluate(tables: &DerivedTables, constraints: &Constraints) -> FilterOutcome {
    let band = income_band_states(&tables.states, constraints.income_range);
    let eligible: BTreeSet<&str> = constraints
        .states
        .iter()
        .map(String::as_str)
        .filter(|s| band.contains(s))
        .collect();

    let mut rows: Vec<usize> = tables
        .details
        .iter()
        .enumerate()
        .filter(|(_, d)| {
            constraints.specialties.contains(&d.specialty_clean)
                && eligible.contains(d.state.as_str())
        })
        .map(|(i, _)| i)
        .collect();

    let mut threshold = None;
    if constraints.top_percent < 100.0 && !rows.is_empty() {
        let amounts = amounts_of(&tables.details, &rows);
        let p = 1.0 - constraints.top_percent / 100.0;
        if let Some(t) = stats::quantile(&amounts, p) {
            rows.retain(|&i| tables.details[i].payment_amount >= t);
            threshold = Some(t);
        }
    }

    let amounts = amounts_of(&tables.details, &rows);
    let total_payments: f64 = amounts.iter().sum();
    let top_1_share = if total_payments > 0.0 {
        stats::top_share(&amounts, TOP_ONE_QUANTILE)
    } else {
        0.0
    };

    FilterOutcome {
        record_count: rows.len(),
        lorenz: stats::lorenz_curve(&amounts),
        rows,
        threshold,
        total_payments,
        top_1_share,
    }
}

fn amounts_of(details: &[DetailAggregate], rows: &[usize]) -> Vec<f64> {
    rows.iter().map(|&i| details[i].payment_amount).collect()
}

// ---------------------------------------------------------------------------
// Breakdowns for the charts
// ---------------------------------------------------------------------------

/// Summed amount per specialty over `rows`, largest first (ties by name).
pub fn specialty_totals(tables: &DerivedTables, rows: &[usize]) -> Vec<(String, f64)> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for &i in rows {
        let d = &tables.details[i];
        *sums.entry(d.specialty_clean.as_str()).or_default() += d.payment_amount;
    }
    let mut out: Vec<(String, f64)> = sums.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Payment per household for every state that has one, largest first.
pub fn state_intensity(tables: &DerivedTables) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = tables
        .states
        .iter()
        .filter_map(|s| s.payment_per_household.map(|v| (s.state.clone(), v)))
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(code: &str, pct: Option<f64>) -> StateSummary {
        StateSummary {
            state: code.to_string(),
            total_payment_amount: 0.0,
            median_income: None,
            total_households: None,
            payment_per_household: None,
            fips_code: None,
            income_percentile: pct,
        }
    }

    fn detail(state: &str, specialty: &str, amount: f64) -> DetailAggregate {
        DetailAggregate {
            state: state.to_string(),
            specialty_clean: specialty.to_string(),
            payment_type_clean: "Other".to_string(),
            payment_amount: amount,
        }
    }

    fn tables() -> DerivedTables {
        DerivedTables {
            states: vec![
                state("CA", Some(100.0)),
                state("NY", Some(75.0)),
                state("TX", Some(50.0)),
                state("MS", Some(25.0)),
            ],
            details: vec![
                detail("CA", "Cardiology", 10.0),
                detail("NY", "Cardiology", 20.0),
                detail("TX", "Cardiology", 30.0),
                detail("MS", "Cardiology", 40.0),
                detail("CA", "Dermatology", 5.0),
                detail("Unknown", "Cardiology", 1000.0),
            ],
        }
    }

    fn cardiology(tables: &DerivedTables) -> Constraints {
        let mut c = Constraints::select_all(tables);
        c.specialties = ["Cardiology".to_string()].into();
        c
    }

    #[test]
    fn top_percent_keeps_rows_at_or_above_threshold() {
        let t = tables();
        let mut c = cardiology(&t);
        c.top_percent = 25.0;
        let out = evaluate(&t, &c);
        assert_eq!(out.threshold, Some(32.5));
        assert_eq!(out.rows, vec![3]);
        assert_eq!(out.total_payments, 40.0);
        assert_eq!(out.top_1_share, 1.0);
    }

    #[test]
    fn hundred_percent_is_identity() {
        let t = tables();
        let out = evaluate(&t, &cardiology(&t));
        assert_eq!(out.threshold, None);
        assert_eq!(out.rows, vec![0, 1, 2, 3]);
        assert_eq!(out.record_count, 4);
        assert_eq!(out.total_payments, 100.0);
    }

    #[test]
    fn unknown_state_never_passes() {
        let t = tables();
        let out = evaluate(&t, &cardiology(&t));
        assert!(!out.rows.contains(&5));
    }

    #[test]
    fn explicit_selection_must_also_satisfy_income_band() {
        let t = tables();
        let mut c = cardiology(&t);
        c.states = ["CA".to_string(), "MS".to_string()].into();
        c.income_range = (50.0, 100.0);
        let out = evaluate(&t, &c);
        assert_eq!(out.rows, vec![0]);
    }

    #[test]
    fn income_band_is_inclusive() {
        let t = tables();
        let band = income_band_states(&t.states, (25.0, 75.0));
        assert_eq!(band.into_iter().collect::<Vec<_>>(), vec!["MS", "NY", "TX"]);
    }

    #[test]
    fn empty_selection_yields_zero_metrics() {
        let t = tables();
        let mut c = cardiology(&t);
        c.specialties.clear();
        c.top_percent = 10.0;
        let out = evaluate(&t, &c);
        assert!(out.is_empty());
        assert_eq!(out.threshold, None);
        assert_eq!(out.total_payments, 0.0);
        assert_eq!(out.top_1_share, 0.0);
        assert_eq!(out.record_count, 0);
        assert!(out.lorenz.is_empty());
    }

    #[test]
    fn initial_prefers_default_specialties() {
        let mut t = tables();
        t.details.push(detail("CA", "Internal Medicine", 3.0));
        let c = Constraints::initial(&t);
        assert_eq!(c.specialties.len(), 1);
        assert!(c.specialties.contains("Internal Medicine"));

        let c = Constraints::initial(&tables());
        assert_eq!(c.specialties.len(), 2);
    }

    #[test]
    fn specialty_totals_sorted_descending() {
        let t = tables();
        let totals = specialty_totals(&t, &[0, 1, 4]);
        assert_eq!(
            totals,
            vec![("Cardiology".to_string(), 30.0), ("Dermatology".to_string(), 5.0)]
        );
    }
}
