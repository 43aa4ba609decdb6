use std::collections::BTreeMap;

use log::{debug, info};

use super::lookup;
use super::model::{DerivedTables, DetailAggregate, PaymentRecord, StateIndicator, StateSummary};
use super::stats::percentile_ranks;

/// Total payment amount per state, keyed and ordered by state code.
pub fn state_totals(records: &[PaymentRecord]) -> BTreeMap<&str, f64> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for r in records {
        *totals.entry(r.state.as_str()).or_default() += r.payment_amount;
    }
    totals
}

/// `total / households`, undefined when there are no households.
pub fn per_household(total: f64, households: Option<u64>) -> Option<f64> {
    match households {
        Some(h) if h > 0 => Some(total / h as f64),
        _ => None,
    }
}

/// Inner join of per-state payment totals with census indicators.
///
/// States missing from either side are dropped. `income_percentile` is
/// ranked over the joined states only.
pub fn build_state_summary(
    records: &[PaymentRecord],
    indicators: &[StateIndicator],
) -> Vec<StateSummary> {
    let by_abbr: BTreeMap<&str, &StateIndicator> = indicators
        .iter()
        .map(|ind| (ind.state_abbr.as_str(), ind))
        .collect();

    let totals = state_totals(records);
    let mut summary: Vec<StateSummary> = totals
        .iter()
        .filter_map(|(&state, &total)| {
            let Some(ind) = by_abbr.get(state) else {
                debug!("No census indicators for state '{state}', leaving it out of the summary");
                return None;
            };
            Some(StateSummary {
                state: state.to_string(),
                total_payment_amount: total,
                median_income: ind.median_income,
                total_households: ind.total_households,
                payment_per_household: per_household(total, ind.total_households),
                fips_code: lookup::fips_code(state),
                income_percentile: None,
            })
        })
        .collect();

    assign_income_percentiles(&mut summary);

    info!(
        "Joined {} payment states with {} census states into {} summary rows",
        totals.len(),
        indicators.len(),
        summary.len()
    );
    summary
}

/// Fill `income_percentile` from `median_income` across the given rows.
pub fn assign_income_percentiles(states: &mut [StateSummary]) {
    let incomes: Vec<Option<f64>> = states.iter().map(|s| s.median_income).collect();
    for (s, pct) in states.iter_mut().zip(percentile_ranks(&incomes)) {
        s.income_percentile = pct;
    }
}

/// Sum payments per (state, specialty, payment type), ordered by that key.
pub fn build_detail(records: &[PaymentRecord]) -> Vec<DetailAggregate> {
    let mut groups: BTreeMap<(&str, &str, &str), f64> = BTreeMap::new();
    for r in records {
        *groups
            .entry((r.state.as_str(), r.specialty.as_str(), r.payment_type.label()))
            .or_default() += r.payment_amount;
    }

    let detail: Vec<DetailAggregate> = groups
        .into_iter()
        .map(|((state, specialty, kind), amount)| DetailAggregate {
            state: state.to_string(),
            specialty_clean: specialty.to_string(),
            payment_type_clean: kind.to_string(),
            payment_amount: amount,
        })
        .collect();

    info!(
        "Aggregated {} payment records into {} detail rows",
        records.len(),
        detail.len()
    );
    detail
}

/// Build both derived tables from the cleaned inputs.
pub fn build_tables(records: &[PaymentRecord], indicators: &[StateIndicator]) -> DerivedTables {
    DerivedTables {
        states: build_state_summary(records, indicators),
        details: build_detail(records),
    }
}
