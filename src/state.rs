use std::path::PathBuf;
use std::sync::Arc;

use payment_lens::data::filter::{
    evaluate, specialty_totals, state_intensity, Constraints, FilterOutcome,
};
use payment_lens::data::model::DerivedTables;
use payment_lens::data::store;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Structure,
    Inequality,
    Map,
    Rows,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Derived tables, loaded once per folder and shared read-only.
    pub tables: Option<Arc<DerivedTables>>,

    /// Folder the tables were loaded from.
    pub data_dir: PathBuf,

    /// Current user constraints.
    pub constraints: Constraints,

    /// Result of the engine for `constraints` (cached).
    pub outcome: FilterOutcome,

    /// Per-specialty sums of `outcome.rows`, largest first.
    pub specialty_totals: Vec<(String, f64)>,

    /// Payment per household per state, independent of the filters.
    pub state_intensity: Vec<(String, f64)>,

    pub tab: Tab,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            tables: None,
            data_dir,
            constraints: Constraints::select_all(&DerivedTables::default()),
            outcome: FilterOutcome::default(),
            specialty_totals: Vec::new(),
            state_intensity: Vec::new(),
            tab: Tab::Structure,
            status_message: None,
        }
    }

    /// Load the derived tables from `dir`, keeping the current ones on error.
    pub fn load_dir(&mut self, dir: PathBuf) {
        match store::load_tables(&dir) {
            Ok(tables) => {
                log::info!(
                    "Loaded {} states and {} detail rows from {}",
                    tables.states.len(),
                    tables.details.len(),
                    dir.display()
                );
                self.data_dir = dir;
                self.set_tables(tables);
            }
            Err(e) => {
                log::error!("Failed to load derived tables: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Install freshly loaded tables and reset the constraints.
    pub fn set_tables(&mut self, tables: DerivedTables) {
        self.constraints = Constraints::initial(&tables);
        self.state_intensity = state_intensity(&tables);
        self.tables = Some(Arc::new(tables));
        self.status_message = None;
        self.refilter();
    }

    /// Re-run the engine after a constraint change.
    pub fn refilter(&mut self) {
        if let Some(tables) = &self.tables {
            self.outcome = evaluate(tables, &self.constraints);
            self.specialty_totals = specialty_totals(tables, &self.outcome.rows);
        }
    }

    pub fn toggle_state(&mut self, code: &str) {
        toggle(&mut self.constraints.states, code);
        self.refilter();
    }

    pub fn toggle_specialty(&mut self, specialty: &str) {
        toggle(&mut self.constraints.specialties, specialty);
        self.refilter();
    }

    pub fn select_all_states(&mut self, all: bool) {
        self.constraints.states = match (&self.tables, all) {
            (Some(t), true) => t.state_codes().into_iter().collect(),
            _ => Default::default(),
        };
        self.refilter();
    }

    pub fn select_all_specialties(&mut self, all: bool) {
        self.constraints.specialties = match (&self.tables, all) {
            (Some(t), true) => t.specialties().into_iter().collect(),
            _ => Default::default(),
        };
        self.refilter();
    }

    /// Set the income band, keeping `lo <= hi` inside [0, 100].
    pub fn set_income_range(&mut self, lo: f64, hi: f64) {
        let lo = lo.clamp(0.0, 100.0);
        let hi = hi.clamp(0.0, 100.0);
        self.constraints.income_range = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.refilter();
    }

    pub fn set_top_percent(&mut self, pct: f64) {
        self.constraints.top_percent = pct.clamp(1.0, 100.0);
        self.refilter();
    }
}

fn toggle(set: &mut std::collections::BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_lens::data::model::{DetailAggregate, StateSummary};

    fn tables() -> DerivedTables {
        let state = |code: &str, pct: f64| StateSummary {
            state: code.to_string(),
            total_payment_amount: 10.0,
            median_income: Some(pct),
            total_households: Some(5),
            payment_per_household: Some(2.0),
            fips_code: None,
            income_percentile: Some(pct),
        };
        let detail = |code: &str, specialty: &str, amount: f64| DetailAggregate {
            state: code.to_string(),
            specialty_clean: specialty.to_string(),
            payment_type_clean: "Grant".to_string(),
            payment_amount: amount,
        };
        DerivedTables {
            states: vec![state("CA", 100.0), state("TX", 50.0)],
            details: vec![
                detail("CA", "Internal Medicine", 8.0),
                detail("TX", "Internal Medicine", 2.0),
                detail("TX", "Dermatology", 4.0),
            ],
        }
    }

    #[test]
    fn set_tables_applies_initial_constraints() {
        let mut state = AppState::new(PathBuf::new());
        state.set_tables(tables());
        assert_eq!(state.outcome.record_count, 2);
        assert_eq!(state.outcome.total_payments, 10.0);
        assert_eq!(state.specialty_totals, vec![("Internal Medicine".to_string(), 10.0)]);
    }

    #[test]
    fn toggles_refilter() {
        let mut state = AppState::new(PathBuf::new());
        state.set_tables(tables());
        state.toggle_state("CA");
        assert_eq!(state.outcome.rows, vec![1]);
        state.toggle_specialty("Dermatology");
        assert_eq!(state.outcome.rows, vec![1, 2]);
        state.select_all_states(false);
        assert!(state.outcome.is_empty());
    }

    #[test]
    fn income_range_is_ordered_and_clamped() {
        let mut state = AppState::new(PathBuf::new());
        state.set_tables(tables());
        state.set_income_range(120.0, 60.0);
        assert_eq!(state.constraints.income_range, (60.0, 100.0));
        assert_eq!(state.outcome.rows, vec![0]);
    }

    #[test]
    fn failed_load_keeps_status() {
        let mut state = AppState::new(PathBuf::new());
        state.load_dir(PathBuf::from("/nonexistent/derived-data"));
        assert!(state.tables.is_none());
        assert!(state.status_message.is_some());
    }
}
