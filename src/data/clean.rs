use std::collections::BTreeSet;
use std::io::Read;

use anyhow::{Context, Result};
use csv::StringRecord;
use log::{debug, info, warn};

use super::lookup;
use super::model::{PaymentCategory, PaymentRecord, StateIndicator};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Source column names
// ---------------------------------------------------------------------------

pub const RECIPIENT_COLUMN: &str = "Covered_Recipient_Profile_ID";
pub const SPECIALTY_COLUMN: &str = "Covered_Recipient_Specialty_1";
pub const AMOUNT_COLUMN: &str = "Total_Amount_of_Payment_USDollars";
pub const DATE_COLUMN: &str = "Date_of_Payment";
pub const NATURE_COLUMN: &str = "Nature_of_Payment_or_Transfer_of_Value";
pub const STATE_COLUMN: &str = "Recipient_State";

/// Every column kept from the national payments file.
pub const PAYMENT_SOURCE_COLUMNS: [&str; 6] = [
    RECIPIENT_COLUMN,
    SPECIALTY_COLUMN,
    AMOUNT_COLUMN,
    DATE_COLUMN,
    NATURE_COLUMN,
    STATE_COLUMN,
];

pub const LABEL_COLUMN: &str = "Label (Grouping)";
pub const INCOME_LABEL: &str = "Median household income (dollars)";
pub const HOUSEHOLDS_LABEL: &str = "Total households";
const ESTIMATE_MARKER: &str = "!!Estimate";

pub const UNKNOWN: &str = "Unknown";

/// Position of `name` in a header row. A leading byte-order mark is ignored.
pub fn column_index(headers: &StringRecord, name: &str, file: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        .ok_or_else(|| PipelineError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Last non-empty segment of a pipe-delimited specialty list.
pub fn canonical_specialty(raw: Option<&str>) -> String {
    raw.and_then(|s| s.split('|').map(str::trim).filter(|seg| !seg.is_empty()).last())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Parse and validate a payment amount. Missing, unparseable, non-finite and
/// non-positive amounts all yield `None`.
pub fn parse_amount(raw: Option<&str>) -> Option<f64> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a > 0.0)
}

/// Read the raw payments CSV and return the cleaned records.
///
/// The four analysis columns are required; the recipient and date columns
/// are carried through when present. Rows whose amount is missing or not
/// positive are dropped.
pub fn clean_payments<R: Read>(reader: R, source: &str) -> Result<Vec<PaymentRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .with_context(|| format!("{source}: reading CSV headers"))?
        .clone();

    let specialty_idx = column_index(&headers, SPECIALTY_COLUMN, source)?;
    let amount_idx = column_index(&headers, AMOUNT_COLUMN, source)?;
    let state_idx = column_index(&headers, STATE_COLUMN, source)?;
    let nature_idx = column_index(&headers, NATURE_COLUMN, source)?;
    let recipient_idx = column_index(&headers, RECIPIENT_COLUMN, source).ok();
    let date_idx = column_index(&headers, DATE_COLUMN, source).ok();

    let mut records = Vec::new();
    let mut seen = 0usize;
    let mut missing_state = 0usize;
    let mut other_nature = 0usize;

    for (row_no, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("{source}: CSV row {row_no}"))?;
        seen += 1;

        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let Some(payment_amount) = parse_amount(field(Some(amount_idx))) else {
            continue;
        };

        // Exact-match lookup: the nature text is not trimmed.
        let payment_nature = record
            .get(nature_idx)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let payment_type = PaymentCategory::from_nature(payment_nature.as_deref());
        if payment_type == PaymentCategory::Other {
            other_nature += 1;
        }

        let state = match field(Some(state_idx)) {
            Some(s) => s.to_string(),
            None => {
                missing_state += 1;
                UNKNOWN.to_string()
            }
        };

        records.push(PaymentRecord {
            recipient_id: field(recipient_idx).map(str::to_string),
            specialty: canonical_specialty(field(Some(specialty_idx))),
            payment_amount,
            payment_date: field(date_idx).map(str::to_string),
            payment_nature,
            payment_type,
            state,
        });
    }

    info!(
        "{source}: kept {} of {seen} payment rows ({} dropped for missing or non-positive amounts)",
        records.len(),
        seen - records.len()
    );
    debug!("{source}: {missing_state} rows without a state, {other_nature} rows mapped to 'Other'");

    Ok(records)
}

// ---------------------------------------------------------------------------
// Census
// ---------------------------------------------------------------------------

/// Index of the single row whose label, with surrounding whitespace removed,
/// equals `label`. Zero or several matches are errors.
pub fn find_indicator_row(labels: &[&str], label: &str, file: &str) -> Result<usize, PipelineError> {
    let matches: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| l.trim() == label)
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [only] => Ok(*only),
        [] => Err(PipelineError::IndicatorNotFound {
            file: file.to_string(),
            label: label.to_string(),
        }),
        many => Err(PipelineError::AmbiguousIndicator {
            file: file.to_string(),
            label: label.to_string(),
            count: many.len(),
        }),
    }
}

/// Parse a census number after stripping thousands separators.
/// Annotations such as `"N"`, `"(X)"` or `"250,000+"` become `None`.
pub fn parse_census_number(raw: Option<&str>) -> Option<f64> {
    raw?.replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_census_count(raw: Option<&str>) -> Option<u64> {
    parse_census_number(raw)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as u64)
}

/// Read the census indicator cross-tab (one indicator per row, one
/// `"<State>!!Estimate"` column per state) and turn it into one
/// [`StateIndicator`] per recognised state.
///
/// Columns whose state name is not in the fixed name table (for example
/// Puerto Rico) are skipped with a warning.
pub fn clean_census<R: Read>(reader: R, source: &str) -> Result<Vec<StateIndicator>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr
        .headers()
        .with_context(|| format!("{source}: reading CSV headers"))?
        .clone();

    let label_idx = column_index(&headers, LABEL_COLUMN, source)?;

    let estimate_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(ESTIMATE_MARKER))
        .map(|(i, h)| (i, h.replace(ESTIMATE_MARKER, "").trim().to_string()))
        .collect();
    if estimate_columns.is_empty() {
        return Err(PipelineError::NoEstimateColumns {
            file: source.to_string(),
        }
        .into());
    }

    let rows: Vec<StringRecord> = rdr
        .records()
        .enumerate()
        .map(|(row_no, r)| r.with_context(|| format!("{source}: CSV row {row_no}")))
        .collect::<Result<_>>()?;
    let labels: Vec<&str> = rows.iter().map(|r| r.get(label_idx).unwrap_or("")).collect();

    let income_row = &rows[find_indicator_row(&labels, INCOME_LABEL, source)?];
    let households_row = &rows[find_indicator_row(&labels, HOUSEHOLDS_LABEL, source)?];

    let mut seen = BTreeSet::new();
    let mut indicators = Vec::with_capacity(estimate_columns.len());

    for (col, state_name) in estimate_columns {
        let Some(abbr) = lookup::state_abbr(&state_name) else {
            warn!("{source}: skipping column for unrecognised state '{state_name}'");
            continue;
        };
        if !seen.insert(abbr) {
            return Err(PipelineError::DuplicateState {
                file: source.to_string(),
                state: abbr.to_string(),
            }
            .into());
        }

        let median_income = parse_census_number(income_row.get(col));
        let total_households = parse_census_count(households_row.get(col));
        if median_income.is_none() || total_households.is_none() {
            debug!("{source}: {state_name} has an unparseable indicator value");
        }

        indicators.push(StateIndicator {
            state_name,
            state_abbr: abbr.to_string(),
            median_income,
            total_households,
        });
    }

    info!("{source}: read indicators for {} states", indicators.len());
    Ok(indicators)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYMENTS_HEADER: &str = "Covered_Recipient_Profile_ID,Covered_Recipient_Specialty_1,\
        Total_Amount_of_Payment_USDollars,Date_of_Payment,\
        Nature_of_Payment_or_Transfer_of_Value,Recipient_State\n";

    #[test]
    fn specialty_takes_last_non_empty_segment() {
        assert_eq!(
            canonical_specialty(Some("Allopathic & Osteopathic Physicians|Internal Medicine|Cardiovascular Disease")),
            "Cardiovascular Disease"
        );
        assert_eq!(canonical_specialty(Some("Physicians| Orthopaedic Surgery |")), "Orthopaedic Surgery");
        assert_eq!(canonical_specialty(Some(" | ")), "Unknown");
        assert_eq!(canonical_specialty(None), "Unknown");
    }

    #[test]
    fn amounts_must_be_positive() {
        assert_eq!(parse_amount(Some("12.50")), Some(12.5));
        assert_eq!(parse_amount(Some("0")), None);
        assert_eq!(parse_amount(Some("-3")), None);
        assert_eq!(parse_amount(Some("abc")), None);
        assert_eq!(parse_amount(None), None);
    }

    #[test]
    fn payments_are_cleaned_and_defaulted() {
        let csv = format!(
            "{PAYMENTS_HEADER}\
             1,Physicians|Cardiology,100,01/02/2023,Consulting Fee,CA\n\
             2,Physicians|Cardiology,0,01/02/2023,Consulting Fee,CA\n\
             3,,25.5,,Gift,\n\
             4,Dermatology,,01/03/2023,Grant,TX\n"
        );
        let records = clean_payments(csv.as_bytes(), "payments.csv").unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].specialty, "Cardiology");
        assert_eq!(records[0].payment_type, PaymentCategory::Consulting);
        assert_eq!(records[0].recipient_id.as_deref(), Some("1"));

        assert_eq!(records[1].specialty, "Unknown");
        assert_eq!(records[1].state, "Unknown");
        assert_eq!(records[1].payment_type, PaymentCategory::Other);
        assert_eq!(records[1].payment_date, None);
    }

    #[test]
    fn missing_payment_column_aborts() {
        let csv = "Covered_Recipient_Specialty_1,Total_Amount_of_Payment_USDollars,Recipient_State\n\
                   Cardiology,10,CA\n";
        let err = clean_payments(csv.as_bytes(), "payments.csv").unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::MissingColumn { column, file }) => {
                assert_eq!(column, NATURE_COLUMN);
                assert_eq!(file, "payments.csv");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let csv = "Covered_Recipient_Specialty_1,Total_Amount_of_Payment_USDollars,\
                   Nature_of_Payment_or_Transfer_of_Value,Recipient_State\n\
                   Cardiology,10,Education,NY\n";
        let records = clean_payments(csv.as_bytes(), "p.csv").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].recipient_id, None);
        assert_eq!(records[0].payment_type, PaymentCategory::Education);
    }

    #[test]
    fn padded_nature_is_not_a_known_category() {
        let csv = format!(
            "{PAYMENTS_HEADER}\
             1,Cardiology,10,,\"Consulting Fee \",CA\n\
             2,Cardiology,10,,\" Grant\",CA\n\
             3,Cardiology,10,,Grant,CA\n"
        );
        let records = clean_payments(csv.as_bytes(), "payments.csv").unwrap();
        let types: Vec<_> = records.iter().map(|r| r.payment_type).collect();
        assert_eq!(
            types,
            vec![PaymentCategory::Other, PaymentCategory::Other, PaymentCategory::Grant]
        );
        assert_eq!(records[0].payment_nature.as_deref(), Some("Consulting Fee "));
    }

    #[test]
    fn indicator_lookup_is_anchored() {
        let labels = [
            "INCOME AND BENEFITS",
            "    Total households",
            "\u{a0}\u{a0}Median household income (dollars)",
            "Mean household income (dollars)",
        ];
        assert_eq!(find_indicator_row(&labels, HOUSEHOLDS_LABEL, "acs.csv").unwrap(), 1);
        assert_eq!(find_indicator_row(&labels, INCOME_LABEL, "acs.csv").unwrap(), 2);
    }

    #[test]
    fn indicator_lookup_rejects_substring_and_duplicates() {
        let labels = ["Total households with earnings", "Families"];
        assert!(matches!(
            find_indicator_row(&labels, HOUSEHOLDS_LABEL, "acs.csv"),
            Err(PipelineError::IndicatorNotFound { .. })
        ));

        let labels = ["Total households", "  Total households"];
        assert!(matches!(
            find_indicator_row(&labels, HOUSEHOLDS_LABEL, "acs.csv"),
            Err(PipelineError::AmbiguousIndicator { count: 2, .. })
        ));
    }

    #[test]
    fn census_numbers_strip_separators() {
        assert_eq!(parse_census_number(Some("1,234,567")), Some(1_234_567.0));
        assert_eq!(parse_census_number(Some("(X)")), None);
        assert_eq!(parse_census_number(Some("250,000+")), None);
        assert_eq!(parse_census_count(Some("12.5")), None);
        assert_eq!(parse_census_count(Some("0")), Some(0));
    }

    #[test]
    fn census_is_transposed_per_state() {
        let csv = "Label (Grouping),California!!Estimate,California!!Margin of Error,\
                   Puerto Rico!!Estimate,Texas!!Estimate\n\
                   INCOME AND BENEFITS,,,,\n\
                   \"    Total households\",\"13,434,847\",\"±20,000\",\"1,200,000\",\"10,490,553\"\n\
                   \"        Median household income (dollars)\",\"95,521\",±500,\"24,002\",N\n";
        let states = clean_census(csv.as_bytes(), "acs.csv").unwrap();
        assert_eq!(states.len(), 2);

        assert_eq!(states[0].state_abbr, "CA");
        assert_eq!(states[0].state_name, "California");
        assert_eq!(states[0].total_households, Some(13_434_847));
        assert_eq!(states[0].median_income, Some(95_521.0));

        assert_eq!(states[1].state_abbr, "TX");
        assert_eq!(states[1].median_income, None);
    }

    #[test]
    fn census_without_label_column_aborts() {
        let csv = "Label,California!!Estimate\nTotal households,10\n";
        let err = clean_census(csv.as_bytes(), "acs.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn census_without_estimates_aborts() {
        let csv = "Label (Grouping),California!!Margin of Error\nTotal households,10\n";
        let err = clean_census(csv.as_bytes(), "acs.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoEstimateColumns { .. })
        ));
    }
}
