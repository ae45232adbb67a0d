//! Case-count extraction.
//!
//! Row 0 of the document is always read as the header row. Every later row
//! becomes a [`RegionalRecord`] until a row whose first cell starts with
//! "total"; that row and everything after it is skipped.

use case_tracker_case_models::RegionalRecord;

use crate::ScrapeError;
use crate::columns::{ColumnMap, ColumnMapper};
use crate::table;

/// Minimum number of populated fields the first record needs for the table
/// to be trusted.
pub const MIN_POPULATED_FIELDS: usize = 3;

/// Extracts one record per location using the default [`ColumnMapper`].
#[must_use]
pub fn extract_case_counts(content: &str) -> Vec<RegionalRecord> {
    extract_case_counts_with(content, &ColumnMapper::default())
}

/// Extracts one record per location, classifying headers with `mapper`.
///
/// Records are returned in document order. Numeric cells that do not parse
/// are kept as [`Count::Invalid`]; columns without a recognised header
/// leave their field unset.
///
/// [`Count::Invalid`]: case_tracker_case_models::Count::Invalid
#[must_use]
pub fn extract_case_counts_with(content: &str, mapper: &ColumnMapper) -> Vec<RegionalRecord> {
    let mut columns = ColumnMap::default();
    let mut records: Vec<RegionalRecord> = Vec::new();
    let mut past_totals = false;

    for cell in table::cells(content) {
        if cell.row == 0 {
            columns.observe_header(mapper, cell.col, &cell.text);
            continue;
        }

        if !past_totals {
            past_totals = cell.col == 0 && is_total_label(&cell.text);
        }
        if past_totals {
            continue;
        }

        if cell.col == 0 {
            records.push(RegionalRecord::default());
        }

        if let (Some(record), Some(field)) = (records.last_mut(), columns.field_at(cell.col)) {
            record.set(field, &cell.text);
        }
    }

    log::debug!("Extracted {} regional records", records.len());
    records
}

/// Heuristic check that the table still looks like the case-count table.
///
/// # Errors
///
/// Returns [`ScrapeError::Structure`] when no records were found or the
/// first record has fewer than [`MIN_POPULATED_FIELDS`] fields.
pub fn validate_structure(records: &[RegionalRecord]) -> Result<(), ScrapeError> {
    let Some(first) = records.first() else {
        return Err(ScrapeError::Structure {
            reason: "no regional rows found".to_string(),
        });
    };

    let populated = first.populated_fields();
    if populated < MIN_POPULATED_FIELDS {
        return Err(ScrapeError::Structure {
            reason: format!(
                "first row has {populated} populated fields, expected at least {MIN_POPULATED_FIELDS}"
            ),
        });
    }

    Ok(())
}

fn is_total_label(text: &str) -> bool {
    text.to_lowercase().trim().starts_with("total")
}

#[cfg(test)]
mod tests {
    use case_tracker_case_models::{Count, RegionalField};

    use super::*;
    use crate::columns::HeaderRule;

    const BULLETIN: &str = r#"
<table class="table table-striped">
  <thead>
    <tr>
      <th><strong>S. No.</strong></th>
      <th><strong>Name of State / UT</strong></th>
      <th><strong>Total Confirmed cases (Indian National)</strong></th>
      <th><strong>Total Confirmed cases ( Foreign National )</strong></th>
      <th><strong>Cured/Discharged/Migrated</strong></th>
      <th><strong>Death</strong></th>
    </tr>
  </thead>
  <tbody>
    <tr><td>1</td><td>Andhra Pradesh</td><td>1</td><td>0</td><td>0</td><td>0</td></tr>
    <tr><td>2</td><td>Delhi</td><td>7</td><td>1</td><td>2</td><td>1</td></tr>
    <tr><td>3</td><td>Kerala</td><td>24</td><td>2</td><td>3</td><td>0</td></tr>
    <tr><td colspan="2">Total number of confirmed cases in India</td><td>32</td><td>3</td><td>5</td><td>1</td></tr>
    <tr><td>4</td><td>Ladakh</td><td>3</td><td>0</td><td>0</td><td>0</td></tr>
  </tbody>
</table>"#;

    #[test]
    fn extracts_rows_until_total() {
        let records = extract_case_counts(BULLETIN);

        let locations: Vec<_> = records.iter().filter_map(|r| r.location.as_deref()).collect();
        assert_eq!(locations, vec!["Andhra Pradesh", "Delhi", "Kerala"]);

        let kerala = &records[2];
        assert_eq!(kerala.confirmed_domestic, Some(Count::Value(24)));
        assert_eq!(kerala.confirmed_foreign, Some(Count::Value(2)));
        assert_eq!(kerala.discharged, Some(Count::Value(3)));
        assert_eq!(kerala.deaths, Some(Count::Value(0)));
    }

    #[test]
    fn total_detection_is_case_and_whitespace_insensitive() {
        let html = "<tr><th>Name</th><th>Death</th></tr>\
                    <tr><td>Goa</td><td>1</td></tr>\
                    <tr><td>  TOTAL  </td><td>1</td></tr>\
                    <tr><td>Assam</td><td>0</td></tr>";
        let records = extract_case_counts(html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location.as_deref(), Some("Goa"));
    }

    #[test]
    fn missing_columns_stay_unset() {
        let html = "<tr><th>Name</th><th>Death</th></tr><tr><td>Goa</td><td>2</td></tr>";
        let records = extract_case_counts(html);

        assert_eq!(records[0].deaths, Some(Count::Value(2)));
        assert_eq!(records[0].confirmed_domestic, None);
        assert_eq!(records[0].populated_fields(), 2);
    }

    #[test]
    fn unparseable_counts_are_kept_as_invalid() {
        let html = "<tr><th>Name</th><th>Discharged</th><th>Deaths</th></tr>\
                    <tr><td>Goa</td><td>n/a</td><td>3#</td></tr>";
        let records = extract_case_counts(html);

        assert_eq!(records[0].discharged, Some(Count::Invalid));
        assert_eq!(records[0].deaths, Some(Count::Value(3)));
        assert_eq!(records[0].defects().len(), 3);
    }

    #[test]
    fn reordered_columns_map_to_same_fields() {
        let html = "<tr><th>Death</th><th>Name</th><th>Confirmed (Foreign)</th>\
                    <th>Confirmed (Indian)</th><th>Discharged</th></tr>\
                    <tr><td>1</td><td>Delhi</td><td>1</td><td>7</td><td>2</td></tr>";
        let records = extract_case_counts(html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location.as_deref(), Some("Delhi"));
        assert_eq!(records[0].confirmed_domestic, Some(Count::Value(7)));
        assert_eq!(records[0].confirmed_foreign, Some(Count::Value(1)));
        assert_eq!(records[0].discharged, Some(Count::Value(2)));
        assert_eq!(records[0].deaths, Some(Count::Value(1)));
    }

    #[test]
    fn custom_rule_is_applied() {
        let mapper = ColumnMapper::new().with_rule(HeaderRule {
            field: RegionalField::Discharged,
            keywords: &["recovered"],
        });
        let html = "<tr><th>Name</th><th>Recovered</th></tr><tr><td>Goa</td><td>4</td></tr>";
        let records = extract_case_counts_with(html, &mapper);

        assert_eq!(records[0].discharged, Some(Count::Value(4)));
    }

    #[test]
    fn structure_check_accepts_bulletin() {
        assert!(validate_structure(&extract_case_counts(BULLETIN)).is_ok());
    }

    #[test]
    fn structure_check_rejects_empty_and_sparse_tables() {
        assert!(matches!(
            validate_structure(&[]),
            Err(ScrapeError::Structure { .. })
        ));

        let sparse = extract_case_counts("<tr><th>Name</th><th>Death</th></tr><tr><td>Goa</td><td>1</td></tr>");
        assert!(matches!(
            validate_structure(&sparse),
            Err(ScrapeError::Structure { .. })
        ));
    }

    #[test]
    fn page_without_tables_yields_nothing() {
        assert!(extract_case_counts("<html><body>maintenance</body></html>").is_empty());
    }
}
