//! Header-driven column mapping.
//!
//! Header labels are free text that the upstream page changes from time to
//! time ("Name of State / UT", "Total Confirmed cases (Indian National)",
//! ...). Columns are classified by keyword containment against a
//! prioritized rule list, so reordering columns is harmless but renaming
//! them may not be. This is best-effort: unmatched headers are ignored.
//!
//! New labels are supported by appending rules with
//! [`ColumnMapper::with_rule`].

use std::collections::BTreeMap;

use case_tracker_case_models::RegionalField;

/// Classifies a header as `field` when its lower-cased text contains every
/// keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRule {
    /// Role assigned on match.
    pub field: RegionalField,
    /// Lower-case substrings that must all be present.
    pub keywords: &'static [&'static str],
}

impl HeaderRule {
    /// Whether `lower_header` (already lower-cased) satisfies this rule.
    #[must_use]
    pub fn matches(&self, lower_header: &str) -> bool {
        self.keywords.iter().all(|k| lower_header.contains(k))
    }
}

/// Built-in rules, highest priority first.
pub const DEFAULT_RULES: &[HeaderRule] = &[
    HeaderRule {
        field: RegionalField::Location,
        keywords: &["name"],
    },
    HeaderRule {
        field: RegionalField::ConfirmedDomestic,
        keywords: &["confirmed", "indian"],
    },
    HeaderRule {
        field: RegionalField::ConfirmedForeign,
        keywords: &["confirmed", "foreign"],
    },
    HeaderRule {
        field: RegionalField::Discharged,
        keywords: &["discharged"],
    },
    HeaderRule {
        field: RegionalField::Deaths,
        keywords: &["death"],
    },
];

/// Prioritized header classifier.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    rules: Vec<HeaderRule>,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.to_vec(),
        }
    }
}

impl ColumnMapper {
    /// Creates a mapper with the [`DEFAULT_RULES`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule. It is consulted after every existing rule.
    #[must_use]
    pub fn with_rule(mut self, rule: HeaderRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the role of a header cell; the first matching rule wins.
    #[must_use]
    pub fn classify(&self, header: &str) -> Option<RegionalField> {
        let lower = header.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lower))
            .map(|rule| rule.field)
    }
}

/// Which column holds each field, built from the header row.
///
/// If two headers map to the same field the later column wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<RegionalField, usize>,
}

impl ColumnMap {
    /// Builds the map from `(column, header text)` pairs.
    #[must_use]
    pub fn from_headers<'a>(
        mapper: &ColumnMapper,
        headers: impl IntoIterator<Item = (usize, &'a str)>,
    ) -> Self {
        let mut map = Self::default();
        for (col, text) in headers {
            map.observe_header(mapper, col, text);
        }
        map
    }

    /// Classifies one header cell and records its column.
    pub fn observe_header(&mut self, mapper: &ColumnMapper, col: usize, text: &str) {
        if let Some(field) = mapper.classify(text) {
            self.columns.insert(field, col);
        }
    }

    /// The column holding `field`, if any header matched it.
    #[must_use]
    pub fn column_of(&self, field: RegionalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// The field stored in column `col`, checked in field priority order.
    #[must_use]
    pub fn field_at(&self, col: usize) -> Option<RegionalField> {
        self.columns
            .iter()
            .find(|(_, c)| **c == col)
            .map(|(field, _)| *field)
    }

    /// Whether no header matched any rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: [&str; 6] = [
        "S. No.",
        "Name of State / UT",
        "Total Confirmed cases (Indian National)",
        "Total Confirmed cases ( Foreign National )",
        "Cured/Discharged/Migrated",
        "Death",
    ];

    #[test]
    fn classifies_bulletin_headers() {
        let mapper = ColumnMapper::new();

        assert_eq!(mapper.classify(HEADERS[0]), None);
        assert_eq!(mapper.classify(HEADERS[1]), Some(RegionalField::Location));
        assert_eq!(
            mapper.classify(HEADERS[2]),
            Some(RegionalField::ConfirmedDomestic)
        );
        assert_eq!(
            mapper.classify(HEADERS[3]),
            Some(RegionalField::ConfirmedForeign)
        );
        assert_eq!(mapper.classify(HEADERS[4]), Some(RegionalField::Discharged));
        assert_eq!(mapper.classify(HEADERS[5]), Some(RegionalField::Deaths));
    }

    #[test]
    fn first_matching_rule_wins() {
        // Contains both "name" and "death"; location has priority.
        let mapper = ColumnMapper::new();
        assert_eq!(
            mapper.classify("Death toll by name"),
            Some(RegionalField::Location)
        );
    }

    #[test]
    fn confirmed_alone_is_not_enough() {
        assert_eq!(ColumnMapper::new().classify("Total Confirmed"), None);
    }

    #[test]
    fn mapping_is_independent_of_column_order() {
        let mapper = ColumnMapper::new();
        let forward = ColumnMap::from_headers(&mapper, HEADERS.iter().copied().enumerate());

        let mut reversed: Vec<&str> = HEADERS.to_vec();
        reversed.reverse();
        let backward = ColumnMap::from_headers(&mapper, reversed.iter().copied().enumerate());

        for field in RegionalField::ALL {
            let fwd = forward.column_of(field).map(|c| HEADERS[c]);
            let bwd = backward.column_of(field).map(|c| reversed[c]);
            assert_eq!(fwd, bwd, "{field} mapped to different headers");
        }
    }

    #[test]
    fn each_column_gets_at_most_one_field() {
        let mapper = ColumnMapper::new();
        let map = ColumnMap::from_headers(&mapper, HEADERS.iter().copied().enumerate());

        for col in 0..HEADERS.len() {
            let owners = RegionalField::ALL
                .iter()
                .filter(|f| map.column_of(**f) == Some(col))
                .count();
            assert!(owners <= 1);
        }
        assert_eq!(map.field_at(0), None);
        assert_eq!(map.field_at(5), Some(RegionalField::Deaths));
    }

    #[test]
    fn later_duplicate_header_wins() {
        let mapper = ColumnMapper::new();
        let map = ColumnMap::from_headers(&mapper, [(0, "Name"), (3, "Short name")]);

        assert_eq!(map.column_of(RegionalField::Location), Some(3));
        assert_eq!(map.field_at(0), None);
    }

    #[test]
    fn appended_rule_extends_classification() {
        let mapper = ColumnMapper::new().with_rule(HeaderRule {
            field: RegionalField::Discharged,
            keywords: &["cured"],
        });

        assert_eq!(mapper.classify("Cured"), Some(RegionalField::Discharged));
        assert_eq!(ColumnMapper::new().classify("Cured"), None);
    }
}
