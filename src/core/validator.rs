use crate::domain::model::{Field, Header};
use crate::domain::settings::ValidationPolicy;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use serde::Serialize;

const TAG_PATTERN: &str = r"<.*?>";

/// 驗證統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostics {
    pub total_rows: usize,
    pub accepted_rows: usize,
    pub dropped_rows: usize,
    pub malformed_records: usize,
}

impl ValidationDiagnostics {
    pub fn absorb(&mut self, other: &ValidationDiagnostics) {
        self.total_rows += other.total_rows;
        self.accepted_rows += other.accepted_rows;
        self.dropped_rows += other.dropped_rows;
        self.malformed_records += other.malformed_records;
    }
}

/// Filters raw rows and cleans the text of every accepted field.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    policy: ValidationPolicy,
    tags: Regex,
}

impl RecordValidator {
    pub fn new(policy: ValidationPolicy) -> Result<Self> {
        let tags = Regex::new(TAG_PATTERN).map_err(|e| EtlError::ProcessingError {
            message: format!("Invalid tag pattern: {}", e),
        })?;
        Ok(Self { policy, tags })
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// 移除 HTML 標籤；值內沒有換行時再壓縮空白
    pub fn clean_field(&self, raw: &str) -> String {
        let stripped = self.tags.replace_all(raw, "");
        if raw.contains('\n') {
            stripped.into_owned()
        } else {
            stripped.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }

    pub fn validate(
        &self,
        header: &Header,
        rows: Vec<Vec<String>>,
    ) -> (Vec<Vec<String>>, ValidationDiagnostics) {
        let mut diagnostics = ValidationDiagnostics {
            total_rows: rows.len(),
            ..Default::default()
        };

        let accepted: Vec<Vec<String>> = rows
            .into_iter()
            .filter(|row| row.len() == header.len())
            .map(|row| row.iter().map(|value| self.clean_field(value)).collect::<Vec<String>>())
            .filter(|row| self.accepts(header, row))
            .collect();

        diagnostics.accepted_rows = accepted.len();
        diagnostics.dropped_rows = diagnostics.total_rows - diagnostics.accepted_rows;

        tracing::debug!(
            "🧹 Validation: {} of {} rows accepted ({:?})",
            diagnostics.accepted_rows,
            diagnostics.total_rows,
            self.policy
        );

        (accepted, diagnostics)
    }

    fn accepts(&self, header: &Header, row: &[String]) -> bool {
        let is_empty = |value: &String| value.trim().is_empty();
        match self.policy {
            ValidationPolicy::Strict => !row.iter().any(is_empty),
            ValidationPolicy::AllowSingleBound => {
                let mut has_bound = false;
                for (index, value) in row.iter().enumerate() {
                    match header.field_at(index) {
                        Some(field) if field.is_salary_bound() => {
                            has_bound |= !is_empty(value);
                        }
                        Some(field) if Field::REQUIRED.contains(&field) => {
                            if is_empty(value) {
                                return false;
                            }
                        }
                        _ => {}
                    }
                }
                has_bound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        let names: Vec<String> = [
            "name",
            "salary_from",
            "salary_to",
            "salary_currency",
            "area_name",
            "published_at",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Header::resolve(&names).unwrap()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_clean_field_strips_tags_and_whitespace() {
        let validator = RecordValidator::new(ValidationPolicy::Strict).unwrap();
        assert_eq!(
            validator.clean_field("  <b>Senior</b>   Python   developer "),
            "Senior Python developer"
        );
        assert_eq!(validator.clean_field("Git\n<i>Linux</i>  SQL"), "Git\nLinux  SQL");
    }

    #[test]
    fn test_strict_rejects_empty_salary_to() {
        let validator = RecordValidator::new(ValidationPolicy::Strict).unwrap();
        let rows = vec![row(&["Dev", "30000", "", "RUR", "Москва", "2020-01-01T00:00:00+0300"])];
        let (accepted, diagnostics) = validator.validate(&header(), rows);
        assert!(accepted.is_empty());
        assert_eq!(diagnostics.dropped_rows, 1);
    }

    #[test]
    fn test_single_bound_policy_accepts_empty_salary_to() {
        let validator = RecordValidator::new(ValidationPolicy::AllowSingleBound).unwrap();
        let rows = vec![
            row(&["Dev", "30000", "", "RUR", "Москва", "2020-01-01T00:00:00+0300"]),
            row(&["Dev", "", "", "RUR", "Москва", "2020-01-01T00:00:00+0300"]),
            row(&["", "1", "2", "RUR", "Москва", "2020-01-01T00:00:00+0300"]),
        ];
        let (accepted, diagnostics) = validator.validate(&header(), rows);
        assert_eq!(accepted.len(), 1);
        assert_eq!(diagnostics.dropped_rows, 2);
    }

    #[test]
    fn test_row_length_must_match_header() {
        let validator = RecordValidator::new(ValidationPolicy::Strict).unwrap();
        let rows = vec![
            row(&["Dev", "1", "2", "RUR", "Москва"]),
            row(&["Dev", "1", "2", "RUR", "Москва", "2020-01-01T00:00:00+0300", "extra"]),
        ];
        let (accepted, _) = validator.validate(&header(), rows);
        assert!(accepted.is_empty());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validator = RecordValidator::new(ValidationPolicy::Strict).unwrap();
        let rows = vec![
            row(&["<p>Dev</p>  ops", "1", "2", "RUR", " Москва ", "2020-01-01T00:00:00+0300"]),
            row(&["Dev", "1", "  ", "RUR", "Москва", "2020-01-01T00:00:00+0300"]),
            row(&["a<<b>>c", "1", "2", "EUR", "Санкт-Петербург", "2021-05-01T00:00:00+0300"]),
        ];
        let (once, _) = validator.validate(&header(), rows);
        let (twice, _) = validator.validate(&header(), once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0][0], "Dev ops");
    }
}
