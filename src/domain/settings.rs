use crate::domain::model::Currency;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 資料來源：單一 CSV 檔或按年份切分的分塊目錄
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Csv(PathBuf),
    Chunks(PathBuf),
}

impl SourceKind {
    pub fn path(&self) -> &PathBuf {
        match self {
            SourceKind::Csv(path) | SourceKind::Chunks(path) => path,
        }
    }
}

/// Where exchange rates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum RateSource {
    /// 固定匯率表；未列出的貨幣視為無匯率
    Static(BTreeMap<Currency, f64>),
    /// 按月份的匯率 CSV 檔
    TimeIndexed(PathBuf),
}

impl RateSource {
    pub fn builtin() -> Self {
        RateSource::Static(builtin_rates())
    }
}

impl Default for RateSource {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Multipliers to RUR used when no rate file is given.
pub fn builtin_rates() -> BTreeMap<Currency, f64> {
    BTreeMap::from([
        (Currency::AZN, 35.68),
        (Currency::BYR, 23.91),
        (Currency::EUR, 59.90),
        (Currency::GEL, 21.74),
        (Currency::KGS, 0.76),
        (Currency::KZT, 0.13),
        (Currency::RUR, 1.0),
        (Currency::UAH, 1.64),
        (Currency::USD, 60.66),
        (Currency::UZS, 0.0055),
    ])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// 所有欄位都不可為空
    #[default]
    Strict,
    /// 薪資上下限只需其一
    AllowSingleBound,
}

impl FromStr for ValidationPolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "strict" => Ok(ValidationPolicy::Strict),
            "allow_single_bound" | "single_bound" => Ok(ValidationPolicy::AllowSingleBound),
            other => Err(EtlError::InvalidConfigValueError {
                field: "validation_policy".to_string(),
                value: other.to_string(),
                reason: "Valid values: strict, allow_single_bound".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameFilterMode {
    #[default]
    Subset,
    /// Each pattern appends its matches to the working set, so an entity
    /// matching several patterns is counted several times.
    AppendMatches,
}

impl FromStr for NameFilterMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "subset" => Ok(NameFilterMode::Subset),
            "append" | "append_matches" => Ok(NameFilterMode::AppendMatches),
            other => Err(EtlError::InvalidConfigValueError {
                field: "name_filter".to_string(),
                value: other.to_string(),
                reason: "Valid values: subset, append".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub const ALL: [&'static str; 2] = ["json", "csv"];
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(EtlError::InvalidConfigValueError {
                field: "output_formats".to_string(),
                value: other.to_string(),
                reason: format!("Unsupported format. Valid formats: {}", Self::ALL.join(", ")),
            }),
        }
    }
}
