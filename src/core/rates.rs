use crate::domain::model::{Currency, YearMonth};
use crate::domain::settings::RateSource;
use crate::utils::error::{EtlError, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

/// Exchange rates to RUR. Loaded once per run, then shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub enum RateTable {
    Static(BTreeMap<Currency, f64>),
    TimeIndexed(HashMap<(YearMonth, Currency), f64>),
}

impl RateTable {
    pub fn load(source: &RateSource) -> Result<Self> {
        match source {
            RateSource::Static(rates) => {
                tracing::info!("💱 Using static rate table ({} currencies)", rates.len());
                Ok(RateTable::Static(rates.clone()))
            }
            RateSource::TimeIndexed(path) => {
                tracing::info!("💱 Loading monthly rates from {}", path.display());
                Self::from_csv_path(path)
            }
        }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    /// 讀取 `date,USD,EUR,...` 格式的匯率表，空白儲存格表示該月份沒有匯率
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let date_column = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == "date")
            .ok_or_else(|| EtlError::ValidationError {
                message: "rate file has no 'date' column".to_string(),
            })?;

        let mut columns: Vec<(usize, Currency)> = Vec::new();
        for (index, name) in headers.iter().enumerate() {
            if index == date_column {
                continue;
            }
            match rate_column_currency(name) {
                Some(currency) => columns.push((index, currency)),
                None => tracing::warn!("⚠️ Ignoring unknown currency column '{}'", name),
            }
        }

        let mut rates = HashMap::new();
        for record in csv_reader.records() {
            let record = record?;
            let Some(date) = record.get(date_column) else {
                continue;
            };
            let period: YearMonth = date.parse()?;

            for (index, currency) in &columns {
                let cell = record.get(*index).map(str::trim).unwrap_or("");
                if cell.is_empty() {
                    continue;
                }
                let rate = cell.parse::<f64>().map_err(|_| EtlError::ValidationError {
                    message: format!("invalid rate '{}' for {} in {}", cell, currency, period),
                })?;
                rates.insert((period, *currency), rate);
            }
        }

        tracing::info!("💱 Loaded {} monthly rates", rates.len());
        Ok(RateTable::TimeIndexed(rates))
    }

    pub fn is_time_indexed(&self) -> bool {
        matches!(self, RateTable::TimeIndexed(_))
    }

    pub fn rate(&self, currency: Currency, period: YearMonth) -> Option<f64> {
        match self {
            RateTable::Static(rates) => rates.get(&currency).copied(),
            RateTable::TimeIndexed(rates) => rates.get(&(period, currency)).copied(),
        }
    }
}

fn rate_column_currency(name: &str) -> Option<Currency> {
    match name.trim() {
        "BYN" => Some(Currency::BYR),
        other => other.parse().ok(),
    }
}
