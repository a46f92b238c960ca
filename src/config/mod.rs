pub mod cli;
pub mod toml_config;

use crate::core::batch::default_workers;
use crate::core::city_filter::{DEFAULT_MIN_SHARE, DEFAULT_TOP_CITIES};
use crate::core::listing::ListingQuery;
use crate::core::statistics::StatisticsOptions;
use crate::core::ConfigProvider;
use crate::domain::settings::{
    NameFilterMode, OutputFormat, RateSource, SourceKind, ValidationPolicy,
};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_one_of, validate_path, validate_patterns, validate_positive_number, validate_range,
    Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "vacancy-etl")]
#[command(about = "Salary and vacancy statistics from job-listing CSV files")]
pub struct CliConfig {
    /// Vacancy CSV file
    #[arg(long, default_value = "vacancies.csv")]
    pub input: String,

    /// Directory of per-year chunk files; takes precedence over --input
    #[arg(long)]
    pub chunks: Option<String>,

    /// Profession name patterns, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub professions: Vec<String>,

    /// Monthly exchange-rate CSV (date,USD,EUR,...); built-in rates when absent
    #[arg(long)]
    pub rates: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "json,csv")]
    pub formats: Vec<String>,

    /// Worker count for chunk processing (default: 3 x CPU cores)
    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long, default_value = "subset")]
    pub name_filter: NameFilterMode,

    #[arg(long, default_value = "strict")]
    pub validation: ValidationPolicy,

    #[arg(long, default_value_t = DEFAULT_MIN_SHARE)]
    pub city_min_share: f64,

    #[arg(long, default_value_t = DEFAULT_TOP_CITIES)]
    pub top_cities: usize,

    /// Listing filter, e.g. "city: Москва"
    #[arg(long)]
    pub list_filter: Option<String>,

    /// Listing sort key: skills, salary, experience, published, name, city, employer
    #[arg(long)]
    pub list_sort: Option<String>,

    #[arg(long)]
    pub list_desc: bool,

    /// Listing rows, 1-based: "start" or "start..end"
    #[arg(long)]
    pub list_range: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn wants_listing(&self) -> bool {
        self.list_filter.is_some() || self.list_sort.is_some() || self.list_range.is_some()
    }
}

impl ConfigProvider for CliConfig {
    fn source(&self) -> SourceKind {
        match &self.chunks {
            Some(dir) => SourceKind::Chunks(PathBuf::from(dir)),
            None => SourceKind::Csv(PathBuf::from(&self.input)),
        }
    }

    fn rate_source(&self) -> RateSource {
        match &self.rates {
            Some(path) => RateSource::TimeIndexed(PathBuf::from(path)),
            None => RateSource::builtin(),
        }
    }

    fn statistics_options(&self) -> StatisticsOptions {
        StatisticsOptions {
            name_filter_mode: self.name_filter,
            validation_policy: self.validation,
            city_min_share: self.city_min_share,
            top_cities: self.top_cities,
            ..StatisticsOptions::for_professions(self.professions.clone())
        }
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        self.formats.iter().filter_map(|f| f.parse().ok()).collect()
    }

    fn workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    fn listing_query(&self) -> Result<Option<ListingQuery>> {
        if !self.wants_listing() {
            return Ok(None);
        }
        Ok(Some(ListingQuery {
            filter: self.list_filter.as_deref().map(str::parse).transpose()?,
            sort: self.list_sort.as_deref().map(str::parse).transpose()?,
            descending: self.list_desc,
            range: self.list_range.as_deref().map(str::parse).transpose()?,
        }))
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.chunks {
            Some(dir) => validate_path("chunks", dir)?,
            None => validate_path("input", &self.input)?,
        }
        if let Some(rates) = &self.rates {
            validate_path("rates", rates)?;
        }
        validate_path("output_path", &self.output_path)?;
        validate_patterns("professions", &self.professions)?;
        for format in &self.formats {
            validate_one_of("formats", format, &OutputFormat::ALL)?;
        }
        if let Some(workers) = self.workers {
            validate_positive_number("workers", workers, 1)?;
        }
        validate_range("city_min_share", self.city_min_share, 0.0, 1.0)?;
        validate_positive_number("top_cities", self.top_cities, 1)?;
        self.listing_query()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        let mut argv = vec!["vacancy-etl"];
        argv.extend_from_slice(args);
        CliConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let config = parse(&["--professions", "Программист,Developer"]);
        assert_eq!(config.professions.len(), 2);
        assert_eq!(config.source(), SourceKind::Csv(PathBuf::from("vacancies.csv")));
        assert_eq!(config.rate_source(), RateSource::builtin());
        assert_eq!(config.output_formats(), vec![OutputFormat::Json, OutputFormat::Csv]);
        assert!(config.validate().is_ok());
        assert!(config.listing_query().unwrap().is_none());
    }

    #[test]
    fn test_cli_chunks_and_rates() {
        let config = parse(&[
            "--professions",
            "Программист",
            "--chunks",
            "csv_by_years",
            "--rates",
            "currencies.csv",
            "--name-filter",
            "append",
            "--workers",
            "4",
        ]);
        assert_eq!(config.source(), SourceKind::Chunks(PathBuf::from("csv_by_years")));
        assert!(matches!(config.rate_source(), RateSource::TimeIndexed(_)));
        assert_eq!(
            config.statistics_options().name_filter_mode,
            NameFilterMode::AppendMatches
        );
        assert_eq!(config.workers(), 4);
    }

    #[test]
    fn test_cli_validation_rejects_bad_values() {
        let config = parse(&["--professions", "Dev", "--formats", "xlsx"]);
        assert!(config.validate().is_err());

        let config = parse(&["--professions", "Dev", "--city-min-share", "2"]);
        assert!(config.validate().is_err());

        let config = parse(&["--professions", "Dev", "--list-filter", "colour: red"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_listing_query() {
        let config = parse(&[
            "--professions",
            "Dev",
            "--list-filter",
            "city: Москва",
            "--list-sort",
            "salary",
            "--list-desc",
            "--list-range",
            "1..10",
        ]);
        let query = config.listing_query().unwrap().unwrap();
        assert!(query.descending);
        assert_eq!(query.range.map(|r| r.end), Some(Some(10)));
    }
}
