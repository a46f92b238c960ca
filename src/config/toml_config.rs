use crate::core::batch::default_workers;
use crate::core::city_filter::{DEFAULT_MIN_SHARE, DEFAULT_TOP_CITIES};
use crate::core::skills::{DEFAULT_TOP_SKILLS_PER_YEAR, DEFAULT_TOP_SKILL_SHARES};
use crate::core::statistics::StatisticsOptions;
use crate::core::ConfigProvider;
use crate::domain::model::Currency;
use crate::domain::settings::{
    NameFilterMode, OutputFormat, RateSource, SourceKind, ValidationPolicy,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_patterns,
    validate_positive_number, validate_range, validate_required_field, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub report: ReportConfig,
    pub source: SourceConfig,
    pub currency: Option<CurrencyConfig>,
    pub aggregation: Option<AggregationConfig>,
    pub validation: Option<ValidationConfig>,
    pub load: LoadConfig,
    pub performance: Option<PerformanceConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub professions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `csv` 或 `chunks`
    pub r#type: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// `static` 或 `time_indexed`
    pub mode: String,
    pub rates_file: Option<String>,
    /// 取代內建匯率表（static 模式）
    pub rates: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub name_filter: Option<String>,
    pub city_min_share: Option<f64>,
    pub top_cities: Option<usize>,
    pub top_skills: Option<usize>,
    pub top_skill_shares: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub allow_single_bound: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// `text` 或 `json`
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("report.name", &self.report.name)?;
        validate_patterns("report.professions", &self.report.professions)?;

        validate_one_of("source.type", &self.source.r#type, &["csv", "chunks"])?;
        validate_path("source.path", &self.source.path)?;

        if let Some(currency) = &self.currency {
            validate_one_of("currency.mode", &currency.mode, &["static", "time_indexed"])?;
            if currency.mode == "time_indexed" {
                let rates_file = validate_required_field("currency.rates_file", &currency.rates_file)?;
                validate_path("currency.rates_file", rates_file)?;
            }
            if let Some(rates) = &currency.rates {
                for (code, rate) in rates {
                    code.parse::<Currency>().map_err(|_| EtlError::InvalidConfigValueError {
                        field: "currency.rates".to_string(),
                        value: code.clone(),
                        reason: "Unknown currency code".to_string(),
                    })?;
                    if *rate <= 0.0 {
                        return Err(EtlError::InvalidConfigValueError {
                            field: format!("currency.rates.{}", code),
                            value: rate.to_string(),
                            reason: "Rate must be positive".to_string(),
                        });
                    }
                }
            }
        }

        if let Some(aggregation) = &self.aggregation {
            if let Some(mode) = &aggregation.name_filter {
                mode.parse::<NameFilterMode>()?;
            }
            if let Some(share) = aggregation.city_min_share {
                validate_range("aggregation.city_min_share", share, 0.0, 1.0)?;
            }
            if let Some(top) = aggregation.top_cities {
                validate_positive_number("aggregation.top_cities", top, 1)?;
            }
            if let Some(top) = aggregation.top_skills {
                validate_positive_number("aggregation.top_skills", top, 1)?;
            }
        }

        validate_path("load.output_path", &self.load.output_path)?;
        for format in &self.load.output_formats {
            validate_one_of("load.output_formats", format, &OutputFormat::ALL)?;
        }

        if let Some(workers) = self.performance.as_ref().and_then(|p| p.workers) {
            validate_positive_number("performance.workers", workers, 1)?;
        }

        if let Some(format) = self.monitoring.as_ref().and_then(|m| m.log_format.as_deref()) {
            validate_one_of("monitoring.log_format", format, &["text", "json"])?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .is_some_and(|format| format == "json")
    }

    fn static_rates(&self) -> Option<BTreeMap<Currency, f64>> {
        let rates = self.currency.as_ref()?.rates.as_ref()?;
        Some(
            rates
                .iter()
                .filter_map(|(code, rate)| code.parse::<Currency>().ok().map(|c| (c, *rate)))
                .collect(),
        )
    }
}

impl ConfigProvider for TomlConfig {
    fn source(&self) -> SourceKind {
        let path = PathBuf::from(&self.source.path);
        match self.source.r#type.as_str() {
            "chunks" => SourceKind::Chunks(path),
            _ => SourceKind::Csv(path),
        }
    }

    fn rate_source(&self) -> RateSource {
        let time_indexed = self
            .currency
            .as_ref()
            .filter(|c| c.mode == "time_indexed")
            .and_then(|c| c.rates_file.as_ref());
        match (time_indexed, self.static_rates()) {
            (Some(path), _) => RateSource::TimeIndexed(PathBuf::from(path)),
            (None, Some(rates)) => RateSource::Static(rates),
            (None, None) => RateSource::builtin(),
        }
    }

    fn statistics_options(&self) -> StatisticsOptions {
        let aggregation = self.aggregation.as_ref();
        StatisticsOptions {
            professions: self.report.professions.clone(),
            name_filter_mode: aggregation
                .and_then(|a| a.name_filter.as_deref())
                .and_then(|mode| mode.parse().ok())
                .unwrap_or_default(),
            validation_policy: match self.validation.as_ref().and_then(|v| v.allow_single_bound) {
                Some(true) => ValidationPolicy::AllowSingleBound,
                _ => ValidationPolicy::Strict,
            },
            city_min_share: aggregation
                .and_then(|a| a.city_min_share)
                .unwrap_or(DEFAULT_MIN_SHARE),
            top_cities: aggregation
                .and_then(|a| a.top_cities)
                .unwrap_or(DEFAULT_TOP_CITIES),
            top_skill_shares: aggregation
                .and_then(|a| a.top_skill_shares)
                .unwrap_or(DEFAULT_TOP_SKILL_SHARES),
            top_skills_per_year: aggregation
                .and_then(|a| a.top_skills)
                .unwrap_or(DEFAULT_TOP_SKILLS_PER_YEAR),
        }
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        self.load
            .output_formats
            .iter()
            .filter_map(|f| f.parse().ok())
            .collect()
    }

    fn workers(&self) -> usize {
        self.performance
            .as_ref()
            .and_then(|p| p.workers)
            .unwrap_or_else(default_workers)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[report]
name = "python-report"
professions = ["Программист", "Python"]

[source]
type = "csv"
path = "vacancies.csv"

[load]
output_path = "./output"
output_formats = ["json", "csv"]
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.report.name, "python-report");
        assert_eq!(config.source(), SourceKind::Csv(PathBuf::from("vacancies.csv")));
        assert_eq!(config.rate_source(), RateSource::builtin());
        let options = config.statistics_options();
        assert_eq!(options.professions.len(), 2);
        assert_eq!(options.validation_policy, ValidationPolicy::Strict);
        assert_eq!(options.top_cities, 10);
        assert!(config.validate().is_ok());
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_full_config_sections() {
        let toml_content = r#"
[report]
name = "full"
professions = ["Аналитик"]

[source]
type = "chunks"
path = "csv_by_years"

[currency]
mode = "time_indexed"
rates_file = "currencies.csv"

[aggregation]
name_filter = "append"
city_min_share = 0.02
top_cities = 5

[validation]
allow_single_bound = true

[load]
output_path = "./output"
output_formats = ["json"]

[performance]
workers = 6

[monitoring]
enabled = true
log_format = "json"
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.source(), SourceKind::Chunks(PathBuf::from("csv_by_years")));
        assert_eq!(
            config.rate_source(),
            RateSource::TimeIndexed(PathBuf::from("currencies.csv"))
        );
        let options = config.statistics_options();
        assert_eq!(options.name_filter_mode, NameFilterMode::AppendMatches);
        assert_eq!(options.validation_policy, ValidationPolicy::AllowSingleBound);
        assert_eq!(options.top_cities, 5);
        assert_eq!(config.workers(), 6);
        assert_eq!(config.output_formats(), vec![OutputFormat::Json]);
        assert!(config.json_logs());
    }

    #[test]
    fn test_static_rate_override() {
        let toml_content = format!(
            "{}\n[currency]\nmode = \"static\"\n[currency.rates]\nUSD = 70.0\nEUR = 80.0\n",
            BASIC
        );
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_ok());
        match config.rate_source() {
            RateSource::Static(rates) => {
                assert_eq!(rates.len(), 2);
                assert_eq!(rates[&Currency::USD], 70.0);
            }
            other => panic!("unexpected rate source {:?}", other),
        }
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("VACANCY_ETL_TEST_INPUT", "/data/vacancies_2022.csv");

        let toml_content = BASIC.replace("vacancies.csv", "${VACANCY_ETL_TEST_INPUT}");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.source.path, "/data/vacancies_2022.csv");

        std::env::remove_var("VACANCY_ETL_TEST_INPUT");
    }

    #[test]
    fn test_config_validation() {
        let bad_type = BASIC.replace("type = \"csv\"", "type = \"xlsx\"");
        assert!(TomlConfig::from_toml_str(&bad_type).unwrap().validate().is_err());

        let time_indexed_without_file = format!("{}\n[currency]\nmode = \"time_indexed\"\n", BASIC);
        let err = TomlConfig::from_toml_str(&time_indexed_without_file)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { .. }));

        let no_professions = BASIC.replace("[\"Программист\", \"Python\"]", "[]");
        assert!(TomlConfig::from_toml_str(&no_professions).unwrap().validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.report.name, "python-report");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[report\nname = 1").unwrap_err();
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Configuration);
    }
}
