use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Datelike, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// 發布時間格式，例如 `2007-12-04T16:28:52+0300`
pub const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// CSV 原始資料：標題列加上未經處理的資料列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }
}

/// Columns understood by the entity model. Anything else in the header is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    SalaryFrom,
    SalaryTo,
    SalaryCurrency,
    SalaryGross,
    AreaName,
    PublishedAt,
    KeySkills,
    ExperienceId,
    Premium,
    EmployerName,
    Description,
}

impl Field {
    pub const REQUIRED: [Field; 6] = [
        Field::Name,
        Field::SalaryFrom,
        Field::SalaryTo,
        Field::SalaryCurrency,
        Field::AreaName,
        Field::PublishedAt,
    ];

    pub fn from_column(name: &str) -> Option<Self> {
        let field = match name.trim() {
            "name" => Field::Name,
            "salary_from" => Field::SalaryFrom,
            "salary_to" => Field::SalaryTo,
            "salary_currency" => Field::SalaryCurrency,
            "salary_gross" => Field::SalaryGross,
            "area_name" => Field::AreaName,
            "published_at" => Field::PublishedAt,
            "key_skills" => Field::KeySkills,
            "experience_id" => Field::ExperienceId,
            "premium" => Field::Premium,
            "employer_name" => Field::EmployerName,
            "description" => Field::Description,
            _ => return None,
        };
        Some(field)
    }

    pub fn column(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::SalaryFrom => "salary_from",
            Field::SalaryTo => "salary_to",
            Field::SalaryCurrency => "salary_currency",
            Field::SalaryGross => "salary_gross",
            Field::AreaName => "area_name",
            Field::PublishedAt => "published_at",
            Field::KeySkills => "key_skills",
            Field::ExperienceId => "experience_id",
            Field::Premium => "premium",
            Field::EmployerName => "employer_name",
            Field::Description => "description",
        }
    }

    pub fn is_salary_bound(&self) -> bool {
        matches!(self, Field::SalaryFrom | Field::SalaryTo)
    }
}

/// 標題列解析結果：欄位名稱對應到欄位索引
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<Option<Field>>,
    positions: HashMap<Field, usize>,
}

impl Header {
    pub fn resolve(names: &[String]) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        let mut positions = HashMap::new();

        for (index, name) in names.iter().enumerate() {
            let field = Field::from_column(name);
            if let Some(field) = field {
                positions.entry(field).or_insert(index);
            }
            columns.push(field);
        }

        let missing: Vec<&str> = Field::REQUIRED
            .iter()
            .filter(|field| !positions.contains_key(field))
            .map(|field| field.column())
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::ValidationError {
                message: format!("missing required column(s): {}", missing.join(", ")),
            });
        }

        Ok(Self { columns, positions })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has(&self, field: Field) -> bool {
        self.positions.contains_key(&field)
    }

    pub fn field_at(&self, index: usize) -> Option<Field> {
        self.columns.get(index).copied().flatten()
    }

    /// 取得欄位值；欄位不存在或為空字串時回傳 `None`
    pub fn value<'a>(&self, row: &'a [String], field: Field) -> Option<&'a str> {
        let index = *self.positions.get(&field)?;
        row.get(index)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    AZN,
    BYR,
    EUR,
    GEL,
    KGS,
    KZT,
    RUR,
    UAH,
    USD,
    UZS,
}

impl Currency {
    pub const ALL: [Currency; 10] = [
        Currency::AZN,
        Currency::BYR,
        Currency::EUR,
        Currency::GEL,
        Currency::KGS,
        Currency::KZT,
        Currency::RUR,
        Currency::UAH,
        Currency::USD,
        Currency::UZS,
    ];

    /// 基準貨幣
    pub const BASE: Currency = Currency::RUR;

    pub fn code(&self) -> &'static str {
        match self {
            Currency::AZN => "AZN",
            Currency::BYR => "BYR",
            Currency::EUR => "EUR",
            Currency::GEL => "GEL",
            Currency::KGS => "KGS",
            Currency::KZT => "KZT",
            Currency::RUR => "RUR",
            Currency::UAH => "UAH",
            Currency::USD => "USD",
            Currency::UZS => "UZS",
        }
    }

    pub fn is_base(&self) -> bool {
        *self == Currency::BASE
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        Currency::ALL
            .iter()
            .copied()
            .find(|currency| currency.code() == code)
            .ok_or_else(|| EtlError::MalformedRecord {
                reason: format!("unsupported currency code '{}'", code),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Experience {
    NoExperience,
    Between1And3,
    Between3And6,
    MoreThan6,
}

impl Experience {
    pub fn rank(&self) -> u8 {
        match self {
            Experience::NoExperience => 0,
            Experience::Between1And3 => 1,
            Experience::Between3And6 => 2,
            Experience::MoreThan6 => 3,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Experience::NoExperience => "noExperience",
            Experience::Between1And3 => "between1And3",
            Experience::Between3And6 => "between3And6",
            Experience::MoreThan6 => "moreThan6",
        }
    }
}

impl FromStr for Experience {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "noExperience" => Ok(Experience::NoExperience),
            "between1And3" => Ok(Experience::Between1And3),
            "between3And6" => Ok(Experience::Between3And6),
            "moreThan6" => Ok(Experience::MoreThan6),
            other => Err(EtlError::MalformedRecord {
                reason: format!("unknown experience id '{}'", other),
            }),
        }
    }
}

/// 匯率表的時間索引，格式為 `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(EtlError::ValidationError {
                message: format!("month out of range: {}", month),
            });
        }
        Ok(Self { year, month })
    }

    pub fn of(timestamp: &DateTime<FixedOffset>) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EtlError::ValidationError {
            message: format!("invalid year-month '{}', expected YYYY-MM", s),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        YearMonth::new(year, month)
    }
}

/// Salary fork as published. The RUB equivalent is never stored here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Salary {
    salary_from: Option<f64>,
    salary_to: Option<f64>,
    currency: Currency,
    gross: bool,
}

impl Salary {
    pub fn new(
        salary_from: Option<f64>,
        salary_to: Option<f64>,
        currency: Currency,
        gross: bool,
    ) -> Result<Self> {
        if salary_from.is_none() && salary_to.is_none() {
            return Err(EtlError::MalformedRecord {
                reason: "salary has neither lower nor upper bound".to_string(),
            });
        }
        Ok(Self {
            salary_from,
            salary_to,
            currency,
            gross,
        })
    }

    pub fn salary_from(&self) -> Option<f64> {
        self.salary_from
    }

    pub fn salary_to(&self) -> Option<f64> {
        self.salary_to
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_gross(&self) -> bool {
        self.gross
    }

    /// 只有一個邊界時直接以該值作為平均
    pub fn mean(&self) -> f64 {
        match (self.salary_from, self.salary_to) {
            (Some(from), Some(to)) => (from + to) / 2.0,
            (Some(value), None) | (None, Some(value)) => value,
            (None, None) => 0.0,
        }
    }

    /// `value` 是否落在薪資區間內，缺少的邊界視為不設限
    pub fn contains(&self, value: f64) -> bool {
        self.salary_from.map_or(true, |from| from <= value)
            && self.salary_to.map_or(true, |to| value <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vacancy {
    name: String,
    area_name: String,
    published_at: DateTime<FixedOffset>,
    published_year: i32,
    salary: Salary,
    key_skills: Option<Vec<String>>,
    experience: Option<Experience>,
    premium: Option<bool>,
    employer_name: Option<String>,
    description: Option<String>,
}

impl Vacancy {
    /// 由已清理的資料列建立 Vacancy
    pub fn from_row(header: &Header, row: &[String]) -> Result<Self> {
        let required = |field: Field| {
            header
                .value(row, field)
                .ok_or_else(|| EtlError::MalformedRecord {
                    reason: format!("empty required field '{}'", field.column()),
                })
        };

        let name = required(Field::Name)?.to_string();
        let area_name = required(Field::AreaName)?.to_string();
        let published_at = parse_published_at(required(Field::PublishedAt)?)?;
        let currency: Currency = required(Field::SalaryCurrency)?.parse()?;

        let salary = Salary::new(
            parse_amount(header.value(row, Field::SalaryFrom), Field::SalaryFrom)?,
            parse_amount(header.value(row, Field::SalaryTo), Field::SalaryTo)?,
            currency,
            parse_flag(header.value(row, Field::SalaryGross), Field::SalaryGross)?.unwrap_or(false),
        )?;

        let key_skills = header.value(row, Field::KeySkills).map(split_skills);
        let experience = header
            .value(row, Field::ExperienceId)
            .map(str::parse::<Experience>)
            .transpose()?;

        Ok(Self {
            name,
            area_name,
            published_year: published_at.year(),
            published_at,
            salary,
            key_skills,
            experience,
            premium: parse_flag(header.value(row, Field::Premium), Field::Premium)?,
            employer_name: header.value(row, Field::EmployerName).map(str::to_string),
            description: header.value(row, Field::Description).map(str::to_string),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn area_name(&self) -> &str {
        &self.area_name
    }

    pub fn published_at(&self) -> &DateTime<FixedOffset> {
        &self.published_at
    }

    pub fn published_year(&self) -> i32 {
        self.published_year
    }

    pub fn period(&self) -> YearMonth {
        YearMonth::of(&self.published_at)
    }

    pub fn salary(&self) -> &Salary {
        &self.salary
    }

    pub fn key_skills(&self) -> &[String] {
        self.key_skills.as_deref().unwrap_or(&[])
    }

    pub fn has_skills(&self) -> bool {
        self.key_skills.as_ref().is_some_and(|skills| !skills.is_empty())
    }

    pub fn experience(&self) -> Option<Experience> {
        self.experience
    }

    pub fn premium(&self) -> Option<bool> {
        self.premium
    }

    pub fn employer_name(&self) -> Option<&str> {
        self.employer_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Vacancy 加上換算後的盧布薪資；`None` 表示該月份沒有匯率
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedVacancy {
    pub vacancy: Vacancy,
    pub salary_rub: Option<i64>,
}

impl NormalizedVacancy {
    pub fn new(vacancy: Vacancy, salary_rub: Option<i64>) -> Self {
        Self {
            vacancy,
            salary_rub,
        }
    }
}

pub fn parse_published_at(value: &str) -> Result<DateTime<FixedOffset>> {
    let parsed = DateTime::parse_from_str(value.trim(), PUBLISHED_AT_FORMAT).map_err(|_| {
        EtlError::DateParseError {
            value: value.to_string(),
        }
    })?;
    if !(1000..=9999).contains(&parsed.year()) {
        return Err(EtlError::DateParseError {
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

fn parse_amount(value: Option<&str>, field: Field) -> Result<Option<f64>> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|amount| amount.is_finite())
                .ok_or_else(|| EtlError::MalformedRecord {
                    reason: format!("'{}' is not a number in '{}'", raw, field.column()),
                })
        })
        .transpose()
}

fn parse_flag(value: Option<&str>, field: Field) -> Result<Option<bool>> {
    value
        .map(|raw| match raw.trim() {
            "True" | "TRUE" | "true" => Ok(true),
            "False" | "FALSE" | "false" => Ok(false),
            other => Err(EtlError::MalformedRecord {
                reason: format!("'{}' is not a boolean in '{}'", other, field.column()),
            }),
        })
        .transpose()
}

fn split_skills(raw: &str) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    for skill in raw.split('\n').map(str::trim).filter(|s| !s.is_empty()) {
        if !skills.iter().any(|known| known == skill) {
            skills.push(skill.to_string());
        }
    }
    skills
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(columns: &[&str]) -> Header {
        let names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        Header::resolve(&names).unwrap()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    const BASIC: [&str; 6] = [
        "name",
        "salary_from",
        "salary_to",
        "salary_currency",
        "area_name",
        "published_at",
    ];

    #[test]
    fn test_vacancy_from_basic_row() {
        let header = header(&BASIC);
        let vacancy = Vacancy::from_row(
            &header,
            &row(&[
                "Программист",
                "65000.0",
                "75000.0",
                "RUR",
                "Москва",
                "2007-12-04T16:28:52+0300",
            ]),
        )
        .unwrap();

        assert_eq!(vacancy.name(), "Программист");
        assert_eq!(vacancy.area_name(), "Москва");
        assert_eq!(vacancy.published_year(), 2007);
        assert_eq!(vacancy.period().to_string(), "2007-12");
        assert_eq!(vacancy.salary().mean(), 70000.0);
        assert_eq!(vacancy.salary().currency(), Currency::RUR);
        assert!(!vacancy.has_skills());
    }

    #[test]
    fn test_vacancy_with_optional_columns() {
        let header = header(&[
            "name",
            "key_skills",
            "experience_id",
            "premium",
            "employer_name",
            "salary_from",
            "salary_to",
            "salary_gross",
            "salary_currency",
            "area_name",
            "published_at",
        ]);
        let vacancy = Vacancy::from_row(
            &header,
            &row(&[
                "Web developer",
                "PHP\nMySQL\nPHP",
                "between1And3",
                "FALSE",
                "ООО Ромашка",
                "1000",
                "2000",
                "True",
                "USD",
                "Казань",
                "2019-01-15T09:00:00+0300",
            ]),
        )
        .unwrap();

        assert_eq!(vacancy.key_skills(), &["PHP".to_string(), "MySQL".to_string()]);
        assert_eq!(vacancy.experience().map(|e| e.rank()), Some(1));
        assert_eq!(vacancy.premium(), Some(false));
        assert!(vacancy.salary().is_gross());
        assert_eq!(vacancy.employer_name(), Some("ООО Ромашка"));
    }

    #[test]
    fn test_invalid_timestamp_is_date_parse_error() {
        let header = header(&BASIC);
        let err = Vacancy::from_row(
            &header,
            &row(&["Программист", "1", "2", "RUR", "Москва", "04.12.2007"]),
        )
        .unwrap_err();
        assert!(matches!(err, EtlError::DateParseError { .. }));
    }

    #[test]
    fn test_unknown_currency_code_is_malformed() {
        let header = header(&BASIC);
        let err = Vacancy::from_row(
            &header,
            &row(&["Программист", "1", "2", "XXX", "Москва", "2007-12-04T16:28:52+0300"]),
        )
        .unwrap_err();
        assert!(matches!(err, EtlError::MalformedRecord { .. }));
    }

    #[test]
    fn test_salary_mean_with_single_bound() {
        let salary = Salary::new(Some(30000.0), None, Currency::RUR, false).unwrap();
        assert_eq!(salary.mean(), 30000.0);
        let salary = Salary::new(None, Some(5000.0), Currency::EUR, false).unwrap();
        assert_eq!(salary.mean(), 5000.0);
        assert!(Salary::new(None, None, Currency::RUR, false).is_err());
    }

    #[test]
    fn test_header_requires_core_columns() {
        let names: Vec<String> = ["name", "salary_from", "area_name"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = Header::resolve(&names).unwrap_err();
        assert!(err.to_string().contains("salary_to"));
    }

    #[test]
    fn test_year_month_parse_and_display() {
        let ym: YearMonth = "2007-03".parse().unwrap();
        assert_eq!(ym, YearMonth { year: 2007, month: 3 });
        assert_eq!(ym.to_string(), "2007-03");
        assert!("2007-13".parse::<YearMonth>().is_err());
        assert!("2007/03".parse::<YearMonth>().is_err());
    }
}
