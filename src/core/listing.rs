use crate::domain::model::{Currency, Experience, Vacancy};
use crate::domain::settings::builtin_rates;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

const LISTING_DATE_FORMAT: &str = "%d.%m.%Y";

/// 單一篩選條件，格式為 `key: value`
#[derive(Debug, Clone, PartialEq)]
pub enum ListingFilter {
    /// 必須包含所有列出的技能
    Skills(Vec<String>),
    /// 數值落在 `[salary_from, salary_to]` 內
    Salary(f64),
    Experience(Experience),
    Currency(Currency),
    Premium(bool),
    PublishedOn(NaiveDate),
    Name(String),
    City(String),
    Employer(String),
}

impl ListingFilter {
    pub fn matches(&self, vacancy: &Vacancy) -> bool {
        match self {
            ListingFilter::Skills(required) => required
                .iter()
                .all(|skill| vacancy.key_skills().iter().any(|s| s == skill)),
            ListingFilter::Salary(value) => vacancy.salary().contains(*value),
            ListingFilter::Experience(experience) => vacancy.experience() == Some(*experience),
            ListingFilter::Currency(currency) => vacancy.salary().currency() == *currency,
            ListingFilter::Premium(premium) => vacancy.premium() == Some(*premium),
            ListingFilter::PublishedOn(date) => vacancy.published_at().date_naive() == *date,
            ListingFilter::Name(name) => vacancy.name() == name,
            ListingFilter::City(city) => vacancy.area_name() == city,
            ListingFilter::Employer(employer) => vacancy.employer_name() == Some(employer.as_str()),
        }
    }
}

impl FromStr for ListingFilter {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| EtlError::InvalidConfigValueError {
            field: "listing.filter".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (key, value) = s
            .split_once(": ")
            .ok_or_else(|| invalid("expected 'key: value'"))?;
        let value = value.trim();

        let filter = match key.trim() {
            "skills" => ListingFilter::Skills(value.split(", ").map(str::to_string).collect()),
            "salary" => ListingFilter::Salary(
                value
                    .parse()
                    .map_err(|_| invalid("salary must be a number"))?,
            ),
            "experience" => ListingFilter::Experience(value.parse()?),
            "currency" => ListingFilter::Currency(value.parse()?),
            "premium" => ListingFilter::Premium(match value {
                "true" | "yes" => true,
                "false" | "no" => false,
                _ => return Err(invalid("premium must be true or false")),
            }),
            "published" => ListingFilter::PublishedOn(
                NaiveDate::parse_from_str(value, LISTING_DATE_FORMAT)
                    .map_err(|_| invalid("date must be dd.mm.yyyy"))?,
            ),
            "name" => ListingFilter::Name(value.to_string()),
            "city" => ListingFilter::City(value.to_string()),
            "employer" => ListingFilter::Employer(value.to_string()),
            _ => return Err(invalid("unknown filter key")),
        };
        Ok(filter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    SkillCount,
    Salary,
    Experience,
    PublishedAt,
    Name,
    City,
    Employer,
}

impl FromStr for SortKey {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "skills" => Ok(SortKey::SkillCount),
            "salary" => Ok(SortKey::Salary),
            "experience" => Ok(SortKey::Experience),
            "published" => Ok(SortKey::PublishedAt),
            "name" => Ok(SortKey::Name),
            "city" => Ok(SortKey::City),
            "employer" => Ok(SortKey::Employer),
            other => Err(EtlError::InvalidConfigValueError {
                field: "listing.sort".to_string(),
                value: other.to_string(),
                reason: "Valid values: skills, salary, experience, published, name, city, employer"
                    .to_string(),
            }),
        }
    }
}

/// 1-based half-open row range; `end = None` runs to the last row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl FromStr for RowRange {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EtlError::InvalidConfigValueError {
            field: "listing.range".to_string(),
            value: s.to_string(),
            reason: "expected 'start' or 'start..end' with start >= 1".to_string(),
        };
        let (start, end) = match s.trim().split_once("..") {
            Some((start, end)) => (start, Some(end)),
            None => (s.trim(), None),
        };
        let start: usize = start.parse().map_err(|_| invalid())?;
        let end = end
            .map(|end| end.parse::<usize>().map_err(|_| invalid()))
            .transpose()?;
        if start == 0 || end.is_some_and(|end| end < start) {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub filter: Option<ListingFilter>,
    pub sort: Option<SortKey>,
    pub descending: bool,
    pub range: Option<RowRange>,
}

/// Filter / sort / slice over validated vacancies. Salary ordering uses the built-in rate table.
#[derive(Debug, Clone)]
pub struct VacancyListing {
    rates: BTreeMap<Currency, f64>,
}

impl Default for VacancyListing {
    fn default() -> Self {
        Self {
            rates: builtin_rates(),
        }
    }
}

impl VacancyListing {
    pub fn new() -> Self {
        Self::default()
    }

    fn rub_estimate(&self, vacancy: &Vacancy) -> f64 {
        let salary = vacancy.salary();
        salary.mean() * self.rates.get(&salary.currency()).copied().unwrap_or(0.0)
    }

    fn compare(&self, key: SortKey, a: &Vacancy, b: &Vacancy) -> Ordering {
        match key {
            SortKey::SkillCount => a.key_skills().len().cmp(&b.key_skills().len()),
            SortKey::Salary => self
                .rub_estimate(a)
                .partial_cmp(&self.rub_estimate(b))
                .unwrap_or(Ordering::Equal),
            SortKey::Experience => a
                .experience()
                .map(|e| e.rank())
                .cmp(&b.experience().map(|e| e.rank())),
            SortKey::PublishedAt => a.published_at().cmp(b.published_at()),
            SortKey::Name => a.name().cmp(b.name()),
            SortKey::City => a.area_name().cmp(b.area_name()),
            SortKey::Employer => a.employer_name().cmp(&b.employer_name()),
        }
    }

    pub fn query<'a>(&self, vacancies: &'a [Vacancy], query: &ListingQuery) -> Vec<&'a Vacancy> {
        let mut rows: Vec<&Vacancy> = match &query.filter {
            Some(filter) => vacancies.iter().filter(|v| filter.matches(v)).collect(),
            None => vacancies.iter().collect(),
        };

        if let Some(key) = query.sort {
            if query.descending {
                rows.sort_by(|a, b| self.compare(key, b, a));
            } else {
                rows.sort_by(|a, b| self.compare(key, a, b));
            }
        }

        if let Some(range) = query.range {
            let skip = range.start - 1;
            let take = range.end.map_or(usize::MAX, |end| end - range.start);
            rows = rows.into_iter().skip(skip).take(take).collect();
        }

        tracing::debug!("📋 Listing query returned {} rows", rows.len());
        rows
    }
}
