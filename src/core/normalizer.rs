use crate::core::rates::RateTable;
use crate::domain::model::{NormalizedVacancy, Salary, Vacancy, YearMonth};
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;

/// Converts salaries to their RUR equivalent.
#[derive(Debug, Clone)]
pub struct SalaryNormalizer {
    rates: Arc<RateTable>,
}

impl SalaryNormalizer {
    pub fn new(rates: Arc<RateTable>) -> Self {
        Self { rates }
    }

    /// `Ok(None)` 只會出現在按月份匯率模式：該月份沒有這個貨幣的匯率
    pub fn to_rub(&self, salary: &Salary, period: YearMonth) -> Result<Option<i64>> {
        let mean = salary.mean();
        let currency = salary.currency();
        if currency.is_base() {
            return Ok(Some(mean.round() as i64));
        }

        match self.rates.rate(currency, period) {
            Some(rate) => Ok(Some((mean * rate).round() as i64)),
            None if self.rates.is_time_indexed() => {
                tracing::debug!("No {} rate for {}, salary left unconverted", currency, period);
                Ok(None)
            }
            None => Err(EtlError::UnknownCurrency {
                code: currency.code().to_string(),
                period: period.to_string(),
            }),
        }
    }

    pub fn normalize(&self, vacancy: Vacancy) -> Result<NormalizedVacancy> {
        let salary_rub = self.to_rub(vacancy.salary(), vacancy.period())?;
        Ok(NormalizedVacancy::new(vacancy, salary_rub))
    }

    pub fn normalize_all(&self, vacancies: Vec<Vacancy>) -> Result<Vec<NormalizedVacancy>> {
        let normalized = vacancies
            .into_iter()
            .map(|vacancy| self.normalize(vacancy))
            .collect::<Result<Vec<_>>>()?;

        let unconverted = normalized.iter().filter(|v| v.salary_rub.is_none()).count();
        if unconverted > 0 {
            tracing::warn!(
                "⚠️ {} of {} salaries have no exchange rate for their month",
                unconverted,
                normalized.len()
            );
        }
        Ok(normalized)
    }
}
