use crate::core::aggregator::AggregationResult;
use crate::core::city_filter::CityViews;
use serde::Serialize;

/// The six statistics views plus the profession they were computed for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    pub profession: String,
    pub salary_by_year: AggregationResult<i64>,
    pub count_by_year: AggregationResult<usize>,
    pub salary_by_year_for_profession: AggregationResult<i64>,
    pub count_by_year_for_profession: AggregationResult<usize>,
    pub salary_by_top_city: AggregationResult<i64>,
    pub share_by_top_city: AggregationResult<f64>,
}

impl ReportPayload {
    /// 前 N 名以外城市的佔比
    pub fn other_city_share(&self) -> f64 {
        let top: f64 = self.share_by_top_city.values().sum();
        ((1.0 - top) * 10_000.0).round() / 10_000.0
    }

    /// Year views ordered by year; city views keep their ranking.
    pub fn into_report_order(self) -> Self {
        Self {
            salary_by_year: self.salary_by_year.into_sorted_by_key(),
            count_by_year: self.count_by_year.into_sorted_by_key(),
            salary_by_year_for_profession: self.salary_by_year_for_profession.into_sorted_by_key(),
            count_by_year_for_profession: self.count_by_year_for_profession.into_sorted_by_key(),
            ..self
        }
    }

    /// 分塊合併：各視圖做聯集，城市視圖不重新截斷
    pub fn merge_union(&mut self, other: ReportPayload) {
        if self.profession.is_empty() {
            self.profession = other.profession;
        }
        self.salary_by_year.merge_union(other.salary_by_year);
        self.count_by_year.merge_union(other.count_by_year);
        self.salary_by_year_for_profession
            .merge_union(other.salary_by_year_for_profession);
        self.count_by_year_for_profession
            .merge_union(other.count_by_year_for_profession);
        self.salary_by_top_city.merge_union(other.salary_by_top_city);
        self.share_by_top_city.merge_union(other.share_by_top_city);
    }

    pub fn empty(profession: &str) -> Self {
        Self {
            profession: profession.to_string(),
            salary_by_year: AggregationResult::new(),
            count_by_year: AggregationResult::new(),
            salary_by_year_for_profession: AggregationResult::new(),
            count_by_year_for_profession: AggregationResult::new(),
            salary_by_top_city: AggregationResult::new(),
            share_by_top_city: AggregationResult::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Ready(ReportPayload),
    NoData,
    InvalidInput { reason: String },
}

impl ReportOutcome {
    pub fn payload(&self) -> Option<&ReportPayload> {
        match self {
            ReportOutcome::Ready(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ReportOutcome::Ready(_))
    }
}

pub struct ReportDataAssembler;

impl ReportDataAssembler {
    pub fn assemble(
        profession: &str,
        salary_by_year: AggregationResult<i64>,
        count_by_year: AggregationResult<usize>,
        salary_by_year_for_profession: AggregationResult<i64>,
        count_by_year_for_profession: AggregationResult<usize>,
        cities: CityViews,
    ) -> ReportPayload {
        ReportPayload {
            profession: profession.to_string(),
            salary_by_year,
            count_by_year,
            salary_by_year_for_profession,
            count_by_year_for_profession,
            salary_by_top_city: cities.salary_by_city,
            share_by_top_city: cities.share_by_city,
        }
    }
}
