use crate::core::aggregator::{
    count_by_group, mean_by_group, share_by_group, AggregationResult, GroupField, GroupKey,
};
use crate::domain::model::NormalizedVacancy;
use std::borrow::Borrow;

pub const DEFAULT_MIN_SHARE: f64 = 0.01;
pub const DEFAULT_TOP_CITIES: usize = 10;

/// 城市層級的兩個報表視圖（已排序並截斷）
#[derive(Debug, Clone, PartialEq)]
pub struct CityViews {
    pub salary_by_city: AggregationResult<i64>,
    pub share_by_city: AggregationResult<f64>,
    pub retained_records: usize,
}

/// Keeps only cities that hold at least `min_share` of all records, then ranks the top N.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityThresholdFilter {
    min_share: f64,
    top_n: usize,
}

impl Default for CityThresholdFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SHARE, DEFAULT_TOP_CITIES)
    }
}

impl CityThresholdFilter {
    pub fn new(min_share: f64, top_n: usize) -> Self {
        Self { min_share, top_n }
    }

    pub fn threshold(&self, total: usize) -> usize {
        (total as f64 * self.min_share).floor() as usize
    }

    pub fn retain<'a, T: Borrow<NormalizedVacancy>>(
        &self,
        entities: &'a [T],
    ) -> Vec<&'a NormalizedVacancy> {
        let threshold = self.threshold(entities.len());
        let counts = count_by_group(entities, GroupField::City, None);

        entities
            .iter()
            .map(Borrow::borrow)
            .filter(|entity| {
                let key = GroupKey::City(entity.vacancy.area_name().to_string());
                counts.get(&key).is_some_and(|count| *count >= threshold)
            })
            .collect()
    }

    pub fn apply<T: Borrow<NormalizedVacancy>>(&self, entities: &[T]) -> CityViews {
        let total = entities.len();
        let retained = self.retain(entities);

        tracing::debug!(
            "🏙️ City threshold {} of {}: {} records retained",
            self.threshold(total),
            total,
            retained.len()
        );

        CityViews {
            salary_by_city: mean_by_group(&retained, GroupField::City, None).ranked_desc(self.top_n),
            share_by_city: share_by_group(&retained, GroupField::City, None, total)
                .ranked_desc(self.top_n),
            retained_records: retained.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::test_support::vacancy;

    fn city_dataset(distribution: &[(&str, usize, i64)]) -> Vec<NormalizedVacancy> {
        distribution
            .iter()
            .flat_map(|(city, n, rub)| {
                (0..*n).map(move |_| vacancy("Программист", city, 2020, Some(*rub), &[]))
            })
            .collect()
    }

    #[test]
    fn test_city_at_threshold_is_retained() {
        // 200 records -> threshold 2
        let data = city_dataset(&[("Москва", 197, 100000), ("Тула", 2, 50000), ("Омск", 1, 90000)]);
        let filter = CityThresholdFilter::default();
        assert_eq!(filter.threshold(data.len()), 2);

        let views = filter.apply(&data);
        assert!(views.share_by_city.get(&GroupKey::City("Тула".to_string())).is_some());
        assert!(views.share_by_city.get(&GroupKey::City("Омск".to_string())).is_none());
        assert_eq!(views.retained_records, 199);
    }

    #[test]
    fn test_one_below_threshold_is_excluded() {
        // 300 records -> threshold 3
        let data = city_dataset(&[("Москва", 296, 100000), ("Тула", 2, 50000), ("Омск", 2, 90000)]);
        let views = CityThresholdFilter::default().apply(&data);
        assert_eq!(views.salary_by_city.len(), 1);
        assert_eq!(views.share_by_city.get(&GroupKey::City("Москва".to_string())), Some(&0.9867));
    }

    #[test]
    fn test_ranking_truncates_to_top_n() {
        let data = city_dataset(&[
            ("A", 3, 10),
            ("B", 5, 30),
            ("C", 4, 20),
            ("D", 4, 40),
        ]);
        let views = CityThresholdFilter::new(0.01, 2).apply(&data);

        let salary: Vec<String> = views.salary_by_city.keys().map(|k| k.to_string()).collect();
        assert_eq!(salary, vec!["D", "B"]);

        let share: Vec<String> = views.share_by_city.keys().map(|k| k.to_string()).collect();
        assert_eq!(share, vec!["B", "C"]);

        let sum: f64 = views.share_by_city.values().sum();
        assert!(sum <= 1.0);
    }

    #[test]
    fn test_small_dataset_keeps_every_city() {
        let data = city_dataset(&[("A", 1, 10), ("B", 1, 20)]);
        let views = CityThresholdFilter::default().apply(&data);
        assert_eq!(views.retained_records, 2);
        assert_eq!(views.share_by_city.get(&GroupKey::City("A".to_string())), Some(&0.5));
    }
}
