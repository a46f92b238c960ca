use crate::core::aggregator::{
    count_by_group, mean_by_group, round_share, AggregationResult, GroupField, NameFilter,
};
use crate::domain::model::NormalizedVacancy;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeMap;

pub const DEFAULT_TOP_SKILL_SHARES: usize = 25;
pub const DEFAULT_TOP_SKILLS_PER_YEAR: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillReport {
    pub vacancies_with_skills: usize,
    pub skill_shares: AggregationResult<f64>,
    pub other_skill_share: f64,
    pub top_skills_by_year: BTreeMap<i32, AggregationResult<usize>>,
    pub salary_by_skill: AggregationResult<i64>,
}

/// 技能統計：整體佔比、每年前 N 名技能、各技能平均薪資
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillStatistics {
    top_shares: usize,
    top_per_year: usize,
}

impl Default for SkillStatistics {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_SKILL_SHARES, DEFAULT_TOP_SKILLS_PER_YEAR)
    }
}

impl SkillStatistics {
    pub fn new(top_shares: usize, top_per_year: usize) -> Self {
        Self {
            top_shares,
            top_per_year,
        }
    }

    pub fn compute<T: Borrow<NormalizedVacancy>>(
        &self,
        entities: &[T],
        filter: Option<&NameFilter>,
    ) -> SkillReport {
        let working: Vec<&NormalizedVacancy> = match filter {
            Some(filter) => filter.apply(entities),
            None => entities.iter().map(Borrow::borrow).collect(),
        };
        let with_skills: Vec<&NormalizedVacancy> = working
            .into_iter()
            .filter(|entity| entity.vacancy.has_skills())
            .collect();
        let total = with_skills.len();

        let counts = count_by_group(&with_skills, GroupField::Skill, None);
        let all_shares = AggregationResult::from_entries(
            counts
                .iter()
                .map(|(key, count)| (key.clone(), round_share(*count, total)))
                .collect(),
        );
        let ranked = all_shares.ranked_desc(all_shares.len());
        let skill_shares = ranked.ranked_desc(self.top_shares);
        let other: f64 = ranked.values().skip(self.top_shares).sum();

        let mut by_year: BTreeMap<i32, Vec<&NormalizedVacancy>> = BTreeMap::new();
        for entity in &with_skills {
            by_year
                .entry(entity.vacancy.published_year())
                .or_default()
                .push(entity);
        }
        let top_skills_by_year = by_year
            .into_iter()
            .map(|(year, group)| {
                let ranked = count_by_group(&group, GroupField::Skill, None)
                    .ranked_desc(self.top_per_year);
                (year, ranked)
            })
            .collect();

        tracing::debug!("🧠 Skill statistics over {} vacancies with skills", total);

        SkillReport {
            vacancies_with_skills: total,
            skill_shares,
            other_skill_share: (other * 10_000.0).round() / 10_000.0,
            top_skills_by_year,
            salary_by_skill: mean_by_group(&with_skills, GroupField::Skill, None)
                .ranked_desc(usize::MAX),
        }
    }
}
