use crate::core::aggregator::{count_by_group, mean_by_group, GroupField, NameFilter};
use crate::core::city_filter::{CityThresholdFilter, DEFAULT_MIN_SHARE, DEFAULT_TOP_CITIES};
use crate::core::normalizer::SalaryNormalizer;
use crate::core::rates::RateTable;
use crate::core::report::{ReportDataAssembler, ReportOutcome};
use crate::core::skills::{SkillReport, SkillStatistics, DEFAULT_TOP_SKILLS_PER_YEAR, DEFAULT_TOP_SKILL_SHARES};
use crate::core::validator::{RecordValidator, ValidationDiagnostics};
use crate::domain::model::{Field, Header, RawTable, Vacancy};
use crate::domain::settings::{NameFilterMode, ValidationPolicy};
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsOptions {
    pub professions: Vec<String>,
    pub name_filter_mode: NameFilterMode,
    pub validation_policy: ValidationPolicy,
    pub city_min_share: f64,
    pub top_cities: usize,
    pub top_skill_shares: usize,
    pub top_skills_per_year: usize,
}

impl StatisticsOptions {
    pub fn for_professions(professions: Vec<String>) -> Self {
        Self {
            professions,
            ..Default::default()
        }
    }

    pub fn profession_tag(&self) -> String {
        self.professions.join(", ")
    }
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            professions: Vec::new(),
            name_filter_mode: NameFilterMode::default(),
            validation_policy: ValidationPolicy::default(),
            city_min_share: DEFAULT_MIN_SHARE,
            top_cities: DEFAULT_TOP_CITIES,
            top_skill_shares: DEFAULT_TOP_SKILL_SHARES,
            top_skills_per_year: DEFAULT_TOP_SKILLS_PER_YEAR,
        }
    }
}

/// 驗證後成功建立的 Vacancy 集合
#[derive(Debug, Clone, Default)]
pub struct VacancySet {
    pub vacancies: Vec<Vacancy>,
    pub has_skills: bool,
    pub diagnostics: ValidationDiagnostics,
}

#[derive(Debug, Clone)]
pub struct StatisticsReport {
    pub outcome: ReportOutcome,
    pub skills: Option<SkillReport>,
    pub diagnostics: ValidationDiagnostics,
}

impl StatisticsReport {
    fn without_payload(outcome: ReportOutcome, diagnostics: ValidationDiagnostics) -> Self {
        Self {
            outcome,
            skills: None,
            diagnostics,
        }
    }
}

/// 建立 VacancySet 的結果：可繼續統計，或已得出終止報表
#[derive(Debug)]
pub enum PreparedRun {
    Ready(VacancySet),
    Stopped(StatisticsReport),
}

/// Raw table in, report outcome out. One instance per run; cheap to share across workers.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    options: StatisticsOptions,
    validator: RecordValidator,
    normalizer: SalaryNormalizer,
}

impl StatisticsEngine {
    pub fn new(options: StatisticsOptions, rates: Arc<RateTable>) -> Result<Self> {
        Ok(Self {
            validator: RecordValidator::new(options.validation_policy)?,
            normalizer: SalaryNormalizer::new(rates),
            options,
        })
    }

    pub fn options(&self) -> &StatisticsOptions {
        &self.options
    }

    /// 解析標題、驗證資料列並建立 Vacancy；格式錯誤的資料列直接略過
    pub fn build_vacancies(&self, table: RawTable) -> Result<VacancySet> {
        if table.is_empty() {
            return Ok(VacancySet::default());
        }

        let header = Header::resolve(&table.header)?;
        let (rows, mut diagnostics) = self.validator.validate(&header, table.rows);

        let mut vacancies = Vec::with_capacity(rows.len());
        for row in &rows {
            match Vacancy::from_row(&header, row) {
                Ok(vacancy) => vacancies.push(vacancy),
                Err(EtlError::MalformedRecord { reason }) => {
                    tracing::debug!("Dropping malformed record: {}", reason);
                    diagnostics.malformed_records += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(VacancySet {
            vacancies,
            has_skills: header.has(Field::KeySkills),
            diagnostics,
        })
    }

    /// 檢查職業名稱與標題並建立 VacancySet；無法繼續時回傳終止報表
    pub fn prepare(&self, table: RawTable) -> Result<PreparedRun> {
        if self.options.professions.iter().all(|p| p.trim().is_empty()) {
            return Ok(PreparedRun::Stopped(StatisticsReport::without_payload(
                ReportOutcome::InvalidInput {
                    reason: "no profession name given".to_string(),
                },
                ValidationDiagnostics::default(),
            )));
        }

        match self.build_vacancies(table) {
            Ok(set) => Ok(PreparedRun::Ready(set)),
            Err(EtlError::ValidationError { message }) => Ok(PreparedRun::Stopped(
                StatisticsReport::without_payload(
                    ReportOutcome::InvalidInput { reason: message },
                    ValidationDiagnostics::default(),
                ),
            )),
            Err(e) => Err(e),
        }
    }

    pub fn run(&self, table: RawTable) -> Result<StatisticsReport> {
        match self.prepare(table)? {
            PreparedRun::Ready(set) => self.report(set),
            PreparedRun::Stopped(report) => Ok(report),
        }
    }

    pub fn report(&self, set: VacancySet) -> Result<StatisticsReport> {
        if set.vacancies.is_empty() {
            tracing::info!("📭 No valid records after validation");
            return Ok(StatisticsReport::without_payload(ReportOutcome::NoData, set.diagnostics));
        }

        tracing::debug!(
            "Built {} vacancies ({} rows dropped, {} malformed)",
            set.vacancies.len(),
            set.diagnostics.dropped_rows,
            set.diagnostics.malformed_records
        );

        let entities = self.normalizer.normalize_all(set.vacancies)?;
        let filter = NameFilter::new(self.options.professions.clone(), self.options.name_filter_mode);
        let cities =
            CityThresholdFilter::new(self.options.city_min_share, self.options.top_cities).apply(&entities);

        let payload = ReportDataAssembler::assemble(
            &self.options.profession_tag(),
            mean_by_group(&entities, GroupField::Year, None),
            count_by_group(&entities, GroupField::Year, None),
            mean_by_group(&entities, GroupField::Year, Some(&filter)),
            count_by_group(&entities, GroupField::Year, Some(&filter)),
            cities,
        )
        .into_report_order();

        let skills = set.has_skills.then(|| {
            SkillStatistics::new(self.options.top_skill_shares, self.options.top_skills_per_year)
                .compute(&entities, Some(&filter))
        });

        Ok(StatisticsReport {
            outcome: ReportOutcome::Ready(payload),
            skills,
            diagnostics: set.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::GroupKey;
    use crate::core::reader::read_raw_table_from_bytes;
    use crate::domain::settings::builtin_rates;

    const SAMPLE: &str = "\
name,salary_from,salary_to,salary_currency,area_name,published_at
Программист,65000.0,75000.0,RUR,Москва,2007-12-04T16:28:52+0300
Аналитик,1000,5000,EUR,Москва,2007-11-01T10:00:00+0300
Программист Java,30000,,RUR,Казань,2008-01-10T10:00:00+0300
Программист Python,40000,60000,XXX,Казань,2008-01-10T10:00:00+0300
Бухгалтер,20000,30000,RUR,Тверь,2008-02-01T10:00:00+0300
";

    fn engine(policy: ValidationPolicy) -> StatisticsEngine {
        let options = StatisticsOptions {
            validation_policy: policy,
            ..StatisticsOptions::for_professions(vec!["Программист".to_string()])
        };
        StatisticsEngine::new(options, Arc::new(RateTable::Static(builtin_rates()))).unwrap()
    }

    #[test]
    fn test_run_produces_six_views() {
        let table = read_raw_table_from_bytes(SAMPLE.as_bytes()).unwrap();
        let report = engine(ValidationPolicy::Strict).run(table).unwrap();

        let payload = report.outcome.payload().unwrap();
        assert_eq!(payload.profession, "Программист");
        assert_eq!(payload.salary_by_year.get(&GroupKey::Year(2007)), Some(&124850));
        assert_eq!(payload.count_by_year.get(&GroupKey::Year(2008)), Some(&1));
        assert_eq!(
            payload.salary_by_year_for_profession.get(&GroupKey::Year(2007)),
            Some(&70000)
        );
        assert_eq!(payload.count_by_year_for_profession.get(&GroupKey::Year(2008)), Some(&0));
        assert_eq!(report.diagnostics.dropped_rows, 1);
        assert_eq!(report.diagnostics.malformed_records, 1);
        assert!(report.skills.is_none());
    }

    #[test]
    fn test_single_bound_policy_keeps_open_salaries() {
        let table = read_raw_table_from_bytes(SAMPLE.as_bytes()).unwrap();
        let report = engine(ValidationPolicy::AllowSingleBound).run(table).unwrap();
        let payload = report.outcome.payload().unwrap();
        assert_eq!(
            payload.salary_by_year_for_profession.get(&GroupKey::Year(2008)),
            Some(&30000)
        );
    }

    #[test]
    fn test_missing_column_is_invalid_input() {
        let table = read_raw_table_from_bytes(b"name,salary_from\nDev,1\n").unwrap();
        let report = engine(ValidationPolicy::Strict).run(table).unwrap();
        assert!(matches!(report.outcome, ReportOutcome::InvalidInput { .. }));
    }

    #[test]
    fn test_header_only_is_no_data() {
        let header_only = SAMPLE.lines().next().unwrap();
        let table = read_raw_table_from_bytes(header_only.as_bytes()).unwrap();
        let report = engine(ValidationPolicy::Strict).run(table).unwrap();
        assert_eq!(report.outcome, ReportOutcome::NoData);

        let empty = read_raw_table_from_bytes(b"").unwrap();
        let report = engine(ValidationPolicy::Strict).run(empty).unwrap();
        assert_eq!(report.outcome, ReportOutcome::NoData);
    }

    #[test]
    fn test_empty_profession_list_is_invalid_input() {
        let options = StatisticsOptions::for_professions(vec![]);
        let engine =
            StatisticsEngine::new(options, Arc::new(RateTable::Static(builtin_rates()))).unwrap();
        let table = read_raw_table_from_bytes(SAMPLE.as_bytes()).unwrap();
        let report = engine.run(table).unwrap();
        assert!(matches!(report.outcome, ReportOutcome::InvalidInput { .. }));
    }

    #[test]
    fn test_bad_timestamp_is_hard_error() {
        let data = "name,salary_from,salary_to,salary_currency,area_name,published_at\n\
                    Dev,1,2,RUR,Москва,yesterday\n";
        let table = read_raw_table_from_bytes(data.as_bytes()).unwrap();
        let err = engine(ValidationPolicy::Strict).run(table).unwrap_err();
        assert!(matches!(err, EtlError::DateParseError { .. }));
    }

    #[test]
    fn test_huge_rur_salaries_average_without_overflow() {
        let data = "name,salary_from,salary_to,salary_currency,area_name,published_at\n\
                    Программист,5e18,5e18,RUR,Москва,2007-12-04T16:28:52+0300\n\
                    Программист,5e18,5e18,RUR,Москва,2007-12-05T16:28:52+0300\n";
        let table = read_raw_table_from_bytes(data.as_bytes()).unwrap();
        let report = engine(ValidationPolicy::Strict).run(table).unwrap();
        let payload = report.outcome.payload().unwrap();
        let huge = 5_000_000_000_000_000_000_i64;
        assert_eq!(payload.salary_by_year.get(&GroupKey::Year(2007)), Some(&huge));
        assert_eq!(
            payload.salary_by_top_city.get(&GroupKey::City("Москва".to_string())),
            Some(&huge)
        );
    }

    #[test]
    fn test_prepared_set_reports_like_run() {
        let engine = engine(ValidationPolicy::Strict);
        let table = read_raw_table_from_bytes(SAMPLE.as_bytes()).unwrap();

        let set = match engine.prepare(table.clone()).unwrap() {
            PreparedRun::Ready(set) => set,
            PreparedRun::Stopped(report) => panic!("unexpected stop: {:?}", report.outcome),
        };
        assert_eq!(set.vacancies.len(), 3);

        let from_set = engine.report(set).unwrap();
        let from_table = engine.run(table).unwrap();
        assert_eq!(from_set.outcome, from_table.outcome);
        assert_eq!(from_set.diagnostics, from_table.diagnostics);

        let bad_header = read_raw_table_from_bytes(b"name,salary_from\nDev,1\n").unwrap();
        assert!(matches!(
            engine.prepare(bad_header).unwrap(),
            PreparedRun::Stopped(StatisticsReport {
                outcome: ReportOutcome::InvalidInput { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_skills_computed_when_column_present() {
        let data = "name,key_skills,salary_from,salary_to,salary_currency,area_name,published_at\n\
                    Программист,\"Rust\nSQL\",100,200,RUR,Москва,2020-01-01T00:00:00+0300\n";
        let table = read_raw_table_from_bytes(data.as_bytes()).unwrap();
        let report = engine(ValidationPolicy::Strict).run(table).unwrap();
        let skills = report.skills.unwrap();
        assert_eq!(skills.vacancies_with_skills, 1);
        assert_eq!(skills.salary_by_skill.get(&GroupKey::Skill("Rust".to_string())), Some(&150));
    }
}
