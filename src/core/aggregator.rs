use crate::domain::model::NormalizedVacancy;
use crate::domain::settings::NameFilterMode;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Year(i32),
    City(String),
    Skill(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Year(year) => write!(f, "{}", year),
            GroupKey::City(name) | GroupKey::Skill(name) => f.write_str(name),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Year,
    City,
    Skill,
}

impl GroupField {
    /// Skill 欄位：一筆資料對每個技能各貢獻一次
    pub fn keys_of(&self, entity: &NormalizedVacancy) -> Vec<GroupKey> {
        let vacancy = &entity.vacancy;
        match self {
            GroupField::Year => vec![GroupKey::Year(vacancy.published_year())],
            GroupField::City => vec![GroupKey::City(vacancy.area_name().to_string())],
            GroupField::Skill => vacancy
                .key_skills()
                .iter()
                .map(|skill| GroupKey::Skill(skill.clone()))
                .collect(),
        }
    }
}

/// Ordered mapping from group key to value, kept in discovery order.
#[derive(Debug, Clone)]
pub struct AggregationResult<V> {
    entries: Vec<(GroupKey, V)>,
    index: HashMap<GroupKey, usize>,
}

impl<V> Default for AggregationResult<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

// 只比較內容與順序，索引由內容推得
impl<V: PartialEq> PartialEq for AggregationResult<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V> AggregationResult<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(GroupKey, V)>) -> Self {
        let mut result = Self {
            entries: Vec::with_capacity(entries.len()),
            index: HashMap::with_capacity(entries.len()),
        };
        for (key, value) in entries {
            result.insert(key, value);
        }
        result
    }

    /// 呼叫端保證鍵不重複
    fn from_unique(entries: Vec<(GroupKey, V)>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(slot, (key, _))| (key.clone(), slot))
            .collect();
        Self { entries, index }
    }

    /// 已存在的鍵就地覆寫並回傳舊值
    pub fn insert(&mut self, key: GroupKey, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &GroupKey) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &V)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_sorted_by_key(mut self) -> Self {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self::from_unique(self.entries)
    }

    /// 合併兩個結果；鍵重複時以後者為準
    pub fn merge_union(&mut self, other: AggregationResult<V>) {
        for (key, value) in other.entries {
            if self.insert(key.clone(), value).is_some() {
                tracing::warn!("⚠️ Key '{}' present in more than one chunk, keeping the later value", key);
            }
        }
    }
}

impl<V: PartialOrd + Clone> AggregationResult<V> {
    /// 依值遞減排序後取前 `n` 筆，同值保留原始順序
    pub fn ranked_desc(&self, n: usize) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        entries.truncate(n);
        Self::from_unique(entries)
    }
}

impl<V: Serialize> Serialize for AggregationResult<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Substring filter over vacancy names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    patterns: Vec<String>,
    mode: NameFilterMode,
}

impl NameFilter {
    pub fn new(patterns: Vec<String>, mode: NameFilterMode) -> Self {
        Self { patterns, mode }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| name.contains(pattern.as_str()))
    }

    pub fn apply<'a, T: Borrow<NormalizedVacancy>>(
        &self,
        entities: &'a [T],
    ) -> Vec<&'a NormalizedVacancy> {
        match self.mode {
            NameFilterMode::Subset => entities
                .iter()
                .map(Borrow::borrow)
                .filter(|entity| self.matches(entity.vacancy.name()))
                .collect(),
            NameFilterMode::AppendMatches => {
                let mut working: Vec<&NormalizedVacancy> =
                    entities.iter().map(Borrow::borrow).collect();
                for pattern in &self.patterns {
                    let matched: Vec<&NormalizedVacancy> = working
                        .iter()
                        .copied()
                        .filter(|entity| entity.vacancy.name().contains(pattern.as_str()))
                        .collect();
                    working.extend(matched);
                }
                working
            }
        }
    }
}

fn working_set<'a, T: Borrow<NormalizedVacancy>>(
    entities: &'a [T],
    filter: Option<&NameFilter>,
) -> Vec<&'a NormalizedVacancy> {
    match filter {
        Some(filter) => filter.apply(entities),
        None => entities.iter().map(Borrow::borrow).collect(),
    }
}

/// 鍵由完整資料集決定，值只累計工作集合
fn accumulate<T, A, F>(
    entities: &[T],
    field: GroupField,
    filter: Option<&NameFilter>,
    mut add: F,
) -> Vec<(GroupKey, A)>
where
    T: Borrow<NormalizedVacancy>,
    A: Default,
    F: FnMut(&mut A, &NormalizedVacancy),
{
    let mut slots: Vec<(GroupKey, A)> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for entity in entities {
        for key in field.keys_of(entity.borrow()) {
            if !index.contains_key(&key) {
                index.insert(key.clone(), slots.len());
                slots.push((key, A::default()));
            }
        }
    }

    for entity in working_set(entities, filter) {
        for key in field.keys_of(entity) {
            if let Some(&slot) = index.get(&key) {
                add(&mut slots[slot].1, entity);
            }
        }
    }

    slots
}

/// 平均薪資（四捨五入）；沒有可換算薪資的群組為 0
pub fn mean_by_group<T: Borrow<NormalizedVacancy>>(
    entities: &[T],
    field: GroupField,
    filter: Option<&NameFilter>,
) -> AggregationResult<i64> {
    // i128 累加，避免極端薪資溢位
    let slots = accumulate(entities, field, filter, |acc: &mut (i128, usize), entity| {
        if let Some(rub) = entity.salary_rub {
            acc.0 += i128::from(rub);
            acc.1 += 1;
        }
    });

    let entries = slots
        .into_iter()
        .map(|(key, (sum, n))| {
            let mean = if n == 0 {
                0
            } else {
                (sum as f64 / n as f64).round() as i64
            };
            (key, mean)
        })
        .collect();
    AggregationResult::from_unique(entries)
}

pub fn count_by_group<T: Borrow<NormalizedVacancy>>(
    entities: &[T],
    field: GroupField,
    filter: Option<&NameFilter>,
) -> AggregationResult<usize> {
    let entries = accumulate(entities, field, filter, |count: &mut usize, _| *count += 1);
    AggregationResult::from_unique(entries)
}

pub fn share_by_group<T: Borrow<NormalizedVacancy>>(
    entities: &[T],
    field: GroupField,
    filter: Option<&NameFilter>,
    total: usize,
) -> AggregationResult<f64> {
    let counts = count_by_group(entities, field, filter);
    let entries = counts
        .entries
        .into_iter()
        .map(|(key, count)| (key, round_share(count, total)))
        .collect();
    AggregationResult::from_unique(entries)
}

pub fn round_share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 10_000.0
}
