use crate::core::reader::read_raw_table_from_path;
use crate::domain::model::{parse_published_at, Field, Header, RawTable};
use crate::utils::error::Result;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn chunk_file_name(year: i32) -> String {
    format!("part_{}.csv", year)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub files: Vec<PathBuf>,
    pub rows_written: usize,
    pub skipped_rows: usize,
}

/// 依發布年份把一個大型 CSV 切成 `part_<year>.csv`
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    output_dir: PathBuf,
}

impl ChunkSplitter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn split_file(&self, input: &Path) -> Result<SplitSummary> {
        tracing::info!("✂️ Splitting {} by publication year", input.display());
        let table = read_raw_table_from_path(input)?;
        self.split_table(table)
    }

    pub fn split_table(&self, table: RawTable) -> Result<SplitSummary> {
        let mut summary = SplitSummary::default();
        if table.is_empty() {
            return Ok(summary);
        }

        let header = Header::resolve(&table.header)?;
        let mut by_year: BTreeMap<i32, Vec<Vec<String>>> = BTreeMap::new();

        for row in table.rows {
            let year = header
                .value(&row, Field::PublishedAt)
                .and_then(|value| parse_published_at(value).ok())
                .map(|timestamp| timestamp.year());
            match year {
                Some(year) => by_year.entry(year).or_default().push(row),
                None => summary.skipped_rows += 1,
            }
        }

        std::fs::create_dir_all(&self.output_dir)?;
        for (year, rows) in by_year {
            let path = self.output_dir.join(chunk_file_name(year));
            let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&path)?;
            writer.write_record(&table.header)?;
            for row in &rows {
                writer.write_record(row)?;
            }
            writer.flush()?;

            tracing::debug!("Wrote {} rows to {}", rows.len(), path.display());
            summary.rows_written += rows.len();
            summary.files.push(path);
        }

        if summary.skipped_rows > 0 {
            tracing::warn!("⚠️ Skipped {} rows with unparseable dates", summary.skipped_rows);
        }
        tracing::info!(
            "✅ Wrote {} chunk files ({} rows)",
            summary.files.len(),
            summary.rows_written
        );
        Ok(summary)
    }
}
