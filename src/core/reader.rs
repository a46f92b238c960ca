use crate::domain::model::RawTable;
use crate::utils::error::Result;
use std::io::Read;
use std::path::Path;

const BOM: char = '\u{feff}';

/// 讀取 CSV：第一列為標題，其餘原樣保留（欄位數可能不一致）
pub fn read_raw_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let header = match records.next() {
        Some(record) => record?
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                if index == 0 {
                    cell.trim_start_matches(BOM).trim().to_string()
                } else {
                    cell.trim().to_string()
                }
            })
            .collect::<Vec<_>>(),
        None => return Ok(RawTable::default()),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    tracing::debug!("Read CSV with {} columns and {} rows", header.len(), rows.len());
    Ok(RawTable::new(header, rows))
}

pub fn read_raw_table_from_bytes(data: &[u8]) -> Result<RawTable> {
    read_raw_table(data)
}

pub fn read_raw_table_from_path(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path)?;
    read_raw_table(std::io::BufReader::new(file))
}
