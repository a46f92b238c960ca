use crate::core::etl::TransformResult;
use crate::core::report::ReportPayload;
use crate::core::validator::ValidationDiagnostics;
use crate::core::Storage;
use crate::domain::model::Vacancy;
use crate::domain::settings::OutputFormat;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const BUNDLE_FILE_NAME: &str = "report.zip";

const OTHER_CITIES_LABEL: &str = "Другие";

#[derive(Serialize)]
struct ReportDocument<'a> {
    report: &'a ReportPayload,
    other_city_share: f64,
    diagnostics: &'a ValidationDiagnostics,
}

fn csv_bytes<F>(header: &[&str], write_rows: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> Result<()>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    write_rows(&mut writer)?;
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// 年份表：整體與職業的平均薪資、數量並列
pub fn salary_by_year_csv(payload: &ReportPayload) -> Result<Vec<u8>> {
    csv_bytes(
        &[
            "year",
            "salary",
            "count",
            "salary_for_profession",
            "count_for_profession",
        ],
        |writer| {
            for (key, salary) in payload.salary_by_year.iter() {
                let count = payload.count_by_year.get(key).copied().unwrap_or(0);
                let profession_salary = payload
                    .salary_by_year_for_profession
                    .get(key)
                    .copied()
                    .unwrap_or(0);
                let profession_count = payload
                    .count_by_year_for_profession
                    .get(key)
                    .copied()
                    .unwrap_or(0);
                writer.write_record([
                    key.to_string(),
                    salary.to_string(),
                    count.to_string(),
                    profession_salary.to_string(),
                    profession_count.to_string(),
                ])?;
            }
            Ok(())
        },
    )
}

pub fn salary_by_city_csv(payload: &ReportPayload) -> Result<Vec<u8>> {
    csv_bytes(&["city", "salary"], |writer| {
        for (key, salary) in payload.salary_by_top_city.iter() {
            writer.write_record([key.to_string(), salary.to_string()])?;
        }
        Ok(())
    })
}

pub fn share_by_city_csv(payload: &ReportPayload) -> Result<Vec<u8>> {
    csv_bytes(&["city", "share"], |writer| {
        for (key, share) in payload.share_by_top_city.iter() {
            writer.write_record([key.to_string(), share.to_string()])?;
        }
        writer.write_record([
            OTHER_CITIES_LABEL.to_string(),
            payload.other_city_share().to_string(),
        ])?;
        Ok(())
    })
}

pub fn listing_csv(listing: &[Vacancy]) -> Result<Vec<u8>> {
    csv_bytes(
        &[
            "name",
            "employer_name",
            "area_name",
            "salary_from",
            "salary_to",
            "salary_currency",
            "salary_gross",
            "experience_id",
            "premium",
            "key_skills",
            "published_at",
        ],
        |writer| {
            for vacancy in listing {
                let salary = vacancy.salary();
                let bound = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
                writer.write_record([
                    vacancy.name().to_string(),
                    vacancy.employer_name().unwrap_or_default().to_string(),
                    vacancy.area_name().to_string(),
                    bound(salary.salary_from()),
                    bound(salary.salary_to()),
                    salary.currency().to_string(),
                    salary.is_gross().to_string(),
                    vacancy
                        .experience()
                        .map(|e| e.id().to_string())
                        .unwrap_or_default(),
                    vacancy.premium().map(|p| p.to_string()).unwrap_or_default(),
                    vacancy.key_skills().join("\n"),
                    vacancy.published_at().format("%d.%m.%Y").to_string(),
                ])?;
            }
            Ok(())
        },
    )
}

/// Packs the transform output into an in-memory ZIP archive.
pub fn build_bundle(result: &TransformResult, formats: &[OutputFormat]) -> Result<Vec<u8>> {
    let payload = result
        .outcome
        .payload()
        .ok_or_else(|| EtlError::ProcessingError {
            message: "no report payload to write".to_string(),
        })?;

    let mut files: Vec<(&str, Vec<u8>)> = Vec::new();

    if formats.contains(&OutputFormat::Json) {
        let document = ReportDocument {
            report: payload,
            other_city_share: payload.other_city_share(),
            diagnostics: &result.diagnostics,
        };
        files.push(("report.json", serde_json::to_vec_pretty(&document)?));
        if let Some(skills) = &result.skills {
            files.push(("skills.json", serde_json::to_vec_pretty(skills)?));
        }
        if let Some(listing) = &result.listing {
            files.push(("listing.json", serde_json::to_vec_pretty(listing)?));
        }
    }

    if formats.contains(&OutputFormat::Csv) {
        files.push(("salary_by_year.csv", salary_by_year_csv(payload)?));
        files.push(("salary_by_city.csv", salary_by_city_csv(payload)?));
        files.push(("share_by_city.csv", share_by_city_csv(payload)?));
        if let Some(listing) = &result.listing {
            files.push(("listing.csv", listing_csv(listing)?));
        }
    }

    if !result.failed_chunks.is_empty() {
        files.push((
            "failed_chunks.json",
            serde_json::to_vec_pretty(&result.failed_chunks)?,
        ));
    }

    tracing::debug!("Creating ZIP file with {} files", files.len());

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(name, FileOptions::default())?;
        zip.write_all(&data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

pub async fn write_bundle<S: Storage>(
    storage: &S,
    output_path: &str,
    result: &TransformResult,
    formats: &[OutputFormat],
) -> Result<String> {
    let zip_data = build_bundle(result, formats)?;

    tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
    storage.write_file(BUNDLE_FILE_NAME, &zip_data).await?;

    Ok(format!("{}/{}", output_path.trim_end_matches('/'), BUNDLE_FILE_NAME))
}
