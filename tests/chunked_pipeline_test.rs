use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use vacancy_etl::core::chunks::ChunkSplitter;
use vacancy_etl::core::Storage;
use vacancy_etl::domain::settings::{NameFilterMode, ValidationPolicy};
use vacancy_etl::{ChunkedPipeline, CliConfig, EtlEngine, EtlStatus, LocalStorage, TomlConfig};

const VACANCIES: &str = "\
name,salary_from,salary_to,salary_currency,area_name,published_at
Программист,1000,3000,USD,Москва,2007-12-10T10:00:00+0300
Программист,50000,70000,RUR,Москва,2007-12-11T10:00:00+0300
Аналитик,1000,2000,EUR,Казань,2008-01-05T10:00:00+0300
Программист,80000,100000,RUR,Казань,2008-01-06T10:00:00+0300
Программист,80000,100000,RUR,Казань,not-a-date
";

const RATES: &str = "\
date,USD,EUR
2007-12,24.55,35.93
2008-01,24.48,
";

fn chunk_config(chunks: &Path, rates: &Path, output: &str) -> CliConfig {
    CliConfig {
        input: String::new(),
        chunks: Some(chunks.to_string_lossy().to_string()),
        professions: vec!["Программист".to_string()],
        rates: Some(rates.to_string_lossy().to_string()),
        output_path: output.to_string(),
        formats: vec!["json".to_string()],
        workers: Some(2),
        name_filter: NameFilterMode::Subset,
        validation: ValidationPolicy::Strict,
        city_min_share: 0.01,
        top_cities: 10,
        list_filter: None,
        list_sort: None,
        list_desc: false,
        list_range: None,
        verbose: false,
        monitor: false,
        json_logs: false,
    }
}

fn read_entry(data: Vec<u8>, name: &str) -> anyhow::Result<serde_json::Value> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))?;
    let mut content = String::new();
    archive.by_name(name)?.read_to_string(&mut content)?;
    Ok(serde_json::from_str(&content)?)
}

#[tokio::test]
async fn test_split_then_batch_with_failed_chunk() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("vacancies.csv");
    std::fs::write(&input, VACANCIES)?;
    let rates = temp_dir.path().join("currencies.csv");
    std::fs::write(&rates, RATES)?;

    let chunk_dir = temp_dir.path().join("csv_by_years");
    let summary = ChunkSplitter::new(&chunk_dir).split_file(&input)?;
    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.rows_written, 4);
    assert_eq!(summary.skipped_rows, 1);

    // 手動放一個日期壞掉的分塊
    std::fs::write(
        chunk_dir.join("part_1999.csv"),
        "name,salary_from,salary_to,salary_currency,area_name,published_at\n\
         Программист,1,2,RUR,Москва,1999-13-45\n",
    )?;

    let output_path = temp_dir.path().join("output").to_string_lossy().to_string();
    let config = chunk_config(&chunk_dir, &rates, &output_path);
    let storage = LocalStorage::new(output_path.clone());
    let engine = EtlEngine::new_with_monitoring(ChunkedPipeline::new(storage.clone(), config), false);

    let status = engine.run().await?;
    assert!(matches!(
        status,
        EtlStatus::Completed {
            failed_chunks: 1,
            ..
        }
    ));

    let zip_data = storage.read_file("report.zip").await?;
    let report = read_entry(zip_data.clone(), "report.json")?;
    let payload = &report["report"];

    assert_eq!(payload["salary_by_year"]["2007"], 54550);
    // EUR 在 2008-01 沒有匯率：不計入平均，但仍計數
    assert_eq!(payload["salary_by_year"]["2008"], 90000);
    assert_eq!(payload["count_by_year"]["2008"], 2);
    assert_eq!(payload["count_by_year_for_profession"]["2008"], 1);
    assert_eq!(payload["salary_by_top_city"]["Москва"], 54550);
    assert_eq!(payload["salary_by_top_city"]["Казань"], 90000);
    assert_eq!(report["diagnostics"]["accepted_rows"], 4);

    let failures = read_entry(zip_data, "failed_chunks.json")?;
    let failures = failures.as_array().cloned().unwrap_or_default();
    assert_eq!(failures.len(), 1);
    assert!(failures[0]["path"]
        .as_str()
        .is_some_and(|path| path.ends_with("part_1999.csv")));

    Ok(())
}

#[tokio::test]
async fn test_empty_chunk_directory_reports_no_data() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let chunk_dir = temp_dir.path().join("chunks");
    std::fs::create_dir_all(&chunk_dir)?;
    let rates = temp_dir.path().join("currencies.csv");
    std::fs::write(&rates, RATES)?;

    let output_path = temp_dir.path().join("output").to_string_lossy().to_string();
    let config = chunk_config(&chunk_dir, &rates, &output_path);
    let storage = LocalStorage::new(output_path.clone());

    let status = EtlEngine::new(ChunkedPipeline::new(storage, config)).run().await?;
    assert_eq!(status, EtlStatus::NoData);
    assert!(!Path::new(&output_path).join("report.zip").exists());
    Ok(())
}

#[tokio::test]
async fn test_toml_config_drives_chunked_run() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("vacancies.csv");
    std::fs::write(&input, VACANCIES)?;
    let chunk_dir = temp_dir.path().join("chunks");
    ChunkSplitter::new(&chunk_dir).split_file(&input)?;
    let output_path = temp_dir.path().join("output");

    let toml_content = format!(
        r#"
[report]
name = "toml-chunks"
professions = ["Аналитик"]

[source]
type = "chunks"
path = "{}"

[aggregation]
name_filter = "subset"
top_cities = 1

[load]
output_path = "{}"
output_formats = ["json", "csv"]

[performance]
workers = 1
"#,
        chunk_dir.to_string_lossy().replace('\\', "/"),
        output_path.to_string_lossy().replace('\\', "/")
    );
    let config = TomlConfig::from_toml_str(&toml_content)?;
    config.validate_config()?;

    let storage = LocalStorage::new(output_path.clone());
    let status = EtlEngine::new(ChunkedPipeline::new(storage.clone(), config))
        .run()
        .await?;
    assert!(matches!(status, EtlStatus::Completed { failed_chunks: 0, .. }));

    let zip_data = storage.read_file("report.zip").await?;
    let report = read_entry(zip_data.clone(), "report.json")?;
    let payload = &report["report"];

    // 內建匯率：USD 2000 * 60.66，EUR 1500 * 59.90
    assert_eq!(payload["salary_by_year"]["2007"], 90660);
    assert_eq!(payload["salary_by_year"]["2008"], 89925);
    assert_eq!(payload["salary_by_year_for_profession"]["2008"], 89850);
    assert_eq!(payload["count_by_year_for_profession"]["2007"], 0);

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    assert!(archive.by_name("salary_by_year.csv").is_ok());
    assert!(archive.by_name("failed_chunks.json").is_err());
    Ok(())
}
