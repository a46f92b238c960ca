use clap::Parser;
use std::path::PathBuf;
use vacancy_etl::core::chunks::ChunkSplitter;
use vacancy_etl::utils::logger;

#[derive(Parser)]
#[command(name = "split-chunks")]
#[command(about = "Split a vacancy CSV into per-year chunk files (part_<year>.csv)")]
struct Args {
    /// Source CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the chunk files
    #[arg(short, long, default_value = "csv_by_years")]
    output_dir: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let summary = ChunkSplitter::new(&args.output_dir).split_file(&args.input)?;

    println!(
        "✅ {} chunk files written to {} ({} rows, {} skipped)",
        summary.files.len(),
        args.output_dir.display(),
        summary.rows_written,
        summary.skipped_rows
    );
    Ok(())
}
