use std::path::PathBuf;
use std::process;

use clap::Parser;
use xlsxdiary::logging::init_cli_logger;
use xlsxdiary::{DiaryError, ExtractorBuilder, ExtractorConfig, RunSummary, SheetReport};

/// Extract diary rows and embedded images from XLSX logs into a JSON data file
#[derive(Parser, Debug)]
#[command(name = "xlsxdiary")]
#[command(version)]
struct Cli {
    /// Glob pattern for workbook file names (overrides the configured pattern)
    #[arg(value_name = "PATTERN")]
    pattern: Option<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable per-row debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the structure of each matching workbook without writing anything
    #[arg(short, long)]
    analyze: bool,
}

fn main() {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    let result = if cli.analyze {
        analyze(&cli).map(|reports| reports.iter().for_each(print_report))
    } else {
        run(&cli).map(|summary| print_summary(&summary))
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ExtractorConfig, DiaryError> {
    let config = match &cli.config {
        Some(path) => ExtractorConfig::from_toml_file(path)?,
        None => ExtractorConfig::default(),
    };
    tracing::debug!("Config: {:?}", config);
    Ok(config)
}

fn run(cli: &Cli) -> Result<RunSummary, DiaryError> {
    let extractor = ExtractorBuilder::from_config(load_config(cli)?).build()?;
    extractor.run(cli.pattern.as_deref())
}

fn analyze(cli: &Cli) -> Result<Vec<SheetReport>, DiaryError> {
    let extractor = ExtractorBuilder::from_config(load_config(cli)?).build()?;
    extractor.analyze(cli.pattern.as_deref())
}

fn print_report(report: &SheetReport) {
    let structure = &report.structure;
    println!("=== {} [{}] ===", report.file.display(), report.sheet);
    println!(
        "Rows: {}, columns: {}, images: {}",
        structure.max_row.saturating_sub(1),
        structure.headers.len(),
        report.image_count
    );
    for column in &report.columns {
        let kinds: Vec<&str> = column.kinds.iter().copied().collect();
        println!(
            "  {:<20} {:>5} filled {:>5} empty  {}",
            column.header,
            column.non_empty,
            column.empty,
            kinds.join(", ")
        );
    }
    match structure.image_col {
        Some(col) => {
            println!(
                "Image column: {} ({}), marked rows: {}",
                col,
                structure.headers[(col - 1) as usize],
                structure.image_rows.len()
            );
            for (row, value) in &report.image_values {
                println!("  row {}: {}", row, value);
            }
        }
        None => println!("No image column"),
    }
    println!();
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Files: {} found, {} processed, {} skipped",
        summary.files_found, summary.files_processed, summary.files_skipped
    );
    println!("New records: {}", summary.new_records);
    println!(
        "Total records: {} ({} with images)",
        summary.total_records, summary.image_count
    );
    if !summary.saved {
        println!("Data file unchanged");
    }
}
