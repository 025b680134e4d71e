// contact-sheet: Build a printable index sheet from a folder of JPEGs

use chrono::Local;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use contact_sheet::{generate, MetadataRecord, SheetConfig, SheetError, SheetRequest};

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Build a 6x6 photo index sheet from a folder of JPEGs")]
struct Args {
    /// Directory containing .jpg/.jpeg files (not searched recursively)
    input_dir: PathBuf,

    /// Output filename (defaults to contact-sheet-{roll or date}.jpg)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Roll / serial number, shown emphasized in the footer
    #[arg(short, long)]
    roll: Option<String>,

    /// Lab or person who scanned the roll
    #[arg(short, long)]
    lab: Option<String>,

    /// Date text, printed as given
    #[arg(short, long)]
    date: Option<String>,

    /// Free-form notes
    #[arg(short, long)]
    notes: Option<String>,

    /// Metadata file (JSON object with serial_number, laboratory, date, notes)
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Ask for each metadata field on stdin
    #[arg(short, long)]
    prompt: bool,

    /// Extra font file for the footer text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Thumbnail worker threads (0 = one per core, 1 = sequential)
    #[arg(short, long, default_value = "0")]
    jobs: usize,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), SheetError> {
    // Geometry is fixed; validate it before touching any input
    let config = SheetConfig::standard()?;

    let metadata = collect_metadata(&args)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_output_name(&metadata)));

    let request = SheetRequest {
        input_dir: args.input_dir,
        output,
        metadata,
        jobs: args.jobs,
        font: args.font,
    };

    let report = generate(&config, &request)?;

    println!("✓ Generated: {}", request.output.display());
    println!(
        "  Size: {0}x{0} px ({1}mm @ {2} dpi)",
        config.canvas_px(),
        config.sheet().size_mm,
        config.sheet().dpi
    );
    println!("  Images: {} placed", report.placed.len());
    for skipped in &report.skipped {
        println!(
            "  Warning: skipped {} (cell {}): {}",
            skipped.path.display(),
            skipped.index + 1,
            skipped.reason
        );
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8) {
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// JSON file first, then prompted answers, then flags; later sources win
/// for fields they actually set.
fn collect_metadata(args: &Args) -> Result<MetadataRecord, SheetError> {
    let mut metadata = match &args.metadata {
        Some(path) => MetadataRecord::from_json_file(path)?,
        None => MetadataRecord::default(),
    };

    if args.prompt {
        let stdin = io::stdin();
        let answers = MetadataRecord::prompt(stdin.lock(), io::stdout())?;
        metadata = answers.overlay(metadata);
    }

    let flags = MetadataRecord::new(
        args.roll.clone(),
        args.lab.clone(),
        args.date.clone(),
        args.notes.clone(),
    );
    Ok(flags.overlay(metadata))
}

fn sanitize(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn default_output_name(metadata: &MetadataRecord) -> String {
    let stem = metadata
        .serial_number
        .as_deref()
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
    format!("contact-sheet-{}.jpg", stem)
}
