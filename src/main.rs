use std::path::PathBuf;
use std::process;

use clap::Parser;

#[derive(Parser)]
#[command(name = "capdoc-pdf")]
#[command(version)]
#[command(about = "Export a product-capabilities document as a paginated PDF", long_about = None)]
struct Cli {
    /// Content JSON file
    #[arg(value_name = "CONTENT")]
    input: PathBuf,

    /// Export settings JSON file
    #[arg(short, long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Output PDF (defaults to the input path with a .pdf extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print progress milestones to stderr
    #[arg(long)]
    progress: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("pdf"));

    let mut print_progress = |percent: u8, message: &str| eprintln!("[{percent:>3}%] {message}");
    let on_progress: Option<capdoc_pdf::ProgressFn<'_>> = if cli.progress {
        Some(&mut print_progress)
    } else {
        None
    };

    if let Err(e) = capdoc_pdf::generate_pdf_file_with_progress(
        &cli.input,
        cli.settings.as_deref(),
        &output,
        on_progress,
    ) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    println!("Wrote {}", output.display());
}
