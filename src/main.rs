use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use survey_harmonise::io::excel_read;
use survey_harmonise::{HarmoniseConfig, Result, ToolError, harmonise, logging, summarise_changes};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = logging::init_tracing(cli.verbose) {
        eprintln!("warning: {error}");
    }
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Harmonise(args) => execute_harmonise(args),
        Command::Summary(args) => execute_summary(args),
    }
}

fn execute_harmonise(args: HarmoniseArgs) -> Result<()> {
    require_exists(&args.changes)?;
    require_exists(&args.input)?;

    let changes = excel_read::read_change_table(&args.changes, args.sheet.as_deref())?;
    let config = HarmoniseConfig::new(args.input, args.output)
        .with_recode_verification(args.verify_recodes);
    let summary = harmonise(&changes, config)?;

    for outcome in &summary.files {
        println!(
            "{}: {} renamed, {} recoded, {} unchanged columns verified",
            outcome.file,
            outcome.renamed.len(),
            outcome.recoded.len(),
            outcome.unchanged_columns_checked
        );
    }

    if let Some(report) = args.report {
        fs::write(report, serde_json::to_string_pretty(&summary)?)?;
    }
    Ok(())
}

fn execute_summary(args: SummaryArgs) -> Result<()> {
    require_exists(&args.changes)?;

    let changes = excel_read::read_change_table(&args.changes, args.sheet.as_deref())?;
    let markdown = summarise_changes(&changes);
    match args.output {
        Some(path) => fs::write(path, markdown)?,
        None => println!("{markdown}"),
    }
    Ok(())
}

fn require_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::MissingInput(path.to_path_buf()))
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Harmonise survey files from a spreadsheet of variable changes."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the change table to every referenced survey file.
    Harmonise(HarmoniseArgs),
    /// Print a markdown digest of the change table.
    Summary(SummaryArgs),
}

#[derive(clap::Args)]
struct HarmoniseArgs {
    /// Change specification workbook.
    #[arg(long)]
    changes: PathBuf,

    /// Sheet holding the change table; defaults to the first sheet.
    #[arg(long)]
    sheet: Option<String>,

    /// Directory containing the input survey files.
    #[arg(long)]
    input: PathBuf,

    /// Directory the harmonised files are written to.
    #[arg(long)]
    output: PathBuf,

    /// Also check that every recode conserved row counts.
    #[arg(long)]
    verify_recodes: bool,

    /// Optional path for a JSON report of the run.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
struct SummaryArgs {
    /// Change specification workbook.
    #[arg(long)]
    changes: PathBuf,

    /// Sheet holding the change table; defaults to the first sheet.
    #[arg(long)]
    sheet: Option<String>,

    /// Write the summary here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}
