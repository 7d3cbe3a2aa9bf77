use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use source_modifier::config::load_from_path;
use source_modifier::dispatch::{FileDispatcher, FileOutcome, Mode, RunReport};
use source_modifier::report::{ReportFormat, ReportWriter};
use source_modifier::rule::TargetKind;
use source_modifier::store::{FsStore, SaveOutcome};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "source-modifier")]
#[command(about = "Apply declarative search/replace and JSONPath rules to files", long_about = None)]
#[command(version)]
struct Cli {
    /// Rule configuration file (.json or .toml)
    config: PathBuf,

    /// Write the change report to this file (format from its extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format, overriding the output file's extension
    #[arg(short, long, value_parser = parse_format)]
    format: Option<ReportFormat>,

    /// Compute and report changes without writing files (default)
    #[arg(long, conflicts_with = "apply")]
    plan: bool,

    /// Write changed files
    #[arg(long)]
    apply: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_format(value: &str) -> Result<ReportFormat, String> {
    value.parse().map_err(|e: source_modifier::report::ReportError| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mode = match (cli.plan, cli.apply) {
        (false, true) => Mode::Apply,
        _ => Mode::Plan,
    };
    run(&cli, mode)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli, mode: Mode) -> Result<()> {
    let config = load_from_path(&cli.config)?;

    let mut writer = cli.output.as_ref().map(|path| {
        let format = cli.format.unwrap_or_else(|| ReportFormat::from_path(path));
        ReportWriter::new(path, format)
    });

    let mut dispatcher = FileDispatcher::new(FsStore, mode);
    if let Some(path) = &cli.output {
        dispatcher = dispatcher.exclude(path);
    }

    if mode == Mode::Plan {
        println!("{}", "Plan mode: no files will be modified".dimmed());
    }

    let mut total = RunReport::default();
    let mut invalid_targets = 0usize;

    for set in &config.rule_sets {
        let mut report = RunReport::default();
        let kind = set.target_kind();
        let label = match kind {
            Ok(TargetKind::File) => "file",
            Ok(TargetKind::Directory) => "folder",
            Err(_) => "path",
        };
        println!(
            "\n{}",
            format!("Processing {}: {}", label, set.target().display()).bold()
        );

        if let Err(e) = dispatcher.run_rule_set(set, &mut report) {
            eprintln!("{} {}", "✗".red(), e);
            invalid_targets += 1;
            continue;
        }

        let folder = matches!(kind, Ok(TargetKind::Directory));
        print_report(&report, mode, cli.diff, folder);

        if let Some(writer) = writer.as_mut() {
            let records: Vec<_> = report.records().cloned().collect();
            writer
                .write_batch(&records)
                .with_context(|| format!("failed to write report {}", writer.path().display()))?;
        }
        total.absorb(report);
    }

    if let Some(writer) = &writer {
        println!(
            "\nResults saved to {} ({})",
            writer.path().display(),
            writer.format()
        );
    }

    println!();
    println!("{}", "Summary:".bold());
    let verb = match mode {
        Mode::Plan => "planned",
        Mode::Apply => "applied",
    };
    println!(
        "  {} change(s) {} in {} file(s)",
        format!("{}", total.record_count()).green(),
        verb,
        total.changed_files()
    );
    println!("  {} rule(s) skipped", format!("{}", total.skipped_rules()).cyan());
    if !total.binary.is_empty() {
        println!("  {} binary file(s) ignored", format!("{}", total.binary.len()).cyan());
    }
    println!(
        "  {} failed",
        format!("{}", total.failures.len() + invalid_targets).red()
    );

    if total.has_failures() || invalid_targets > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &RunReport, mode: Mode, show_diff: bool, folder: bool) {
    for file in &report.files {
        if !folder {
            print_skips(file);
        }
        print_file(file, mode, show_diff);
    }
    // Walks skip jsonpath rules on every non-JSON file; one line per rule set
    if folder && report.skipped_rules() > 0 {
        let files = report.files.iter().filter(|f| !f.skipped.is_empty()).count();
        println!(
            "{} {} rule(s) skipped in {} file(s)",
            "⊘".cyan(),
            report.skipped_rules(),
            files
        );
    }
    for failure in &report.failures {
        eprintln!("{} {}: Failed - {}", "✗".red(), failure.path.display(), failure.error);
    }
}

fn print_skips(file: &FileOutcome) {
    for skip in &file.skipped {
        println!(
            "{} {}: Skipped rule {} ({})",
            "⊘".cyan(),
            file.path.display(),
            skip.rule,
            skip.reason
        );
    }
}

fn print_file(file: &FileOutcome, mode: Mode, show_diff: bool) {
    if file.records.is_empty() {
        return;
    }

    match (mode, file.saved) {
        (Mode::Apply, Some(SaveOutcome::Written)) => println!(
            "{} {}: {} change(s) applied",
            "✓".green(),
            file.path.display(),
            file.records.len()
        ),
        (Mode::Apply, _) => println!(
            "{} {}: already up to date",
            "⊙".yellow(),
            file.path.display()
        ),
        (Mode::Plan, _) => println!(
            "{} {}: {} change(s) planned",
            "⊙".yellow(),
            file.path.display(),
            file.records.len()
        ),
    }
    for record in &file.records {
        println!("    {}", record.to_string().dimmed());
    }

    if show_diff {
        if let Some(updated) = &file.updated {
            display_diff(&file.path, &file.original, updated);
        }
    }
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (modified)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
        if change.missing_newline() {
            println!();
        }
    }
}
