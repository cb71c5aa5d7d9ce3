//! CLI entry point for mailsift.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailsift::assemble::{MessageAssembler, RunStats};
use mailsift::classify::SelfEmailClassifier;
use mailsift::config::{self, Config};
use mailsift::model::message::MessageRecord;
use mailsift::parser::mbox::read_archive;
use mailsift::report;

#[derive(Parser)]
#[command(
    name = "mailsift",
    version,
    about = "Extract, decode and classify messages from mbox archives"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Archive to extract when no subcommand is given
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from an archive
    Extract {
        path: PathBuf,
        /// Emit records as pretty JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show extraction statistics for an archive
    Stats {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);

    match cli.command {
        Some(Commands::Extract { path, json, output }) => {
            cmd_extract(&path, json, output.as_deref(), &config)
        }
        Some(Commands::Stats { path, json }) => cmd_stats(&path, json, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.file {
            Some(path) => cmd_extract(&path, false, None, &config),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsift.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsift", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Read the archive and run the full extraction with a progress bar.
fn run_extraction(
    path: &Path,
    config: &Config,
) -> anyhow::Result<(Vec<MessageRecord>, RunStats)> {
    if !path.exists() {
        anyhow::bail!("Archive not found: {}", path.display());
    }

    let content = read_archive(path)?;

    // Counting pass first (the splitter is restartable), then the real one
    let total = mailsift::parser::mbox::MessageSplitter::new(&content).count();
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Extracting [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let assembler = MessageAssembler::new(SelfEmailClassifier::new(&config.identity));
    let (records, stats) = assembler.extract_with(&content, |done| pb.set_position(done));
    pb.finish_and_clear();

    Ok((records, stats))
}

/// Extract records and print them as JSON or a table.
fn cmd_extract(
    path: &Path,
    json: bool,
    output: Option<&Path>,
    config: &Config,
) -> anyhow::Result<()> {
    let (records, stats) = run_extraction(path, config)?;

    let as_json = json || config.output.default_format == "json";
    let rendered = if as_json {
        serde_json::to_string_pretty(&serde_json::json!({
            "records": records,
            "stats": stats,
        }))?
    } else {
        render_table(&records, &stats, config)
    };

    match output {
        Some(out) => {
            std::fs::write(out, rendered)?;
            eprintln!("  Wrote {} record(s) to {}", records.len(), out.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

/// Render records and counters as a human-readable table.
fn render_table(records: &[MessageRecord], stats: &RunStats, config: &Config) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<5} {:<17} {:<28} {:<40}",
        "#", "Date", "From", "Subject"
    );
    let _ = writeln!(out, "  {}", "-".repeat(92));

    for record in records {
        let date = record
            .parsed_date
            .map(|d| d.format(&config.general.date_format).to_string())
            .unwrap_or_else(|| "(no date)".to_string());
        let from: String = record.from.chars().take(27).collect();
        let subject: String = record.subject.chars().take(39).collect();
        let _ = writeln!(
            out,
            "  {:<5} {:<17} {:<28} {:<40}",
            record.sequence, date, from, subject
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {:<22} {}", "Blocks", stats.total_blocks);
    let _ = writeln!(out, "  {:<22} {}", "Emitted", stats.emitted);
    let _ = writeln!(out, "  {:<22} {}", "No header section", stats.header_failures);
    let _ = writeln!(out, "  {:<22} {}", "Missing From/To", stats.missing_address);
    let _ = writeln!(out, "  {:<22} {}", "Self-addressed", stats.self_excluded);
    out
}

/// Show extraction statistics for an archive.
fn cmd_stats(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let start = Instant::now();
    let (records, stats) = run_extraction(path, config)?;
    let elapsed = start.elapsed();

    let range = report::date_range(&records);
    let top = report::top_senders(&records, 10);

    if json {
        let stats_json = serde_json::json!({
            "file": path.to_string_lossy(),
            "file_size": file_size,
            "stats": stats,
            "date_range": range.map(|(min, max)| serde_json::json!({
                "oldest": min.to_rfc3339(),
                "newest": max.to_rfc3339(),
            })),
            "extraction_time_ms": elapsed.as_millis(),
            "top_senders": top.iter().map(|(sender, count)| serde_json::json!({
                "sender": sender,
                "count": count,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&stats_json)?);
        return Ok(());
    }

    println!();
    println!("  {:<22} {}", "File", path.display());
    println!("  {:<22} {}", "File size", format_size(file_size, BINARY));
    println!("  {:<22} {}", "Blocks", stats.total_blocks);
    println!("  {:<22} {}", "Emitted", stats.emitted);
    println!("  {:<22} {}", "No header section", stats.header_failures);
    println!("  {:<22} {}", "Missing From/To", stats.missing_address);
    println!("  {:<22} {}", "Self-addressed", stats.self_excluded);

    if let Some((min, max)) = range {
        println!(
            "  {:<22} {} — {}",
            "Date range",
            min.format("%Y-%m-%d"),
            max.format("%Y-%m-%d")
        );
    }
    println!("  {:<22} {:.2?}", "Extraction time", elapsed);

    if !top.is_empty() {
        println!();
        println!("  Top senders:");
        for (sender, count) in &top {
            println!("    {count:>6}  {sender}");
        }
    }
    println!();

    Ok(())
}
