//! CLI entry point for `mailscrub`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailscrub::anonymize::{address_hash, NameDictionary};
use mailscrub::config::Config;
use mailscrub::pipeline::{DropReason, Pipeline, ProjectOutput};
use mailscrub::project::{read_project_list, Project};

/// Normalize email archives into privacy-scrubbed JSON records.
#[derive(Parser)]
#[command(name = "mailscrub", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, pseudonymize and redact one or more project directories
    Run {
        /// Project directories (each becomes one output subdirectory)
        #[arg(value_name = "DIR")]
        projects: Vec<PathBuf>,

        /// File listing project directories, one per line
        #[arg(long, value_name = "FILE")]
        project_list: Option<PathBuf>,

        /// Existing directory the run is written into
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// First-name dictionary (one name per line)
        #[arg(long, value_name = "FILE")]
        first_names: Option<PathBuf>,

        /// Last-name dictionary (one name per line)
        #[arg(long, value_name = "FILE")]
        last_names: Option<PathBuf>,

        /// Worker threads (0 = one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Print the pseudonymous token for an address
    Hash {
        address: String,
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

    let config = mailscrub::config::load_config()?;

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Run {
            projects,
            project_list,
            output,
            first_names,
            last_names,
            jobs,
        } => {
            let mut config = config;
            if first_names.is_some() {
                config.names.first_names = first_names;
            }
            if last_names.is_some() {
                config.names.last_names = last_names;
            }
            if let Some(jobs) = jobs {
                config.pipeline.jobs = jobs;
            }
            cmd_run(projects, project_list.as_deref(), &output, &config)
        }
        Commands::Hash { address } => {
            println!("{}", address_hash(address.trim()));
            Ok(())
        }
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailscrub::config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailscrub.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Validate inputs, process every project, then write the run.
fn cmd_run(
    mut dirs: Vec<PathBuf>,
    project_list: Option<&Path>,
    output: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    if let Some(list) = project_list {
        dirs.extend(read_project_list(list)?);
    }
    if dirs.is_empty() {
        anyhow::bail!("No project directories given (pass DIR arguments or --project-list)");
    }
    if !output.is_dir() {
        anyhow::bail!("Output directory does not exist: {}", output.display());
    }
    for dir in &dirs {
        if !dir.is_dir() {
            anyhow::bail!("Project directory does not exist: {}", dir.display());
        }
    }

    let dictionary = NameDictionary::load(
        config.names.first_names.as_deref(),
        config.names.last_names.as_deref(),
    )?;

    let projects = dirs
        .iter()
        .map(|dir| Project::discover(dir))
        .collect::<Result<Vec<_>, _>>()?;

    let pipeline = Pipeline::new(Arc::new(dictionary), &config.pipeline_options())?;
    let start = Instant::now();

    let mut outputs = Vec::with_capacity(projects.len());
    for project in &projects {
        let pb = ProgressBar::new(project.files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} files")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        pb.set_message(project.name.clone());

        let output = pipeline.process_project(
            project,
            Some(&|done, _total| {
                pb.set_position(done as u64);
            }),
        );
        pb.finish_and_clear();
        outputs.push(output);
    }

    let run_dir = mailscrub::export::write_run(output, &outputs, &config.export_options())?;
    print_summary(&outputs, &run_dir, start.elapsed());
    Ok(())
}

/// Print per-project counts in a human-readable table.
fn print_summary(outputs: &[ProjectOutput], run_dir: &Path, elapsed: std::time::Duration) {
    println!();
    println!(
        "  {:<24} {:>7} {:>8} {:>10} {:>9} {:>8}",
        "Project", "Files", "Records", "Addresses", "Skipped", "Failed"
    );
    println!("  {}", "-".repeat(71));
    for out in outputs {
        let name: String = out.name.chars().take(23).collect();
        println!(
            "  {:<24} {:>7} {:>8} {:>10} {:>9} {:>8}",
            name,
            out.stats.files,
            out.stats.records_emitted,
            out.table.len(),
            out.stats.dropped(DropReason::UnsupportedFormat),
            out.stats.failures(),
        );
    }
    println!();
    println!("  {:<20} {}", "Output", run_dir.display());
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!();
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailscrub", &mut std::io::stdout());
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
