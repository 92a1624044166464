mod interactive;
mod logging;
mod report;
mod steps;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use interactive::{print_reply, run_session, Prompt};
use namnbyte_core::{
    app_paths, load_config, parse_date, save_config, scan, AppConfig, Command, Delta, ExifProbe,
    FileFilter, FilterSpec, FsCommitter, Journal, Orchestrator, OutputFormat, Pipeline,
    RunOptions, ScanOptions, Session, StateStore, TransformOptions,
};
use report::{print_diagnostics, print_operations, print_report};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use steps::parse_steps;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(name = "namnbyte", version)]
#[command(about = "Batch-rename files with an ordered list of transformations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rename files under TARGET. Steps follow `--`, e.g.
    /// `namnbyte rename ./pics -- --case snake --replace IMG photo`
    Rename(RenameArgs),
    /// Revert the last applied rename batch.
    Undo,
    /// List the available operations.
    Ops,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the default config file.
    Init {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// File or directory to rename.
    target: PathBuf,
    #[arg(short = 'R', long)]
    recursive: bool,
    #[arg(long)]
    include_hidden: bool,
    /// Show what would change without touching any file.
    #[arg(long)]
    preview: bool,
    /// Log every rename.
    #[arg(long)]
    verbose: bool,
    /// Ask before each rename.
    #[arg(long)]
    confirm: bool,
    /// Stage transforms at a prompt and apply them on demand.
    #[arg(short, long)]
    interactive: bool,
    /// Transform the whole name including the extension.
    #[arg(long)]
    ignore_extension: bool,
    /// Keep runs of capitals such as `HTML` when splitting words.
    #[arg(long)]
    preserve_caps: bool,
    #[arg(long)]
    output: Option<OutputFormat>,
    /// Only files with this extension (repeatable).
    #[arg(long = "ext")]
    extensions: Vec<String>,
    /// Only names matching this regex.
    #[arg(long = "match")]
    pattern: Option<String>,
    #[arg(long)]
    starts_with: Option<String>,
    /// Minimum size in bytes.
    #[arg(long)]
    min_size: Option<u64>,
    /// Maximum size in bytes.
    #[arg(long)]
    max_size: Option<u64>,
    /// Modified on or after this date (YYYY-MM-DD).
    #[arg(long)]
    after: Option<String>,
    /// Modified on or before this date (YYYY-MM-DD).
    #[arg(long)]
    before: Option<String>,
    /// Ordered steps, each opened by `--name`.
    #[arg(last = true, allow_hyphen_values = true)]
    steps: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let verbose = matches!(&cli.command, Commands::Rename(args) if args.verbose);
    logging::init_logger(verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Undo => cmd_undo(),
        Commands::Ops => {
            print_operations();
            Ok(())
        }
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init { force } => cmd_config_init(force),
        },
    }
}

fn filter_spec(args: &RenameArgs) -> Result<FilterSpec> {
    let date = |value: &Option<String>| value.as_deref().map(parse_date).transpose();
    Ok(FilterSpec {
        extensions: args.extensions.clone(),
        pattern: args.pattern.clone(),
        prefix: args.starts_with.clone(),
        min_size: args.min_size,
        max_size: args.max_size,
        modified_after: date(&args.after)?,
        modified_before: date(&args.before)?,
    })
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config().unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "using default config");
        AppConfig::default()
    });

    let filter = FileFilter::new(&filter_spec(&args)?)?;
    let options = TransformOptions {
        ignore_extension: args.ignore_extension || config.ignore_extension,
        preserve_caps: args.preserve_caps || config.preserve_caps,
    };
    let steps = parse_steps(&args.steps);
    if steps.is_empty() && !args.interactive {
        bail!("no steps given; add them after `--`, e.g. `-- --case snake`");
    }
    let scan_options = ScanOptions {
        recursive: args.recursive || config.recursive_default,
        include_hidden: args.include_hidden || config.include_hidden_default,
    };
    let scanned = scan(&args.target, scan_options)?;
    info!(
        files = scanned.stats.scanned_files,
        folders = scanned.stats.scanned_folders,
        hidden = scanned.stats.skipped_hidden,
        "scanned target"
    );
    let mut store = StateStore::populate(scanned.root, &scanned.entries);

    let run_options = RunOptions {
        preview: args.preview,
        verbose: args.verbose,
        confirm: args.confirm,
        max_filename_len: config.max_filename_len,
    };
    let format = args.output.unwrap_or(config.output);
    let journal = app_paths()
        .map(|paths| Journal::new(paths.journal_path))
        .map_err(|err| warn!(error = %format!("{err:#}"), "rename journal disabled"))
        .ok();

    let probe = ExifProbe;
    let committer = FsCommitter;
    let mut prompt = Prompt::new(io::stdin().lock());

    if args.interactive {
        let orchestrator =
            Orchestrator::new(Pipeline::default(), filter, &probe, &committer, run_options);
        let mut session = Session::new(store, orchestrator, options, journal);
        session.add_observer(Box::new(|delta: &Delta| debug!(?delta, "store update")));
        if !steps.is_empty() {
            let reply = session.execute(Command::Transform(steps), &mut prompt)?;
            print_reply(&reply, format)?;
        }
        return run_session(&mut session, &mut prompt, format);
    }

    let compiled = Pipeline::compile(&steps, options);
    print_diagnostics(&compiled.diagnostics);
    let orchestrator = Orchestrator::new(compiled.pipeline, filter, &probe, &committer, run_options);
    let report = orchestrator.run_batch(&mut store, &mut prompt);
    if !report.preview {
        if let Some(journal) = &journal {
            journal.record(&report.root, &report.operations)?;
        }
    }
    print_report(&report, format)?;
    if report.files.is_empty() {
        eprintln!("nothing to rename.");
    }
    Ok(())
}

fn cmd_undo() -> Result<()> {
    let paths = app_paths()?;
    let result = Journal::new(paths.journal_path).undo_last()?;
    println!("restored {} file(s), skipped {}", result.restored, result.skipped);
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!(
        "{}",
        toml::to_string_pretty(&config).context("failed to render config")?
    );
    Ok(())
}

fn cmd_config_init(force: bool) -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() && !force {
        bail!(
            "config file already exists: {} (use --force to replace it)",
            paths.config_path.display()
        );
    }
    save_config(&AppConfig::default())?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn steps_come_after_double_dash() {
        let cli = Cli::try_parse_from([
            "namnbyte",
            "rename",
            "pics",
            "-R",
            "--ext",
            "jpg",
            "--",
            "--case",
            "snake",
            "--replace",
            "IMG",
            "photo",
        ])
        .expect("parse");
        let Commands::Rename(args) = cli.command else {
            panic!("expected rename");
        };
        assert!(args.recursive);
        assert_eq!(args.extensions, vec!["jpg"]);
        let steps = parse_steps(&args.steps);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].args, vec!["IMG", "photo"]);
    }

    #[test]
    fn config_init_takes_force() {
        let cli = Cli::try_parse_from(["namnbyte", "config", "init", "--force"]).expect("parse");
        let Commands::Config(config) = cli.command else {
            panic!("expected config");
        };
        assert!(matches!(config.action, ConfigAction::Init { force: true }));
    }

    #[test]
    fn bad_dates_are_argument_errors() {
        let cli = Cli::try_parse_from(["namnbyte", "rename", ".", "--after", "yesterday"])
            .expect("parse");
        let Commands::Rename(args) = cli.command else {
            panic!("expected rename");
        };
        assert!(filter_spec(&args).is_err());
    }
}
