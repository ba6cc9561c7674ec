#![allow(clippy::needless_pass_by_value)] // clap hands over owned values

//! nbclean CLI - notebook sanitizing for tutorial repositories
//!
//! `clean` normalizes notebooks in place before they are committed;
//! `coursework` builds the student copy of a tutorial directory with the
//! solutions removed.

mod config;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use config::{Config, CONFIG_FILE};
use nbclean::peek::{DEFAULT_COLUMNS, DEFAULT_LINES};
use nbclean::{
    build_coursework, normalize_files, CourseworkOptions, NormalizeOptions, NormalizeOutcome,
};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Check if output should be shown (not quiet)
    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Check if verbose output is requested
    const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Default `env_logger` filter when `RUST_LOG` is unset
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "nbclean",
    about = "Sanitize Jupyter notebooks for tutorial repositories",
    long_about = "Sanitize Jupyter notebooks for tutorial repositories.\n\
                  \n\
                  `clean` strips outputs, execution counts and editor metadata before commit.\n\
                  `coursework` builds a student copy with solution cells emptied.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize notebooks in place before committing them
    #[command(long_about = "Normalize notebooks in place before committing them.\n\
                      \n\
                      Resets the kernel display name, drops the language version, clears\n\
                      outputs and execution counts, and removes every cell metadata key\n\
                      except the solution marker. Clean notebooks are left untouched.")]
    Clean {
        /// Notebook paths
        #[arg(required = true, value_name = "NB")]
        inputs: Vec<PathBuf>,

        /// Only report notebooks that need cleaning; exit 1 if any do
        #[arg(long)]
        check: bool,

        /// Process notebooks in parallel
        #[arg(long)]
        parallel: bool,

        /// Kernel display name to enforce
        #[arg(long, value_name = "NAME")]
        display_name: Option<String>,

        /// Spaces per indentation level in rewritten notebooks
        #[arg(long, value_name = "N")]
        indent: Option<usize>,

        /// Cell metadata key that marks solutions (kept by clean)
        #[arg(long, value_name = "KEY")]
        marker: Option<String>,
    },

    /// Build the coursework directory with solutions removed
    Coursework {
        /// Directory holding the tutorial notebooks
        #[arg(long, default_value = ".", value_name = "DIR")]
        root: PathBuf,

        /// Output directory (deleted and recreated), relative to the root
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Data directory copied verbatim, relative to the root
        #[arg(long, value_name = "DIR")]
        data: Option<PathBuf>,

        /// Strip notebooks in parallel
        #[arg(long)]
        parallel: bool,

        /// Cell metadata key that marks solutions
        #[arg(long, value_name = "KEY")]
        marker: Option<String>,
    },

    /// Show the first lines of a data file
    Peek {
        /// File to show
        file: PathBuf,

        /// Number of lines
        #[arg(short = 'n', long, default_value_t = DEFAULT_LINES)]
        lines: usize,

        /// Maximum columns per line
        #[arg(short = 'w', long, default_value_t = DEFAULT_COLUMNS)]
        columns: usize,
    },

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show the merged configuration
    Show,

    /// Show the configuration file paths and whether they exist
    Path,

    /// Write a configuration file with every default spelled out
    Init {
        /// Write ~/.nbclean.toml instead of ./.nbclean.toml
        #[arg(long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.log_filter()),
    )
    .target(env_logger::Target::Stderr)
    .init();

    // Load configuration files
    let (user_config, project_config) = Config::discover_configs();
    let config = Config::merge(user_config, project_config);

    match args.command {
        Commands::Clean {
            inputs,
            check,
            parallel,
            display_name,
            indent,
            marker,
        } => {
            let defaults = NormalizeOptions::default();
            let clean = config.clean.unwrap_or_default();
            let options = NormalizeOptions {
                display_name: display_name
                    .or(clean.display_name)
                    .unwrap_or(defaults.display_name),
                marker: marker.or(config.marker).unwrap_or(defaults.marker),
                indent: indent.or(clean.indent).unwrap_or(defaults.indent),
                check_only: check,
            };
            let parallel = parallel || clean.parallel.unwrap_or(false);
            log::debug!("clean options: {options:?}, parallel: {parallel}");
            clean_command(&inputs, &options, parallel, verbosity)
        }

        Commands::Coursework {
            root,
            output,
            data,
            parallel,
            marker,
        } => {
            let coursework = config.coursework.unwrap_or_default();
            let mut options = CourseworkOptions::in_dir(&root);
            if let Some(output) = output.or(coursework.output_dir) {
                options.output_dir = root.join(output);
            }
            if let Some(data) = data.or(coursework.data_dir) {
                options.data_dir = root.join(data);
            }
            if let Some(marker) = marker.or(config.marker) {
                options.marker = marker;
            }
            options.parallel = parallel || coursework.parallel.unwrap_or(false);
            log::debug!("coursework options: {options:?}");
            coursework_command(&options, verbosity)
        }

        Commands::Peek {
            file,
            lines,
            columns,
        } => {
            let stdout = io::stdout();
            nbclean::peek::peek(&file, lines, columns, &mut stdout.lock())?;
            Ok(())
        }

        Commands::Config { action } => config_command(action, &config, verbosity),

        Commands::Completion { shell } => {
            let mut cmd = Args::command();
            generate(shell, &mut cmd, "nbclean", &mut io::stdout());
            Ok(())
        }
    }
}

fn clean_command(
    inputs: &[PathBuf],
    options: &NormalizeOptions,
    parallel: bool,
    verbosity: Verbosity,
) -> Result<()> {
    let report = normalize_files(inputs, options, parallel);

    for file in &report.files {
        match &file.result {
            Ok(NormalizeOutcome::Unchanged) => {
                if verbosity.is_verbose() {
                    eprintln!("{} {}", "clean".bright_black(), file.path.display());
                }
            }
            Ok(NormalizeOutcome::Rewritten) => {
                if verbosity.should_show_output() {
                    eprintln!("{} {}", "✓".green().bold(), file.path.display());
                }
            }
            Ok(NormalizeOutcome::WouldRewrite) => {
                if verbosity.should_show_output() {
                    eprintln!("{} {}", "would clean".yellow().bold(), file.path.display());
                }
            }
            Err(e) => {
                eprintln!(
                    "{} {} ({}) - {}",
                    "✗".red().bold(),
                    file.path.display().to_string().bright_white(),
                    e.kind(),
                    e.to_string().red()
                );
            }
        }
    }

    if verbosity.is_verbose() {
        eprintln!("\n{}", "=== Clean Summary ===".bold());
        eprintln!("{:<16} {}", "Total files:", report.files.len().to_string().cyan());
        eprintln!(
            "{:<16} {}",
            "Rewritten:",
            report.count(NormalizeOutcome::Rewritten).to_string().green()
        );
        eprintln!(
            "{:<16} {}",
            "Unchanged:",
            report.count(NormalizeOutcome::Unchanged)
        );
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} notebooks failed", report.files.len());
    }
    let pending = report.count(NormalizeOutcome::WouldRewrite);
    if pending > 0 {
        anyhow::bail!("{pending} notebooks need cleaning");
    }
    Ok(())
}

fn coursework_command(options: &CourseworkOptions, verbosity: Verbosity) -> Result<()> {
    if verbosity.should_show_output() {
        eprintln!(
            "{} Creating coursework dir {} ...",
            "Info:".blue().bold(),
            options.output_dir.display()
        );
    }

    let report = build_coursework(options).with_context(|| {
        format!(
            "Failed to prepare coursework directory {}",
            options.output_dir.display()
        )
    })?;

    if verbosity.is_verbose() {
        eprintln!(
            "{} Copied {} data files",
            "Info:".blue().bold(),
            report.data_files.to_string().cyan()
        );
    }

    for entry in &report.notebooks {
        match &entry.result {
            Ok(stripped) => {
                if verbosity.should_show_output() {
                    println!("{} -> {}", entry.input.display(), entry.output.display());
                }
                if verbosity.is_verbose() {
                    eprintln!(
                        "  {} solution cells cleared of {}",
                        stripped.solutions, stripped.cells
                    );
                }
            }
            Err(e) => {
                eprintln!(
                    "{} {} ({}) - {}",
                    "✗".red().bold(),
                    entry.input.display().to_string().bright_white(),
                    e.kind(),
                    e.to_string().red()
                );
            }
        }
    }

    if !report.is_success() {
        let failed = report
            .notebooks
            .iter()
            .filter(|entry| entry.result.is_err())
            .count();
        anyhow::bail!("{failed} of {} notebooks failed", report.notebooks.len());
    }
    Ok(())
}

fn config_command(action: ConfigAction, config: &Config, verbosity: Verbosity) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            if text.trim().is_empty() {
                if verbosity.should_show_output() {
                    eprintln!(
                        "{} No configuration found, built-in defaults apply",
                        "Info:".blue().bold()
                    );
                }
            } else {
                print!("{text}");
            }
            Ok(())
        }

        ConfigAction::Path => {
            let mut paths = vec![("project", Config::project_config_path())];
            if let Some(user) = Config::user_config_path() {
                paths.push(("user", user));
            }
            for (scope, path) in paths {
                let status = if path.exists() {
                    "exists".green()
                } else {
                    "missing".bright_black()
                };
                println!("{scope:<8} {} ({status})", path.display());
            }
            Ok(())
        }

        ConfigAction::Init { global, force } => {
            let path = if global {
                Config::user_config_path().context("Could not determine home directory")?
            } else {
                PathBuf::from(CONFIG_FILE)
            };

            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }

            let text = toml::to_string_pretty(&Config::template())
                .context("Failed to serialize config")?;
            fs::write(&path, text)
                .with_context(|| format!("Failed to write config file: {}", path.display()))?;

            if verbosity.should_show_output() {
                eprintln!("{} Wrote {}", "✓".green().bold(), path.display());
            }
            Ok(())
        }
    }
}
