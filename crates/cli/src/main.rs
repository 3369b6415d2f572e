use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use exfold_core::debug::DebugChannel;
use exfold_core::{
    format_file, format_output, render_file, render_file_ansi, FoldScanner, OutputFormat, Renderer, Router,
    RulesFile, ScanConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mta_rust_explicit_folding")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rule-driven code folding for any language")]
#[command(long_about = "Computes folding ranges from explicit rules instead of a syntax tree. \
    A rules file (JSON, YAML or TOML) declares regions with regular expressions:\n\n\
    - begin/end pairs, optionally with a middle marker\n\
    - end patterns referring to the begin captures (\\1, \\2, ...)\n\
    - continuation lines and while-runs\n\
    - separators splitting a document into sections\n\
    - docstrings and an indentation fallback\n\n\
    perFiles routes let a glob pick its own rule set.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Rules file (.json, .yaml, .yml or .toml)
    #[arg(short, long, global = true)]
    pub rules: Option<PathBuf>,

    /// Trace every dispatched match
    #[arg(long, global = true)]
    pub debug: bool,

    /// Show verbose progress
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fold every file of a project
    Scan {
        /// Project root directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json)]
        format: OutputFormatArg,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Parallel threads (0 = auto)
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Additional ignore patterns (gitignore style)
        #[arg(long, action = clap::ArgAction::Append)]
        ignore: Vec<String>,

        /// Only scan files matching these globs
        #[arg(long, action = clap::ArgAction::Append)]
        include: Vec<String>,

        /// Ignore file path (defaults to .gitignore)
        #[arg(long)]
        ignore_file: Option<PathBuf>,

        /// Include node_modules / .venv / target in scan
        #[arg(long)]
        include_deps: bool,
    },

    /// List the folding ranges of a single file
    File {
        /// File to analyze
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Summary)]
        format: OutputFormatArg,
    },

    /// Render a single file with its ranges collapsed
    Render {
        /// File to render
        file: PathBuf,

        /// Collapse only ranges of autoFold rules
        #[arg(long)]
        auto_fold_only: bool,

        /// Force ANSI colors
        #[arg(long)]
        ansi: bool,

        /// Disable colors even on a terminal
        #[arg(long)]
        no_color: bool,
    },

    /// Compile the rules and report the dropped ones
    Check,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Summary,
    Ansi,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Ansi => OutputFormat::Ansi,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    match &args.command {
        Commands::Scan {
            path,
            format,
            output,
            threads,
            ignore,
            include,
            ignore_file,
            include_deps,
        } => {
            let config = ScanConfig::new(path.clone())
                .with_threads(*threads)
                .with_ignore_patterns(ignore.clone())
                .with_include_patterns(include.clone())
                .with_include_deps(*include_deps);
            let config = match ignore_file {
                Some(ignore_file) => config.with_ignore_file(ignore_file.clone()),
                None => config,
            };
            run_scan(config, format.clone(), output.as_deref(), &args)
        }
        Commands::File { file, format } => run_file(file, format.clone(), &args),
        Commands::Render {
            file,
            auto_fold_only,
            ansi,
            no_color,
        } => run_render(file, *auto_fold_only, *ansi, *no_color, &args),
        Commands::Check => run_check(&args),
    }
}

/// Log to stderr; `RUST_LOG` wins over the flags
fn init_logging(args: &Args) {
    let default = if args.debug {
        "warn,exfold_core=trace"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn load_rules(args: &Args) -> anyhow::Result<RulesFile> {
    let Some(path) = &args.rules else {
        bail!("no rules file given, use --rules <FILE>");
    };

    RulesFile::load(path).with_context(|| format!("cannot load rules from {}", path.display()))
}

fn build_router(args: &Args) -> anyhow::Result<Router> {
    let rules = load_rules(args)?;
    let channel = DebugChannel::default().with_trace(args.debug);
    let router = Router::from_rules_file(&rules, rules.engine_options(channel));
    tracing::debug!(routes = router.engines().count(), "rules loaded");
    Ok(router)
}

fn write_output(output: &str, path: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    if let Some(path) = path {
        fs::write(path, output)?;
        if verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn run_scan(config: ScanConfig, format: OutputFormatArg, output: Option<&Path>, args: &Args) -> anyhow::Result<()> {
    let router = build_router(args)?;

    let spinner = if args.verbose {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Scanning project...");
        Some(pb)
    } else {
        None
    };

    let scanner = FoldScanner::new(config, router)?;
    let result = scanner.scan()?;

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Scanned {} files in {}ms",
            result.stats.total_files, result.metadata.scan_duration_ms
        ));
    }

    let rendered = format_output(&result, format.into())?;
    write_output(&rendered, output, args.verbose)
}

fn run_file(file: &Path, format: OutputFormatArg, args: &Args) -> anyhow::Result<()> {
    let router = build_router(args)?;
    let scanner = FoldScanner::new(ScanConfig::default(), router)?;
    let source_file = scanner.scan_file(file)?;

    let output = format_file(&source_file, format.into())?;
    write_output(&output, None, args.verbose)
}

fn run_render(file: &Path, auto_fold_only: bool, ansi: bool, no_color: bool, args: &Args) -> anyhow::Result<()> {
    let router = build_router(args)?;
    let renderer = Renderer::new().with_auto_fold_only(auto_fold_only);

    let rendered = if ansi || (atty::is(atty::Stream::Stdout) && !no_color) {
        render_file_ansi(file, &router, &renderer)?
    } else {
        render_file(file, &router, &renderer)?
    };

    print!("{}", rendered.content);

    if args.verbose {
        eprintln!(
            "\n--- {} folds applied, {} lines hidden ---",
            rendered.fold_count, rendered.lines_hidden
        );
    }

    Ok(())
}

fn run_check(args: &Args) -> anyhow::Result<()> {
    let router = build_router(args)?;
    let mut failures = 0;

    for (label, engine) in router.engines() {
        let errors = engine.errors();
        println!("{}: {} rules compiled, {} dropped", label, engine.rules().len(), errors.len());
        for error in errors {
            println!("  {}", error);
        }
        if args.verbose {
            if let Some(source) = engine.main_source() {
                println!("  main: {}", source);
            }
        }
        failures += errors.len();
    }

    if failures > 0 {
        bail!("{} rules failed to compile", failures);
    }
    Ok(())
}
