//! Deckhand CLI entrypoint.
//!
//! This is the main entrypoint for the deckhand command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use deckhand::cli::{Cli, Commands, LogFormat, OutputFormatter};
use deckhand::config::{
    find_config_file, ConfigParser, ConfigValidator, Contributions, DeployConfig, TargetConfig,
};
use deckhand::error::{ConfigError, DeckhandError, Result};
use deckhand::planner::{DeploymentPlan, PlanHasher, Planner};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Contributions file looked up next to the configuration file.
const DEFAULT_CONTRIBUTIONS_FILE: &str = "deckhand.contributions.yaml";

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    let formatter = OutputFormatter::new(cli.output);

    match run(cli, &formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e));
            if e.is_conflict() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Dispatches the selected command.
fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, formatter),
        Commands::Plan { target, detailed } => cmd_plan(
            cli.config.as_ref(),
            cli.contributions.as_ref(),
            target.as_deref(),
            detailed,
            formatter,
        ),
        Commands::Ports { target } => cmd_ports(
            cli.config.as_ref(),
            cli.contributions.as_ref(),
            target.as_deref(),
            formatter,
        ),
    }
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let config = parser_for(&config_file)?.load_with_env(&config_file)?;

    let result = ConfigValidator::new().check(&config);
    write_stdout(&formatter.format_validation(&result, show_warnings))?;

    if let Some(first) = result.errors.first() {
        return Err(ConfigError::validation(first.message.clone(), first.field.clone()).into());
    }

    // Show summary
    eprintln!("\nConfiguration summary:");
    eprintln!("  Application: {}", config.application.name);
    if let Some(namespace) = &config.application.namespace {
        eprintln!("  Namespace: {namespace}");
    }
    eprintln!("  Targets: {}", config.target_names().join(", "));

    Ok(())
}

/// Plan decorators.
fn cmd_plan(
    config_path: Option<&PathBuf>,
    contributions_path: Option<&PathBuf>,
    target: Option<&str>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, contributions) = load_input(config_path, contributions_path)?;
    let planner = Planner::new(&config, &contributions);

    let plan = match target {
        Some(name) => {
            let target_plan = planner.plan_target(find_target(&config, name)?)?;
            let fingerprint = PlanHasher::new().hash_targets(std::slice::from_ref(&target_plan))?;
            DeploymentPlan {
                application: config.application.name.clone(),
                fingerprint,
                targets: vec![target_plan],
            }
        }
        None => planner.plan()?,
    };

    write_stdout(&formatter.format_plan(&plan, detailed))?;
    Ok(())
}

/// Show resolved ports.
fn cmd_ports(
    config_path: Option<&PathBuf>,
    contributions_path: Option<&PathBuf>,
    target: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, contributions) = load_input(config_path, contributions_path)?;
    let planner = Planner::new(&config, &contributions);

    let targets: Vec<&TargetConfig> = match target {
        Some(name) => vec![find_target(&config, name)?],
        None => config.targets.iter().collect(),
    };

    let ports = targets
        .into_iter()
        .map(|t| Ok((t.name.to_string(), planner.resolve_ports(t)?)))
        .collect::<Result<Vec<_>>>()?;

    write_stdout(&formatter.format_ports(&ports))?;
    Ok(())
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser rooted next to the configuration file, loading `.env`.
fn parser_for(config_file: &Path) -> Result<ConfigParser> {
    let parser = ConfigParser::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| Path::new(".")),
    );
    parser.load_dotenv()?;
    Ok(parser)
}

/// Loads and validates configuration, then loads contributed facts.
fn load_input(
    config_path: Option<&PathBuf>,
    contributions_path: Option<&PathBuf>,
) -> Result<(DeployConfig, Contributions)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = parser_for(&config_file)?;
    let config = parser.load_with_env(&config_file)?;

    // Validate
    let validator = ConfigValidator::new();
    validator.validate(&config)?;

    let contributions = match contributions_path {
        Some(path) => parser.load_contributions(path)?,
        None => {
            let default_path = config_file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_CONTRIBUTIONS_FILE);
            if default_path.exists() {
                parser.load_contributions(&default_path)?
            } else {
                debug!("No contributions file, planning from configuration only");
                Contributions::default()
            }
        }
    };

    Ok((config, contributions))
}

/// Finds a configured target by name.
fn find_target<'a>(config: &'a DeployConfig, name: &str) -> Result<&'a TargetConfig> {
    config.find_target(name).ok_or_else(|| {
        DeckhandError::Config(ConfigError::validation(
            format!(
                "Unknown target '{name}', configured targets: {}",
                config.target_names().join(", ")
            ),
            "targets",
        ))
    })
}

/// Writes command output to stdout.
fn write_stdout(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    stdout.flush()?;
    Ok(())
}
