//! Command line
//!
//! Precedence, lowest first: built-in defaults, the `--config` TOML file,
//! environment variables, command-line flags.

use crate::config::{ConfigError, Environment, LogFormat, ServerConfig};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::net::SocketAddr;
use std::path::PathBuf;

/// What the binary was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the HTTP server
    Serve,
    /// Print the effective configuration and exit
    PrintConfig,
}

/// Build the argument parser
#[must_use]
pub fn command() -> Command {
    Command::new("roadmap-server")
        .version(crate::VERSION)
        .about("Credit roadmap generation and report storage service")
        .arg(
            Arg::new("config-file")
                .long("config")
                .short('c')
                .env("ROADMAP_CONFIG")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .env("ROADMAP_BIND")
                .global(true)
                .value_parser(value_parser!(SocketAddr))
                .help("Listen address, e.g. 0.0.0.0:8080"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .env("ROADMAP_DATABASE")
                .global(true)
                .help("SQLite file path, or 'memory' for in-process stores"),
        )
        .arg(
            Arg::new("environment")
                .long("environment")
                .env("ROADMAP_ENV")
                .global(true)
                .value_parser(value_parser!(Environment))
                .help("development exposes error detail; production does not"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .env("ROADMAP_LOG_FORMAT")
                .global(true)
                .value_parser(value_parser!(LogFormat))
                .help("pretty or json"),
        )
        .arg(
            Arg::new("trust-forwarded-for")
                .long("trust-forwarded-for")
                .env("ROADMAP_TRUST_FORWARDED_FOR")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Key quotas on the first X-Forwarded-For hop (only behind a trusted proxy)"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .env("OPENAI_API_KEY")
                .hide_env_values(true)
                .global(true)
                .help("Generator API key"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .env("OPENAI_BASE_URL")
                .global(true)
                .help("Generator API root"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .env("OPENAI_MODEL")
                .global(true)
                .help("Generator model name"),
        )
        .arg(
            Arg::new("generation-timeout")
                .long("generation-timeout")
                .env("ROADMAP_GENERATION_TIMEOUT")
                .global(true)
                .value_parser(value_parser!(u64).range(1..))
                .help("Seconds to wait for one generation"),
        )
        .subcommand(Command::new("serve").about("Run the HTTP server (default)"))
        .subcommand(Command::new("config").about("Print the effective configuration as TOML"))
}

/// Requested action
#[must_use]
pub fn action(matches: &ArgMatches) -> Action {
    match matches.subcommand_name() {
        Some("config") => Action::PrintConfig,
        _ => Action::Serve,
    }
}

/// Merge file, environment and flags into one configuration
///
/// # Errors
/// Returns error if the config file cannot be loaded or the merged result
/// fails validation
pub fn resolve_config(matches: &ArgMatches) -> Result<ServerConfig, ConfigError> {
    // Global args are propagated down, so the innermost matches see everything.
    let args = matches.subcommand().map_or(matches, |(_, sub)| sub);

    let mut config = match args.get_one::<PathBuf>("config-file") {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = args.get_one::<SocketAddr>("bind") {
        config.bind = *bind;
    }
    if let Some(database) = args.get_one::<String>("database") {
        config.database.clone_from(database);
    }
    if let Some(environment) = args.get_one::<Environment>("environment") {
        config.environment = *environment;
    }
    if let Some(format) = args.get_one::<LogFormat>("log-format") {
        config.log.format = *format;
    }
    if args.get_flag("trust-forwarded-for") {
        config.trust_forwarded_for = true;
    }
    if let Some(key) = args.get_one::<String>("api-key") {
        config.generator.api_key = Some(key.clone());
    }
    if let Some(url) = args.get_one::<String>("base-url") {
        config.generator.base_url.clone_from(url);
    }
    if let Some(model) = args.get_one::<String>("model") {
        config.generator.model.clone_from(model);
    }
    if let Some(secs) = args.get_one::<u64>("generation-timeout") {
        config.generator.timeout_secs = *secs;
    }

    config.validate()?;
    Ok(config)
}

/// TOML for `config`, with the API key masked
///
/// # Errors
/// Returns error if serialization fails
pub fn render_config(config: &ServerConfig) -> Result<String, ConfigError> {
    let mut shown = config.clone();
    if shown.generator.api_key.is_some() {
        shown.generator.api_key = Some("<redacted>".to_string());
    }
    shown.to_toml()
}
