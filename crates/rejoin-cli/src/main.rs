use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rejoin_core::ServiceConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod replay;

fn cli() -> Command {
    Command::new("rejoin")
        .version(rejoin_core::VERSION)
        .about("Restore member roles and nicknames on rejoin")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate a service config file")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("YAML or TOML config file"),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Feed recorded member events through the service")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("YAML or TOML config file"),
                )
                .arg(
                    Arg::new("events")
                        .long("events")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON-lines file of member events"),
                )
                .arg(
                    Arg::new("store")
                        .long("store")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON state file; records are kept in memory when omitted"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print stats as JSON"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn path_arg(args: &ArgMatches, name: &str) -> Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn check_config(args: &ArgMatches) -> Result<()> {
    let path = path_arg(args, "path")?;
    let config = ServiceConfig::load(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let deprecated = std::iter::once(&config.defaults)
        .chain(config.communities.values())
        .filter(|c| c.persist_voice_mutes)
        .count();
    if deprecated > 0 {
        tracing::warn!(entries = deprecated, "persist_voice_mutes is deprecated and ignored");
    }

    println!("Config OK: {}", path.display());
    println!("  Allowed communities: {}", config.allowed_communities.len());
    println!("  Community overrides: {}", config.communities.len());
    println!(
        "  Default roles kept: {}",
        config.defaults.persisted_roles.len()
    );
    for (community, restore) in &config.communities {
        println!(
            "    {community}: roles [{}], nicknames {}",
            restore
                .persisted_roles
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            if restore.persist_nicknames { "on" } else { "off" }
        );
    }
    println!("  Lock timeout: {}ms", config.lock.acquire_timeout_ms);
    println!("  Unmatched records: {:?}", config.unmatched_record);
    Ok(())
}

async fn replay_cmd(args: &ArgMatches) -> Result<()> {
    let config_path = path_arg(args, "config")?;
    let events_path = path_arg(args, "events")?;
    let store_path = args.get_one::<PathBuf>("store");

    let config = ServiceConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let input = tokio::fs::read_to_string(&events_path)
        .await
        .with_context(|| format!("failed to read {}", events_path.display()))?;
    let events = replay::parse_events(&input)?;

    let stats = replay::replay(&config, events, store_path.map(PathBuf::as_path)).await?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Replay Report:");
        println!("  Events: {}", stats.events);
        println!("  Skipped: {}", stats.skipped);
        println!("  Persisted: {}", stats.persisted);
        println!("  Nothing to persist: {}", stats.nothing_to_persist);
        println!("  Restored: {}", stats.restored);
        println!("  No record: {}", stats.no_record);
        println!("  Unmatched: {}", stats.unmatched);
        println!("  Failed: {}", stats.failed);
    }

    if stats.failed > 0 {
        anyhow::bail!("{} event(s) failed", stats.failed);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let result = match matches.subcommand() {
        Some(("check-config", args)) => check_config(args),
        Some(("replay", args)) => replay_cmd(args).await,
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
