//! `waypoint` binary

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use waypoint_cli::{run_simulation, stage_table, stages, SimulationOptions};
use waypoint_core::WaypointConfig;

fn init_logging(json: bool) {
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

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new("waypoint")
        .version(waypoint_core::VERSION)
        .about("Waypoint journey orchestration")
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a scripted journey against in-memory services")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("email")
                        .long("email")
                        .default_value("learner@example.com")
                        .help("User identity"),
                )
                .arg(
                    Arg::new("goal")
                        .long("goal")
                        .default_value("Data Engineer")
                        .help("Career goal"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("stages")
                .about("Print the journey stage table")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate a configuration file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                ),
        );

    let matches = cli.get_matches();
    init_logging(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let config = match args.get_one::<PathBuf>("config") {
                Some(path) => WaypointConfig::load(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => WaypointConfig::default(),
            };
            let options = SimulationOptions {
                config,
                email: args.get_one::<String>("email").cloned().unwrap_or_default(),
                goal: args.get_one::<String>("goal").cloned().unwrap_or_default(),
            };

            let report = run_simulation(options).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.to_text());
            }
        }
        Some(("stages", args)) => {
            let rows = stage_table();
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", stages::render(&rows));
            }
        }
        Some(("check-config", args)) => {
            let path = args
                .get_one::<PathBuf>("file")
                .context("missing config file argument")?;
            let config = WaypointConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
            println!("{} is valid", path.display());
            println!("{}", config_summary(&config));
        }
        _ => {}
    }
    Ok(())
}

fn config_summary(config: &WaypointConfig) -> String {
    format!(
        "generation timeout {}ms, store timeout {}ms, {} questions per assessment, pass at {}%",
        config.generation_timeout_ms,
        config.store_timeout_ms,
        config.assessment_question_count,
        config.pass_threshold
    )
}
