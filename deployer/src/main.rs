//! Web server deployer CLI

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{error, warn};
use webnode_deployer::aws;

/// Returns the version of the crate.
pub const fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Flag for verbose output
const VERBOSE_FLAG: &str = "verbose";

/// Entrypoint for the deployer CLI
#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Define application
    let matches = Command::new("deployer")
        .version(crate_version())
        .about("Provision a single EC2 web server from a bootstrap script.")
        .arg(
            Arg::new(VERBOSE_FLAG)
                .short('v')
                .long(VERBOSE_FLAG)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new(aws::CREATE_CMD)
                .about("Launch an EC2 instance, open its ports, and wait for the web server to start.")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .required(true)
                        .help("Path to YAML config file")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new(aws::TEMPLATE_CMD)
                .about("Print the default bootstrap script passed to the instance as user data."),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag(VERBOSE_FLAG) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Parse subcommands
    match matches.subcommand() {
        Some((aws::CREATE_CMD, matches)) => {
            let config_path = matches.get_one::<PathBuf>("config").unwrap();
            let create = aws::create(config_path);
            match aws::until_interrupted(create, tokio::signal::ctrl_c()).await {
                Some(Ok(_)) => return std::process::ExitCode::SUCCESS,
                Some(Err(e)) => error!(error = %e, "failed to create deployment"),
                None => warn!("interrupted, resources created so far are left in place"),
            }
        }
        Some((aws::TEMPLATE_CMD, _)) => {
            print!("{}", aws::services::BOOTSTRAP_SCRIPT);
            return std::process::ExitCode::SUCCESS;
        }
        Some((cmd, _)) => {
            error!(cmd, "invalid subcommand");
        }
        None => {
            error!("no subcommand provided");
        }
    }
    std::process::ExitCode::FAILURE
}
