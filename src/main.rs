//! Multicast mode selector CLI
//!
//! Loads the delivery tunables, applies command line overrides, replays a
//! sequence of group registrations and prints the resulting state.

use gcr_multicast::{
    config::ConfigManager, DeliveryConfig, GroupAddress, ModeSelector, MulticastError,
    MulticastModeKind, Result, StationAddress,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

fn main() {
    let matches = build_cli().get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or(DEFAULT_LOG_LEVEL);
    if let Err(e) = init_logging(log_level) {
        eprintln!("{}", e);
        process::exit(2);
    }

    if let Err(e) = run(&matches) {
        error!("{}", e);
        process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("gcr-multicast")
        .version(env!("CARGO_PKG_VERSION"))
        .about("IEEE 802.11aa multicast group registry and delivery mode selector")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (json, toml or yaml)")
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value(DEFAULT_LOG_LEVEL)
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("Delivery mode: 0-4 or legacy, dms, gcr-ur, gcr-iback, gcr-dback")
        )
        .arg(
            Arg::new("retries")
                .short('r')
                .long("retries")
                .value_name("N")
                .help("Number of retries")
                .value_parser(clap::value_parser!(i16))
        )
        .arg(
            Arg::new("retry")
                .long("retry")
                .value_name("I")
                .help("Index of the retry in progress")
                .value_parser(clap::value_parser!(i16))
        )
        .arg(
            Arg::new("register")
                .long("register")
                .value_name("GROUP=STATION")
                .help("Register a station in a group (repeatable)")
                .action(ArgAction::Append)
        )
        .arg(
            Arg::new("deregister")
                .long("deregister")
                .value_name("GROUP=STATION")
                .help("Remove a station from a group (repeatable, applied after registrations)")
                .action(ArgAction::Append)
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the state as JSON")
                .action(ArgAction::SetTrue)
        )
}

/// Initialize logging system
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| MulticastError::Config(format!("Invalid log level '{}': {}", level, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn run(matches: &ArgMatches) -> Result<()> {
    let manager = match matches.get_one::<String>("config") {
        Some(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from: {}", path.display());
            ConfigManager::load_from_file(&path)?
        }
        None => ConfigManager::new(),
    };

    let delivery = apply_overrides(manager.get_config().delivery, matches)?;
    let mut selector = ModeSelector::with_config(&delivery)?;

    for entry in matches.get_many::<String>("register").into_iter().flatten() {
        let (group, station) = parse_membership(entry)?;
        selector.register(group, station);
    }
    for entry in matches.get_many::<String>("deregister").into_iter().flatten() {
        let (group, station) = parse_membership(entry)?;
        if !selector.deregister(group, station) {
            warn!("{} was not registered in {}", station, group);
        }
    }

    let report = Report::from_selector(&selector);
    if matches.get_flag("json") {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| MulticastError::Config(format!("Failed to serialize state: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", report);
    }

    Ok(())
}

/// Apply `--mode`, `--retries` and `--retry` on top of the loaded tunables.
///
/// The result is validated as a whole, so lowering retries together with
/// the retry index works regardless of the values in the file.
fn apply_overrides(mut delivery: DeliveryConfig, matches: &ArgMatches) -> Result<DeliveryConfig> {
    if let Some(mode) = matches.get_one::<String>("mode") {
        delivery.mode = mode.parse::<MulticastModeKind>()?.value();
    }
    if let Some(retries) = matches.get_one::<i16>("retries") {
        delivery.retries = *retries;
    }
    if let Some(retry) = matches.get_one::<i16>("retry") {
        delivery.retry = *retry;
    }
    Ok(delivery)
}

/// Parse a `GROUP=STATION` pair
fn parse_membership(entry: &str) -> Result<(GroupAddress, StationAddress)> {
    let (group, station) = entry
        .split_once('=')
        .ok_or_else(|| MulticastError::InvalidAddress(format!("expected GROUP=STATION, got '{}'", entry)))?;
    Ok((group.trim().parse()?, station.trim().parse()?))
}

#[derive(Debug, Serialize)]
struct Report {
    mode: String,
    retries: i16,
    retry: i16,
    groups: Vec<GroupReport>,
}

#[derive(Debug, Serialize)]
struct GroupReport {
    group: GroupAddress,
    members: Vec<StationAddress>,
}

impl Report {
    fn from_selector(selector: &ModeSelector) -> Self {
        let mut groups: Vec<GroupReport> = selector
            .registry()
            .groups()
            .map(|group| GroupReport {
                group: group.group_address(),
                members: group.members().to_vec(),
            })
            .collect();
        groups.sort_by_key(|report| report.group);

        Self {
            mode: selector.mode_kind().to_string(),
            retries: selector.retries(),
            retry: selector.retry(),
            groups,
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "mode: {}", self.mode)?;
        writeln!(f, "retries: {}", self.retries)?;
        writeln!(f, "retry: {}", self.retry)?;
        for group in &self.groups {
            let members: Vec<String> = group.members.iter().map(|m| m.to_string()).collect();
            writeln!(f, "group {}: {}", group.group, members.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcr_multicast::MacAddress;

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_parse_membership() {
        let (group, station) = parse_membership("01:00:5e:00:00:01=02:00:00:00:00:0a").unwrap();
        assert_eq!(group, MacAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]));
        assert_eq!(station, MacAddress([0x02, 0, 0, 0, 0, 0x0a]));

        assert!(parse_membership("01:00:5e:00:00:01").is_err());
        assert!(parse_membership("01:00:5e:00:00:01=nope").is_err());
    }

    #[test]
    fn test_run_with_overrides() {
        let matches = build_cli().get_matches_from([
            "gcr-multicast",
            "--mode",
            "gcr-ur",
            "--retries",
            "5",
            "--retry",
            "3",
            "--register",
            "01:00:5e:00:00:01=02:00:00:00:00:0a",
            "--deregister",
            "01:00:5e:00:00:01=02:00:00:00:00:0b",
        ]);
        run(&matches).unwrap();
    }

    #[test]
    fn test_overrides_lower_retries_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multicast.toml");
        std::fs::write(&path, "[delivery]\nmode = 2\nretries = 5\nretry = 3\n").unwrap();
        let path = path.to_str().unwrap();

        let matches = build_cli().get_matches_from([
            "gcr-multicast", "-c", path, "--retries", "2", "--retry", "0",
        ]);
        run(&matches).unwrap();

        let manager = ConfigManager::load_from_file(path).unwrap();
        let delivery = apply_overrides(manager.get_config().delivery, &matches).unwrap();
        assert_eq!(delivery, DeliveryConfig { mode: 2, retries: 2, retry: 0 });
    }

    #[test]
    fn test_overrides_validated_together() {
        let matches = build_cli().get_matches_from(["gcr-multicast", "--retries", "1", "--retry", "2"]);
        assert!(matches!(run(&matches), Err(MulticastError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_run_rejects_bad_mode() {
        let matches = build_cli().get_matches_from(["gcr-multicast", "--mode", "9"]);
        assert!(matches!(run(&matches), Err(MulticastError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_report_display() {
        let mut selector = ModeSelector::new();
        let group = MacAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]);
        selector.register(group, MacAddress([0x02, 0, 0, 0, 0, 0x0a]));
        selector.register(group, MacAddress([0x02, 0, 0, 0, 0, 0x0b]));

        let text = Report::from_selector(&selector).to_string();
        assert!(text.contains("mode: legacy"));
        assert!(text.contains("group 01:00:5e:00:00:01: 02:00:00:00:00:0a, 02:00:00:00:00:0b"));
    }
}
