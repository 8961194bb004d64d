use clap::{Arg, ArgAction, Command};
use colored::Colorize;
use std::process;

use deimos::config::ScanConfig;
use deimos::events::{ConsoleSink, EventSink, FileSink, JsonLinesSink, MultiSink};
use deimos::ScanEngine;

fn build_cli() -> Command {
    Command::new("deimos")
        .version(env!("CARGO_PKG_VERSION"))
        .about("ICMP sweep and TCP SYN port reconnaissance")
        .arg(
            Arg::new("target")
                .help("Target IPv4 address or CIDR block (e.g. 192.168.1.1 or 192.168.1.0/24)")
                .required(true),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .help("Comma-separated TCP ports to probe [default: 22,80,443,3389]"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(clap::value_parser!(u64))
                .help("Per-probe timeout in milliseconds [default: 100]"),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_parser(clap::value_parser!(usize))
                .help("Hosts probed in parallel [default: CPU count]"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a TOML config file (default: ~/.deimos.toml if present)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit events as JSON lines on stdout"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Append events to this log file as well"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase diagnostic verbosity (-v, -vv)"),
        )
}

fn parse_ports(spec: &str) -> Result<Vec<u16>, String> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u16>().map_err(|_| format!("invalid port: {}", s)))
        .collect()
}

fn build_sink(json: bool, output: Option<&String>) -> std::io::Result<Box<dyn EventSink>> {
    let mut sinks: Vec<Box<dyn EventSink>> = Vec::new();

    if json {
        sinks.push(Box::new(JsonLinesSink::new(std::io::stdout())));
    } else {
        sinks.push(Box::new(ConsoleSink::new(true)));
    }

    if let Some(path) = output {
        sinks.push(Box::new(FileSink::open(path)?));
    }

    Ok(if sinks.len() == 1 {
        sinks.remove(0)
    } else {
        Box::new(MultiSink::new(sinks))
    })
}

fn fatal(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "error:".bright_red().bold(), message);
    process::exit(1);
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let default_level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => match ScanConfig::from_toml_file(path) {
            Ok(config) => config,
            Err(e) => fatal(e),
        },
        None => ScanConfig::load_default_config(),
    };

    config.target = matches.get_one::<String>("target").unwrap().clone();

    if let Some(spec) = matches.get_one::<String>("ports") {
        match parse_ports(spec) {
            Ok(ports) if !ports.is_empty() => config.ports = ports,
            Ok(_) => fatal("port list cannot be empty"),
            Err(e) => fatal(e),
        }
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config.timeout = timeout;
    }
    if let Some(&concurrency) = matches.get_one::<usize>("concurrency") {
        config.concurrency = concurrency;
    }

    let json = matches.get_flag("json");
    let sink = match build_sink(json, matches.get_one::<String>("output")) {
        Ok(sink) => sink,
        Err(e) => fatal(format!("cannot open output file: {}", e)),
    };

    if !json {
        println!(
            "{} {}",
            "deimos".bright_red().bold(),
            format!("v{} - scanning {}", env!("CARGO_PKG_VERSION"), config.target).dimmed()
        );
    }

    let engine = ScanEngine::new(config, sink);
    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, stopping scan");
            cancel.cancel();
        }
    });

    match engine.scan().await {
        Ok(summary) => {
            log::info!(
                "scanned {} host(s) in {:.2?}, {} responding",
                summary.hosts_evaluated,
                summary.duration,
                summary.hosts_responding
            );
            if summary.cancelled {
                process::exit(130);
            }
        }
        Err(e) => fatal(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_flags() {
        let matches = build_cli().get_matches_from([
            "deimos",
            "10.0.0.0/24",
            "-p",
            "22,443",
            "--timeout",
            "250",
            "-c",
            "8",
            "--json",
        ]);
        assert_eq!(matches.get_one::<String>("target").unwrap(), "10.0.0.0/24");
        assert_eq!(matches.get_one::<u64>("timeout"), Some(&250));
        assert!(matches.get_flag("json"));
    }

    #[test]
    fn port_list_parsing() {
        assert_eq!(parse_ports("22, 80,443").unwrap(), vec![22, 80, 443]);
        assert!(parse_ports("22,http").is_err());
    }
}
