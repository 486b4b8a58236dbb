use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tmonbus_node::{Dispatcher, Node, NodeConfig, NodeStats, SimulatedSource};
use tmonbus_transport::UdpLink;

use crate::cmd::{duration_millis, install_ctrlc_handler, parse_duration, NodeArgs};
use crate::exit::{node_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::OutputFormat;

const DEFAULT_SERVE_BIND: &str = "0.0.0.0:5555";
const DEFAULT_PUSH_BIND: &str = "0.0.0.0:0";
const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_secs(1);

pub fn run(args: NodeArgs, _format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args)?;

    let source = match args.seed {
        Some(seed) => SimulatedSource::seeded(seed, args.invalid_rate),
        None => SimulatedSource::from_entropy(args.invalid_rate),
    }
    .map_err(|err| node_error("invalid simulation settings", err))?;

    let dispatcher = Dispatcher::new(config.address, source)
        .map_err(|err| node_error("invalid node", err))?
        .with_promiscuous(config.promiscuous);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let stats = match config.push_to.as_deref() {
        Some(target) => {
            let interval = config.push_interval().unwrap_or(DEFAULT_PUSH_INTERVAL);
            let bind = args.bind.as_deref().unwrap_or(DEFAULT_PUSH_BIND);
            let link = UdpLink::connect(bind, target)
                .map_err(|err| transport_error("link setup failed", err))?;
            let mut node = Node::new(link, dispatcher);
            node.run_push(&running, interval)
                .map_err(|err| node_error("push failed", err))?
        }
        None => {
            let bind = args.bind.as_deref().unwrap_or(DEFAULT_SERVE_BIND);
            let link =
                UdpLink::bind(bind).map_err(|err| transport_error("bind failed", err))?;
            let mut node = Node::new(link, dispatcher);
            node.run(&running, config.receive_timeout())
                .map_err(|err| node_error("serve failed", err))?
        }
    };

    log_summary(&stats);
    Ok(SUCCESS)
}

/// Merge the optional config file with command-line flags.
fn resolve_config(args: &NodeArgs) -> CliResult<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path).map_err(|err| node_error("config", err))?,
        None => {
            let address = args
                .address
                .ok_or_else(|| CliError::usage("--address is required without --config"))?;
            NodeConfig::new(address)
        }
    };

    if let Some(address) = args.address {
        config.address = address;
    }
    if args.promiscuous {
        config.promiscuous = true;
    }
    if let Some(timeout) = &args.timeout {
        config.receive_timeout_ms = duration_millis(parse_duration(timeout)?);
    }
    if let Some(target) = &args.push_to {
        config.push_to = Some(target.clone());
    }
    if let Some(text) = &args.push_interval {
        config.push_interval_ms = Some(duration_millis(parse_duration(text)?));
    }
    if config.is_push() && config.push_interval_ms.is_none() {
        config.push_interval_ms = Some(duration_millis(DEFAULT_PUSH_INTERVAL));
    }

    config
        .validate()
        .map_err(|err| node_error("invalid node configuration", err))?;
    Ok(config)
}

fn log_summary(stats: &NodeStats) {
    tracing::info!(
        received = stats.received,
        replied = stats.replied,
        ignored = stats.ignored,
        "node finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(address: Option<u8>) -> NodeArgs {
        NodeArgs {
            bind: None,
            address,
            config: None,
            promiscuous: false,
            invalid_rate: 0.1,
            seed: None,
            push_to: None,
            push_interval: None,
            timeout: None,
        }
    }

    #[test]
    fn address_flag_alone_is_enough() {
        let config = resolve_config(&args(Some(3))).unwrap();
        assert_eq!(config, NodeConfig::new(3));
    }

    #[test]
    fn missing_address_is_usage_error() {
        let err = resolve_config(&args(None)).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }

    #[test]
    fn reserved_address_is_usage_error() {
        let err = resolve_config(&args(Some(0))).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }

    #[test]
    fn push_defaults_to_one_second() {
        let mut a = args(Some(3));
        a.push_to = Some("127.0.0.1:5555".to_string());
        let config = resolve_config(&a).unwrap();
        assert_eq!(config.push_interval(), Some(Duration::from_secs(1)));

        a.push_interval = Some("250ms".to_string());
        let config = resolve_config(&a).unwrap();
        assert_eq!(config.push_interval(), Some(Duration::from_millis(250)));
    }

    fn write_config(name: &str, json: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tmonbus-cli-{name}-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn push_target_from_config_selects_push_mode() {
        let path = write_config(
            "node-push",
            r#"{ "address": 3, "push_to": "127.0.0.1:5555", "push_interval_ms": 500 }"#,
        );
        let mut a = args(None);
        a.config = Some(path.clone());
        let config = resolve_config(&a).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(config.is_push());
        assert_eq!(config.push_to.as_deref(), Some("127.0.0.1:5555"));
        assert_eq!(config.push_interval(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn push_interval_without_target_is_usage_error() {
        let path = write_config("node-interval", r#"{ "address": 3, "push_interval_ms": 1000 }"#);
        let mut a = args(None);
        a.config = Some(path.clone());
        let err = resolve_config(&a).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.code, crate::exit::USAGE);

        let mut a = args(Some(3));
        a.push_interval = Some("1s".to_string());
        assert_eq!(resolve_config(&a).unwrap_err().code, crate::exit::USAGE);
    }

    #[test]
    fn flags_override_config_file() {
        let path = write_config("node", r#"{ "address": 5, "receive_timeout_ms": 80 }"#);

        let mut a = args(Some(9));
        a.config = Some(path.clone());
        a.promiscuous = true;
        let config = resolve_config(&a).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.address, 9);
        assert!(config.promiscuous);
        assert_eq!(config.receive_timeout(), Duration::from_millis(80));
    }
}
