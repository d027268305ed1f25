use clap::Parser;

/// Watches one address for transactions that do not touch the configured
/// token pair or a known DEX router.
#[derive(Parser, Debug, Clone)]
#[command(name = "pairwatch")]
#[command(version)]
pub struct Cli {
    /// Address to monitor.
    #[arg(long)]
    pub address: String,

    /// Base token of the pair.
    #[arg(long, default_value = "ETH")]
    pub base_token: String,

    /// Quote token of the pair.
    #[arg(long, default_value = "MPH")]
    pub quote_token: String,

    /// Seconds between polls in continuous mode.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Poll continuously and serve the status endpoint instead of running
    /// a single cycle.
    #[arg(long)]
    pub monitor: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_single_shot_eth_mph() {
        let cli = Cli::try_parse_from(["pairwatch", "--address", "0xabc"]).unwrap();
        assert_eq!(cli.address, "0xabc");
        assert_eq!(cli.base_token, "ETH");
        assert_eq!(cli.quote_token, "MPH");
        assert_eq!(cli.interval, 60);
        assert!(!cli.monitor);
    }

    #[test]
    fn parses_continuous_mode() {
        let cli = Cli::try_parse_from([
            "pairwatch",
            "--address",
            "0xabc",
            "--quote-token",
            "eth",
            "--base-token",
            "mph",
            "--interval",
            "15",
            "--monitor",
        ])
        .unwrap();
        assert_eq!(cli.base_token, "mph");
        assert_eq!(cli.interval, 15);
        assert!(cli.monitor);
    }

    #[test]
    fn address_is_required() {
        assert!(Cli::try_parse_from(["pairwatch"]).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let parsed =
            Cli::try_parse_from(["pairwatch", "--address", "0xabc", "--interval", "0"]);
        assert!(parsed.is_err());
    }
}
