use sha2::{Digest, Sha256};

use crate::config::Config;
use vela_domain::services::engine::backtest::StrategyParams;

pub fn summary_meta_json(config: &Config) -> serde_json::Value {
    serde_json::json!({
        "run_id": config.run.run_id,
        "symbol": config.run.symbol,
        "timeframe": config.run.timeframe,
        "start": config.run.start,
        "end": config.run.end,
    })
}

/// Effective run configuration embedded into summary.json, plus a digest of
/// the raw config file so a summary can be matched back to the exact input.
pub fn config_snapshot_json(
    config: &Config,
    effective_strategy: &StrategyParams,
    config_toml: &str,
) -> serde_json::Value {
    serde_json::json!({
        "initial_equity": config.run.initial_equity,
        "data_path": config.paths.data_path,
        "strategy": effective_strategy,
        "config_sha256": sha256_hex(config_toml.as_bytes()),
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn snapshot_carries_effective_strategy() {
        let config: Config = toml::from_str(
            r#"
[run]
run_id = "r1"
symbol = "EURUSD"
timeframe = "15m"
start = "2024-01-02T00:00:00Z"
end = "2024-01-03T00:00:00Z"
initial_equity = 100000.0

[paths]
data_path = "data/eurusd.csv"
out_dir = "runs/"
"#,
        )
        .unwrap();
        let mut params = StrategyParams::default();
        params.rsi_period = 7;
        let snapshot = config_snapshot_json(&config, &params, "contents");
        assert_eq!(snapshot["strategy"]["rsi_period"], 7);
        assert_eq!(
            snapshot["config_sha256"],
            sha256_hex(b"contents").as_str()
        );
    }
}
