use crate::ExchangeKind;

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Venue
    pub exchange_kind: ExchangeKind,
    pub leverage: f64,

    // Account
    pub starting_balance: f64,
    pub fee_rate: f64,

    // Strategy config file path
    pub strategy_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let exchange_kind = match required_env("EXCHANGE_KIND").to_lowercase().as_str() {
            "spot" => ExchangeKind::Spot,
            "futures" => ExchangeKind::Futures,
            other => panic!("ERROR: EXCHANGE_KIND must be 'spot' or 'futures', got: '{other}'"),
        };

        Config {
            exchange_kind,
            leverage: optional_env("LEVERAGE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1.0),
            starting_balance: optional_env("STARTING_BALANCE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000.0),
            fee_rate: optional_env("FEE_RATE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.001),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategies.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
