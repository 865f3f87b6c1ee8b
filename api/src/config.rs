//! Hub configuration.
//!
//! Provides configuration options for the streaming hub, loaded from the
//! environment with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;

/// A tracked instrument and its starting price.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    /// Instrument symbol.
    pub symbol: String,

    /// Price the synthetic feed starts from.
    pub base_price: f64,
}

impl Instrument {
    /// Creates an instrument.
    #[must_use]
    pub fn new(symbol: impl Into<String>, base_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            base_price,
        }
    }
}

/// Returns the default instrument set.
#[must_use]
pub fn default_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("NIFTY", 21_500.0),
        Instrument::new("BANKNIFTY", 45_000.0),
        Instrument::new("FINNIFTY", 19_500.0),
    ]
}

/// Configuration for the streaming hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Pause between tick cycles in milliseconds.
    pub tick_interval_ms: u64,

    /// Pause between P&L pushes in milliseconds.
    pub pnl_interval_ms: u64,

    /// Capacity of each connection's outbound queue.
    pub outbound_buffer: usize,

    /// How long a send may wait on a full outbound queue, in milliseconds.
    pub send_timeout_ms: u64,

    /// Whether a malformed control message ends the session.
    pub strict_control_messages: bool,

    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,

    /// Instruments fed by the tick generator.
    pub instruments: Vec<Instrument>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tick_interval_ms: 1000,
            pnl_interval_ms: 2000,
            outbound_buffer: 100,
            send_timeout_ms: 5000,
            strict_control_messages: true,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
            instruments: default_instruments(),
        }
    }
}

impl HubConfig {
    /// Creates a configuration bound to the given address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through a variable lookup function.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("API_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "API_PORT")? {
            config.port = port;
        }
        if let Some(ms) = parse_var(&lookup, "TICK_INTERVAL_MS")? {
            config.tick_interval_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "PNL_INTERVAL_MS")? {
            config.pnl_interval_ms = ms;
        }
        if let Some(size) = parse_var(&lookup, "WS_OUTBOUND_BUFFER")? {
            config.outbound_buffer = size;
        }
        if let Some(ms) = parse_var(&lookup, "WS_SEND_TIMEOUT_MS")? {
            config.send_timeout_ms = ms;
        }
        if let Some(strict) = parse_var(&lookup, "WS_STRICT_CONTROL")? {
            config.strict_control_messages = strict;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the tick and P&L intervals.
    #[must_use]
    pub fn with_intervals(mut self, tick_ms: u64, pnl_ms: u64) -> Self {
        self.tick_interval_ms = tick_ms;
        self.pnl_interval_ms = pnl_ms;
        self
    }

    /// Sets the outbound queue capacity.
    #[must_use]
    pub fn with_outbound_buffer(mut self, size: usize) -> Self {
        self.outbound_buffer = size;
        self
    }

    /// Sets whether malformed control messages end the session.
    #[must_use]
    pub fn with_strict_control_messages(mut self, strict: bool) -> Self {
        self.strict_control_messages = strict;
        self
    }

    /// Sets the instruments fed by the tick generator.
    #[must_use]
    pub fn with_instruments(mut self, instruments: Vec<Instrument>) -> Self {
        self.instruments = instruments;
        self
    }

    /// Returns the `host:port` bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the tick interval.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Returns the P&L interval.
    #[must_use]
    pub fn pnl_interval(&self) -> Duration {
        Duration::from_millis(self.pnl_interval_ms)
    }

    /// Returns the outbound send timeout.
    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Parses the allowed origins into header values.
    ///
    /// # Errors
    ///
    /// Returns an error if an origin is not a valid header value.
    pub fn origin_headers(&self) -> Result<Vec<HeaderValue>, ConfigError> {
        self.allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin(origin.clone()))
            })
            .collect()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }

        if self.pnl_interval_ms == 0 {
            return Err(ConfigError::InvalidPnlInterval);
        }

        if self.outbound_buffer == 0 {
            return Err(ConfigError::InvalidOutboundBuffer);
        }

        if self.send_timeout_ms == 0 {
            return Err(ConfigError::InvalidSendTimeout);
        }

        if self.instruments.is_empty() {
            return Err(ConfigError::NoInstruments);
        }

        for instrument in &self.instruments {
            if instrument.symbol.trim().is_empty()
                || !instrument.base_price.is_finite()
                || instrument.base_price <= 0.0
            {
                return Err(ConfigError::InvalidInstrument(instrument.symbol.clone()));
            }
        }

        self.origin_headers()?;

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVariable { key, value: raw }),
        None => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidVariable {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Invalid tick interval.
    #[error("tick_interval_ms must be > 0")]
    InvalidTickInterval,

    /// Invalid P&L interval.
    #[error("pnl_interval_ms must be > 0")]
    InvalidPnlInterval,

    /// Invalid outbound buffer.
    #[error("outbound_buffer must be > 0")]
    InvalidOutboundBuffer,

    /// Invalid send timeout.
    #[error("send_timeout_ms must be > 0")]
    InvalidSendTimeout,

    /// No instruments configured.
    #[error("at least one instrument is required")]
    NoInstruments,

    /// Invalid instrument definition.
    #[error("invalid instrument: {0:?}")]
    InvalidInstrument(String),

    /// Invalid CORS origin.
    #[error("invalid allowed origin: {0}")]
    InvalidOrigin(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = HubConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.pnl_interval(), Duration::from_secs(2));
        assert!(config.strict_control_messages);
        assert_eq!(config.instruments.len(), 3);
        tokio_test::assert_ok!(config.validate());
    }

    #[test]
    fn test_config_new() {
        let config = HubConfig::new("127.0.0.1", 9000);
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_config_builder() {
        let config = HubConfig::default()
            .with_intervals(50, 100)
            .with_outbound_buffer(8)
            .with_strict_control_messages(false)
            .with_instruments(vec![Instrument::new("SENSEX", 72_000.0)]);

        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.pnl_interval_ms, 100);
        assert_eq!(config.outbound_buffer, 8);
        assert!(!config.strict_control_messages);
        assert_eq!(config.instruments[0].symbol, "SENSEX");
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = HubConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = HubConfig::from_lookup(lookup(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9001"),
            ("TICK_INTERVAL_MS", "250"),
            ("WS_STRICT_CONTROL", "false"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .expect("config");

        assert_eq!(config.bind_address(), "127.0.0.1:9001");
        assert_eq!(config.tick_interval_ms, 250);
        assert!(!config.strict_control_messages);
        assert_eq!(
            config.allowed_origins,
            ["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_from_lookup_invalid_port() {
        let result = HubConfig::from_lookup(lookup(&[("API_PORT", "not-a-port")]));
        assert_eq!(
            tokio_test::assert_err!(result),
            ConfigError::InvalidVariable {
                key: "API_PORT",
                value: "not-a-port".to_string()
            }
        );
    }

    #[test]
    fn test_from_lookup_rejects_zero_interval() {
        let result = HubConfig::from_lookup(lookup(&[("PNL_INTERVAL_MS", "0")]));
        assert_eq!(result.expect_err("error"), ConfigError::InvalidPnlInterval);
    }

    #[test]
    fn test_validate_invalid_values() {
        let zero_tick = HubConfig::default().with_intervals(0, 2000);
        assert_eq!(zero_tick.validate(), Err(ConfigError::InvalidTickInterval));

        let zero_buffer = HubConfig::default().with_outbound_buffer(0);
        assert_eq!(zero_buffer.validate(), Err(ConfigError::InvalidOutboundBuffer));

        let no_instruments = HubConfig::default().with_instruments(vec![]);
        assert_eq!(no_instruments.validate(), Err(ConfigError::NoInstruments));

        let bad_price = HubConfig::default().with_instruments(vec![Instrument::new("X", -1.0)]);
        assert!(matches!(
            bad_price.validate(),
            Err(ConfigError::InvalidInstrument(_))
        ));
    }

    #[test]
    fn test_validate_invalid_origin() {
        let config = HubConfig {
            allowed_origins: vec!["http://bad\norigin".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOrigin(_))
        ));
    }
}
