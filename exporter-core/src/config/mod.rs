pub mod constants;
pub mod types;

pub use types::*;

use crate::core::ConfigError;

impl FeedConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}', expected ws or wss", url.scheme()),
            });
        }

        if self.market.base_currency.is_empty() {
            return Err(ConfigError::EmptyLabel("base_currency"));
        }
        if self.market.quote_currency.is_empty() {
            return Err(ConfigError::EmptyLabel("quote_currency"));
        }
        if self.market.exchange_name.is_empty() {
            return Err(ConfigError::EmptyLabel("exchange_name"));
        }

        if self.ping_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("ping_interval"));
        }
        if self.ping_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("ping_timeout"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("connect_timeout"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bitcointrade_preset() {
        let config = FeedConfig::bitcointrade();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.ping_timeout, Duration::from_secs(5));
        assert_eq!(config.retry_delay, Duration::from_secs(3));
        assert_eq!(config.name(), "bitcointrade");
        assert_eq!(config.market.base_currency, "BTC");
        assert_eq!(config.market.quote_currency, "BRL");
    }

    #[test]
    fn test_config_validation() {
        let mut config = FeedConfig::bitcointrade();

        // Invalid URL
        config.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));

        // Wrong scheme
        config.url = "https://example.com/socket.io/".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
        config.url = "ws://127.0.0.1:9000/socket.io/?EIO=3&transport=websocket".to_string();
        assert!(config.validate().is_ok());

        // Empty label
        config.market.exchange_name.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyLabel("exchange_name")));
        config.market.exchange_name = "bitcointrade".to_string();

        // Zero keep-alive
        config.ping_timeout = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration("ping_timeout")));
    }

    #[test]
    fn test_zero_retry_delay_allowed() {
        let mut config = FeedConfig::bitcointrade();
        config.retry_delay = Duration::ZERO;
        assert!(config.validate().is_ok());
    }
}
