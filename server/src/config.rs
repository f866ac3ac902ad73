use shared::DEFAULT_PORT;
use std::time::Duration;

/// Seconds between two matchmaking passes.
pub const DEFAULT_MATCHMAKING_SECS: u64 = 5;

/// Standard decks shuffled into a blackjack shoe.
pub const DEFAULT_SHOE_DECKS: usize = 6;

/// Runtime settings of the server, filled from the command line.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub matchmaking_period: Duration,
    pub shoe_decks: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: format!("0.0.0.0:{}", DEFAULT_PORT),
            matchmaking_period: Duration::from_secs(DEFAULT_MATCHMAKING_SECS),
            shoe_decks: DEFAULT_SHOE_DECKS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "0.0.0.0:6000");
        assert_eq!(config.matchmaking_period, Duration::from_secs(5));
        assert_eq!(config.shoe_decks, 6);
    }
}
