use tracing_subscriber::EnvFilter;

use crate::config::{BallotConfig, DEFAULT_LOG_FILTER};

/// Install the global fmt subscriber filtered by `config.log_filter`.
///
/// Returns false if a subscriber was already installed; calling it twice is harmless.
pub fn init_tracing(config: &BallotConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let config = BallotConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
