//! Configuration for the commitment protocol engine

use std::time::Duration;

/// Tunables for one coordinator instance
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Per-RPC timeout for participant calls
    pub rpc_timeout: Duration,

    /// Maximum delivery attempts for a final verdict, per participant
    pub delivery_attempts: u32,

    /// Pause between verdict delivery attempts
    pub delivery_retry_delay: Duration,

    /// How long the 3PC precommit state stays observable before the
    /// commit decision is made
    pub precommit_observation: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(2),
            delivery_attempts: 3,
            delivery_retry_delay: Duration::from_millis(500),
            precommit_observation: Duration::from_secs(2),
        }
    }
}

/// Builder for CoordinatorConfig
pub struct CoordinatorConfigBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
        }
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.config.rpc_timeout = timeout;
        self
    }

    pub fn delivery_attempts(mut self, attempts: u32) -> Self {
        self.config.delivery_attempts = attempts;
        self
    }

    pub fn delivery_retry_delay(mut self, delay: Duration) -> Self {
        self.config.delivery_retry_delay = delay;
        self
    }

    pub fn precommit_observation(mut self, window: Duration) -> Self {
        self.config.precommit_observation = window;
        self
    }

    pub fn build(self) -> CoordinatorConfig {
        self.config
    }
}

impl Default for CoordinatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.rpc_timeout, Duration::from_secs(2));
        assert_eq!(config.delivery_attempts, 3);
        assert_eq!(config.delivery_retry_delay, Duration::from_millis(500));
        assert_eq!(config.precommit_observation, Duration::from_secs(2));
    }

    #[test]
    fn test_builder() {
        let config = CoordinatorConfigBuilder::new()
            .rpc_timeout(Duration::from_millis(250))
            .delivery_attempts(5)
            .delivery_retry_delay(Duration::from_millis(10))
            .precommit_observation(Duration::from_millis(50))
            .build();

        assert_eq!(config.rpc_timeout, Duration::from_millis(250));
        assert_eq!(config.delivery_attempts, 5);
        assert_eq!(config.delivery_retry_delay, Duration::from_millis(10));
        assert_eq!(config.precommit_observation, Duration::from_millis(50));
    }
}
