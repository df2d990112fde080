//! Silo configuration: the defaults a hosting layer would surface,
//! builder-style.

use std::time::Duration;

use crate::activity::IdleDeactivationConfig;
use crate::mailbox::MailboxConfig;

#[derive(Debug, Clone)]
pub struct SiloConfig {
    pub address: String,
    pub port: u16,
    pub shutdown_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub enable_reminders: bool,
    pub enable_streaming: bool,
    pub idle_deactivation: IdleDeactivationConfig,
    /// Applied to every mailbox this silo builds for a new activation:
    /// capacity plus the optional rate-limit, circuit-breaker and
    /// adaptive-sizing features.
    pub mailbox: MailboxConfig,
    pub router_cache_ttl: Duration,
    /// Bound on the silo-wide dead-letter queue; oldest entries are
    /// evicted first once exceeded.
    pub dead_letter_max_messages: usize,
}

impl Default for SiloConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 11111,
            shutdown_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(5),
            enable_reminders: true,
            enable_streaming: true,
            idle_deactivation: IdleDeactivationConfig::default(),
            mailbox: MailboxConfig::default(),
            router_cache_ttl: Duration::from_secs(5),
            dead_letter_max_messages: 1000,
        }
    }
}

impl SiloConfig {
    pub fn with_address(mut self, address: impl Into<String>, port: u16) -> Self {
        self.address = address.into();
        self.port = port;
        self
    }

    pub fn with_idle_deactivation(mut self, config: IdleDeactivationConfig) -> Self {
        self.idle_deactivation = config;
        self
    }

    pub fn with_mailbox(mut self, config: MailboxConfig) -> Self {
        self.mailbox = config;
        self
    }
}
