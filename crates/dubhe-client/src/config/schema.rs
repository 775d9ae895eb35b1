use serde::Deserialize;

use dubhe_core::error::{DubheError, Result};

use crate::request::DUBBO_VERSION;
use crate::transport::DEFAULT_MAX_PAYLOAD;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub client: ClientSection,

    #[serde(default)]
    pub services: Vec<ServiceAlias>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DubheError::Config("config version must be 1".into()));
        }

        self.client.validate()?;

        for service in &self.services {
            service.validate()?;
        }
        let mut aliases: Vec<&str> = self.services.iter().map(|s| s.alias.as_str()).collect();
        aliases.sort_unstable();
        aliases.dedup();
        if aliases.len() != self.services.len() {
            return Err(DubheError::Config("service aliases must be unique".into()));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            client: ClientSection::default(),
            services: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    #[serde(default = "default_dubbo_version")]
    pub dubbo_version: String,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_payload_bytes: default_max_payload_bytes(),
            dubbo_version: default_dubbo_version(),
        }
    }
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(DubheError::Config("client.address must not be empty".into()));
        }
        if !(100..=60000).contains(&self.connect_timeout_ms) {
            return Err(DubheError::Config(
                "client.connect_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(100..=600000).contains(&self.request_timeout_ms) {
            return Err(DubheError::Config(
                "client.request_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if !(1024..=256 * 1024 * 1024).contains(&self.max_payload_bytes) {
            return Err(DubheError::Config(
                "client.max_payload_bytes must be between 1 KiB and 256 MiB".into(),
            ));
        }
        if self.dubbo_version.is_empty() {
            return Err(DubheError::Config(
                "client.dubbo_version must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_address() -> String {
    "127.0.0.1:20880".into()
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD
}
fn default_dubbo_version() -> String {
    DUBBO_VERSION.into()
}

/// Short name for a service interface, so the command line can say
/// `users` instead of `com.example.UserService`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceAlias {
    pub alias: String,
    pub interface: String,
    #[serde(default = "default_service_version")]
    pub version: String,
}

impl ServiceAlias {
    fn validate(&self) -> Result<()> {
        if self.alias.is_empty() {
            return Err(DubheError::Config("services[].alias must not be empty".into()));
        }
        if self.interface.is_empty() {
            return Err(DubheError::Config(
                "services[].interface must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_service_version() -> String {
    "1.0.0".into()
}
