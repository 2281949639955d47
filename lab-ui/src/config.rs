//! `lab-calc` configuration file.
//!
//! Every section is optional; missing keys take the defaults below.
//!
//! ```toml
//! [service]
//! backend = "http"
//! base_url = "http://localhost:8080/api/"
//! timeout_secs = 30
//!
//! [research_page]
//! laboratory_id = 1
//! department_id = 1
//! page_type = "CALCULATION"
//!
//! [logging]
//! level = "info"
//! stdout = true
//! file = "lab-calc.log"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use lab_core::{ResearchPageQuery, SamplingContext, ServiceConfig};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub backend: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        let defaults = ServiceConfig::default();
        Self {
            backend: defaults.backend,
            base_url: defaults.base_url,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResearchPageSection {
    pub laboratory_id: i64,
    pub department_id: i64,
    pub page_type: String,
}

impl Default for ResearchPageSection {
    fn default() -> Self {
        Self {
            laboratory_id: 1,
            department_id: 1,
            page_type: "CALCULATION".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub stdout: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            stdout: true,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSection,
    pub research_page: ResearchPageSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            backend: self.service.backend.clone(),
            base_url: self.service.base_url.clone(),
            timeout: self.timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn sampling_context(
        &self,
        sample_id: i64,
    ) -> SamplingContext {
        SamplingContext {
            page: ResearchPageQuery {
                laboratory_id: self.research_page.laboratory_id,
                department_id: self.research_page.department_id,
                page_type: self.research_page.page_type.clone(),
            },
            sample_id,
        }
    }
}
