//! Configuration loading and validation
//!
//! Resolution order for every value:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! The resulting [`WranglerConfig`] is passed explicitly to every component.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Full wrangler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WranglerConfig {
    pub mlwh: MlwhConfig,
    pub lims: LimsConfig,
    pub tube_racks: TubeRackConfig,
    pub purposes: PurposeNames,
    pub job: JobConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Multi-LIMS warehouse connection details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlwhConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Table holding one row per tube or well
    pub table: String,
}

impl Default for MlwhConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            table: "cgap_heron".to_string(),
        }
    }
}

impl MlwhConfig {
    /// MySQL connection URL for sqlx
    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// Downstream LIMS (Sequencescape) connection details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimsConfig {
    pub protocol: String,
    pub host: String,
    pub api_key: String,
    pub tube_rack_endpoint: String,
    pub plate_endpoint: String,
    pub tube_rack_status_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for LimsConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: String::new(),
            api_key: String::new(),
            tube_rack_endpoint: "/api/v2/heron/tube_racks".to_string(),
            plate_endpoint: "/api/v2/heron/plates".to_string(),
            tube_rack_status_endpoint: "/api/v2/heron/tube_rack_statuses".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LimsConfig {
    /// Absolute URL for an endpoint path on the LIMS host
    pub fn url_for(&self, endpoint: &str) -> String {
        let path = endpoint.trim_start_matches('/');
        format!("{}://{}/{}", self.protocol, self.host.trim_end_matches('/'), path)
    }
}

/// Where tube rack layout files are dropped by the scanner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TubeRackConfig {
    pub dir: PathBuf,
}

/// Downstream purpose names per labware and sample type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurposeNames {
    pub extract_tube_rack_96: String,
    pub extract_tube_rack_48: String,
    pub lysate_tube_rack: String,
    pub extract_plate: String,
    pub lysate_plate: String,
}

impl Default for PurposeNames {
    fn default() -> Self {
        Self {
            extract_tube_rack_96: "TR Stock 96".to_string(),
            extract_tube_rack_48: "TR Stock 48".to_string(),
            lysate_tube_rack: "Heron Lysed Tube Rack".to_string(),
            extract_plate: "Stock Plate".to_string(),
            lysate_plate: "Heron Lysed Plate".to_string(),
        }
    }
}

/// Scheduled extraction job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Warehouse `destination` value selecting rows for the job
    pub destination: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 600,
            destination: "CGAP Extraction".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl WranglerConfig {
    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an optional TOML file, apply environment
    /// overrides, then validate
    ///
    /// A missing file is not fatal: defaults are used and a warning logged.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
                info!("Loaded config file: {}", path.display());
                Self::from_toml_str(&content)?
            }
            Some(path) => {
                warn!("Config file not found: {} (using defaults)", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.mlwh.host, "MLWH_DB_HOST");
        override_string(&mut self.mlwh.user, "MLWH_DB_USER");
        override_string(&mut self.mlwh.password, "MLWH_DB_PASSWORD");
        override_string(&mut self.mlwh.database, "MLWH_DB_DBNAME");
        override_string(&mut self.mlwh.table, "MLWH_DB_TABLE");
        if let Ok(port) = std::env::var("MLWH_DB_PORT") {
            match port.trim().parse() {
                Ok(port) => self.mlwh.port = port,
                Err(_) => warn!("Ignoring invalid MLWH_DB_PORT value: {}", port),
            }
        }

        override_string(&mut self.lims.protocol, "SS_PROTOCOL");
        override_string(&mut self.lims.host, "SS_HOST");
        override_string(&mut self.lims.api_key, "SS_API_KEY");
        override_string(&mut self.lims.tube_rack_endpoint, "SS_TUBE_RACK_ENDPOINT");
        override_string(&mut self.lims.plate_endpoint, "SS_PLATE_ENDPOINT");
        override_string(
            &mut self.lims.tube_rack_status_endpoint,
            "SS_TUBE_RACK_STATUS_ENDPOINT",
        );

        if let Ok(dir) = std::env::var("TUBE_RACK_DIR") {
            self.tube_racks.dir = PathBuf::from(dir);
        }
        override_string(&mut self.server.bind_addr, "WRANGLER_BIND_ADDR");
    }

    /// Check that every required value is present
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("mlwh.host", &self.mlwh.host),
            ("mlwh.user", &self.mlwh.user),
            ("mlwh.password", &self.mlwh.password),
            ("mlwh.database", &self.mlwh.database),
            ("mlwh.table", &self.mlwh.table),
            ("lims.protocol", &self.lims.protocol),
            ("lims.host", &self.lims.host),
            ("lims.api_key", &self.lims.api_key),
            ("lims.tube_rack_endpoint", &self.lims.tube_rack_endpoint),
            ("lims.plate_endpoint", &self.lims.plate_endpoint),
            ("lims.tube_rack_status_endpoint", &self.lims.tube_rack_status_endpoint),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} required for the wrangler", key)));
            }
        }

        if self.tube_racks.dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "tube_racks.dir required for the wrangler".to_string(),
            ));
        }

        // Interpolated into SQL, so it must be a bare identifier
        if !is_sql_identifier(&self.mlwh.table) {
            return Err(Error::Config(format!(
                "mlwh.table is not a valid table name: {}",
                self.mlwh.table
            )));
        }

        if self.job.enabled && self.job.interval_secs == 0 {
            return Err(Error::Config(
                "job.interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn override_string(target: &mut String, env_var_name: &str) {
    if let Ok(value) = std::env::var(env_var_name) {
        *target = value;
    }
}

fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
