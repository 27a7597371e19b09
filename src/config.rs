use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Cycle period; cycles start when the second-of-hour is a multiple of this.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u32,
    /// How far back each cycle reads raw statuses (covers long outages).
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    /// Raw statuses newer than now - safety_margin_secs are left for downstream consumers.
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: u64,
    /// Run one cycle immediately at startup instead of waiting for the first tick.
    #[serde(default)]
    pub run_on_startup: bool,
    /// Log per-phase cycle timings at DEBUG.
    #[serde(default)]
    pub time_profiling: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            lookback_hours: default_lookback_hours(),
            safety_margin_secs: default_safety_margin_secs(),
            run_on_startup: false,
            time_profiling: false,
        }
    }
}

fn default_interval_secs() -> u32 {
    300
}

fn default_lookback_hours() -> u32 {
    24
}

fn default_safety_margin_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

fn default_vacuum_interval_secs() -> u64 {
    24 * 60 * 60
}

impl AppConfig {
    /// Load from `path`, else `CONFIG_FILE`, else `config.toml`.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_string(),
            None => std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into()),
        };
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.aggregation.interval_secs > 0,
            "aggregation.interval_secs must be > 0, got {}",
            self.aggregation.interval_secs
        );
        anyhow::ensure!(
            self.aggregation.lookback_hours > 0,
            "aggregation.lookback_hours must be > 0, got {}",
            self.aggregation.lookback_hours
        );
        anyhow::ensure!(
            self.aggregation.safety_margin_secs < self.aggregation.lookback_hours as u64 * 3600,
            "aggregation.safety_margin_secs must be shorter than the lookback window, got {}",
            self.aggregation.safety_margin_secs
        );
        anyhow::ensure!(
            self.maintenance.vacuum_interval_secs > 0,
            "maintenance.vacuum_interval_secs must be > 0, got {}",
            self.maintenance.vacuum_interval_secs
        );
        Ok(())
    }
}
