use serde::{Deserialize, Serialize};

use crate::logic::{BreakerLoadMode, CableCalculator, EngineSettings, UnknownCrossSectionPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub calculator: CalculatorConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorConfig {
    pub unknown_cross_section: UnknownCrossSectionPolicy,
    pub fallback_resistance_ohm_per_km: f64,
    pub breaker_load_mode: BreakerLoadMode,
    /// Currency units per kWh; monthly cost is omitted when unset
    pub tariff_per_kwh: Option<f64>,
    pub days_per_month: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot loaded at startup and rewritten after each change
    pub snapshot_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            calculator: CalculatorConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        let calculator = CableCalculator::default();
        Self {
            unknown_cross_section: calculator.unknown_cross_section,
            fallback_resistance_ohm_per_km: calculator.fallback_resistance_ohm_per_km,
            breaker_load_mode: BreakerLoadMode::default(),
            tariff_per_kwh: None,
            days_per_month: 30.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // Environment variables such as PNET_SERVER__PORT or PNET_CALCULATOR__TARIFF_PER_KWH
        config = config.add_source(
            config::Environment::with_prefix("PNET")
                .separator("__")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let calculator = &self.calculator;
        if calculator.fallback_resistance_ohm_per_km.is_nan() || calculator.fallback_resistance_ohm_per_km <= 0.0 {
            anyhow::bail!(
                "calculator.fallback_resistance_ohm_per_km must be positive, got {}",
                calculator.fallback_resistance_ohm_per_km
            );
        }
        if calculator.days_per_month.is_nan() || calculator.days_per_month <= 0.0 {
            anyhow::bail!(
                "calculator.days_per_month must be positive, got {}",
                calculator.days_per_month
            );
        }
        if let Some(tariff) = calculator.tariff_per_kwh {
            if tariff < 0.0 {
                anyhow::bail!("calculator.tariff_per_kwh must not be negative, got {}", tariff);
            }
        }
        Ok(())
    }

    /// Settings handed to the engine for derived figures
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            calculator: CableCalculator {
                unknown_cross_section: self.calculator.unknown_cross_section,
                fallback_resistance_ohm_per_km: self.calculator.fallback_resistance_ohm_per_km,
            },
            breaker_load_mode: self.calculator.breaker_load_mode,
            tariff_per_kwh: self.calculator.tariff_per_kwh,
            days_per_month: self.calculator.days_per_month,
        }
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
