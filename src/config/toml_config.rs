use crate::app::oracles::OracleParameters;
use crate::core::ConfigProvider;
use crate::domain::model::{PlantType, TransportFlags, WaterParameters};
use crate::utils::error::{Result, TransportError};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_non_negative_f64, validate_path,
    validate_positive_number, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const VALID_OUTPUT_FORMATS: [&str; 2] = ["geojson", "csv"];
pub const VALID_LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub run: RunConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub transport: TransportSection,
    pub oracles: OracleParameters,
    pub water: Option<WaterParameters>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
    pub performance: Option<PerformanceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub description: Option<String>,
    pub country: String,
    pub plant_type: PlantType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub hexagons: String,
    pub demand_centers: String,
    pub infrastructure: String,
    pub country_parameters: String,
}

/// 未設定的旗標預設為 true
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportSection {
    pub pipeline_construction: Option<bool>,
    pub road_construction: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    pub filename: Option<String>,
    pub compression: Option<CompressionConfig>,
}

fn default_output_formats() -> Vec<String> {
    vec!["geojson".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
    pub system_stats: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub worker_threads: Option<usize>,
}

/// 命令列可覆蓋的設定
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub country: Option<String>,
    pub plant_type: Option<PlantType>,
    pub pipeline_construction: Option<bool>,
    pub road_construction: Option<bool>,
}

impl TransportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TransportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TransportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TransportError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn apply_overrides(&mut self, overrides: &RunOverrides) {
        if let Some(country) = &overrides.country {
            tracing::info!("🔧 Overriding country: {}", country);
            self.run.country = country.clone();
        }
        if let Some(plant_type) = overrides.plant_type {
            tracing::info!("🔧 Overriding plant type: {}", plant_type);
            self.run.plant_type = plant_type;
        }
        if let Some(enabled) = overrides.pipeline_construction {
            self.transport.pipeline_construction = Some(enabled);
        }
        if let Some(enabled) = overrides.road_construction {
            self.transport.road_construction = Some(enabled);
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("run.name", &self.run.name)?;
        validate_non_empty_string("run.country", &self.run.country)?;

        validate_file_extension("input.hexagons", &self.input.hexagons, &["geojson", "json"])?;
        validate_file_extension("input.demand_centers", &self.input.demand_centers, &["csv"])?;
        validate_file_extension("input.infrastructure", &self.input.infrastructure, &["csv"])?;
        validate_file_extension(
            "input.country_parameters",
            &self.input.country_parameters,
            &["csv"],
        )?;

        validate_path("load.output_path", &self.load.output_path)?;
        if self.load.output_formats.is_empty() {
            return Err(TransportError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        for format in &self.load.output_formats {
            if !VALID_OUTPUT_FORMATS.contains(&format.to_ascii_lowercase().as_str()) {
                return Err(TransportError::InvalidConfigValueError {
                    field: "load.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_OUTPUT_FORMATS.join(", ")
                    ),
                });
            }
        }
        if let Some(filename) = &self.load.filename {
            validate_file_extension("load.filename", filename, &["geojson", "json"])?;
        }

        if let Some(threads) = self.worker_threads() {
            validate_positive_number("performance.worker_threads", threads, 1)?;
        }

        if let Some(format) = self.monitoring.as_ref().and_then(|m| m.log_format.as_ref()) {
            if !VALID_LOG_FORMATS.contains(&format.as_str()) {
                return Err(TransportError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.clone(),
                    reason: format!("Valid formats: {}", VALID_LOG_FORMATS.join(", ")),
                });
            }
        }

        if let Some(water) = &self.water {
            validate_non_negative_f64(
                "water.freshwater_treatment_electricity",
                water.freshwater_treatment_electricity,
            )?;
            validate_non_negative_f64(
                "water.ocean_treatment_electricity",
                water.ocean_treatment_electricity,
            )?;
            validate_non_negative_f64("water.transport_cost", water.transport_cost)?;
            validate_non_negative_f64("water.specific_cost", water.specific_cost)?;
            validate_non_negative_f64("water.water_demand", water.water_demand)?;
        }

        self.oracles.validate_for(self.run.plant_type)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring
            .as_ref()
            .map(|m| m.enabled && m.system_stats.unwrap_or(true))
            .unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            == Some("json")
    }
}

impl ConfigProvider for TransportConfig {
    fn country(&self) -> &str {
        &self.run.country
    }

    fn plant_type(&self) -> PlantType {
        self.run.plant_type
    }

    fn transport_flags(&self) -> TransportFlags {
        TransportFlags {
            pipeline_construction: self.transport.pipeline_construction.unwrap_or(true),
            road_construction: self.transport.road_construction.unwrap_or(true),
        }
    }

    fn hexagons_path(&self) -> &str {
        &self.input.hexagons
    }

    fn demand_centers_path(&self) -> &str {
        &self.input.demand_centers
    }

    fn infrastructure_path(&self) -> &str {
        &self.input.infrastructure
    }

    fn country_parameters_path(&self) -> &str {
        &self.input.country_parameters
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_filename(&self) -> String {
        self.load
            .filename
            .clone()
            .unwrap_or_else(|| format!("hexagons_with_transport_{}.geojson", self.run.plant_type))
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn compression_enabled(&self) -> bool {
        self.load
            .compression
            .as_ref()
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    fn worker_threads(&self) -> Option<usize> {
        self.performance.as_ref().and_then(|p| p.worker_threads)
    }

    fn water_parameters(&self) -> Option<&WaterParameters> {
        self.water.as_ref()
    }
}

impl Validate for TransportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
