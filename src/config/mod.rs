pub mod toml_config;

pub use toml_config::{RunOverrides, TransportConfig};

#[cfg(feature = "cli")]
use crate::domain::model::PlantType;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "hex-transport")]
#[command(about = "Least-cost hydrogen / ammonia transport strategies for hexagon grids")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "transport-config.toml")]
    pub config: String,

    /// Override run.country
    #[arg(long)]
    pub country: Option<String>,

    /// Override run.plant_type (hydrogen | ammonia)
    #[arg(long)]
    pub plant_type: Option<PlantType>,

    /// Allow building new pipelines
    #[arg(long)]
    pub pipeline_construction: Option<bool>,

    /// Allow building roads to sites off the network
    #[arg(long)]
    pub road_construction: Option<bool>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Validate and print the run plan without computing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn overrides(&self) -> RunOverrides {
        RunOverrides {
            country: self.country.clone(),
            plant_type: self.plant_type,
            pipeline_construction: self.pipeline_construction,
            road_construction: self.road_construction,
        }
    }
}
