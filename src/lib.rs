pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{RunOverrides, TransportConfig};

pub use adapters::LocalStorage;
pub use app::oracles::{OracleParameters, ParametricOracles};
pub use app::pipelines::TransportPipeline;
pub use crate::core::{etl::EtlEngine, strategy::StrategyEngine, CostOracles};
pub use utils::error::{Result, TransportError};
