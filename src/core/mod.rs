pub mod aggregation;
pub mod etl;
pub mod geodesic;
pub mod road;
pub mod strategy;
pub mod water;

pub use crate::domain::model::{RunInput, TransformResult};
pub use crate::domain::ports::{ConfigProvider, CostOracles, Pipeline, Storage};
pub use crate::utils::error::Result;
