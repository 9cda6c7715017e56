use crate::domain::model::{
    ConversionTarget, Delivery, DemandState, PlantType, PriceContext, RunInput, TransformResult,
    TransportFlags, WaterParameters,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn country(&self) -> &str;
    fn plant_type(&self) -> PlantType;
    fn transport_flags(&self) -> TransportFlags;
    fn hexagons_path(&self) -> &str;
    fn demand_centers_path(&self) -> &str;
    fn infrastructure_path(&self) -> &str;
    fn country_parameters_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_filename(&self) -> String;
    fn output_formats(&self) -> &[String];
    fn compression_enabled(&self) -> bool;
    /// `None` 代表使用全部核心
    fn worker_threads(&self) -> Option<usize>;
    fn water_parameters(&self) -> Option<&WaterParameters>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RunInput>;
    async fn transform(&self, input: RunInput) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

/// Annual cost (€/a) of converting `annual_quantity` kg/a into `target`.
pub trait ConversionOracle: Send + Sync {
    fn conversion_cost(
        &self,
        target: ConversionTarget,
        annual_quantity: f64,
        prices: &PriceContext,
    ) -> Result<f64>;
}

pub trait TruckingOracle: Send + Sync {
    /// 氫氣：比較各卡車型態 (壓縮 / 液化 / 氨)，回傳每公斤成本與勝出型態
    fn cheapest_hydrogen_trucking(
        &self,
        demand_state: DemandState,
        annual_quantity: f64,
        distance_km: f64,
        prices: &PriceContext,
    ) -> Result<Delivery>;

    /// Ammonia has a single truck mode. Returns the annual cost (€/a).
    fn ammonia_trucking_cost(
        &self,
        demand_state: DemandState,
        distance_km: f64,
        annual_quantity: f64,
        prices: &PriceContext,
    ) -> Result<f64>;
}

/// Both variants return a per-kg cost and the chosen pipeline size.
pub trait PipelineOracle: Send + Sync {
    fn cheapest_hydrogen_pipeline(
        &self,
        demand_state: DemandState,
        annual_quantity: f64,
        distance_km: f64,
        prices: &PriceContext,
    ) -> Result<Delivery>;

    fn ammonia_pipeline(
        &self,
        distance_km: f64,
        annual_quantity: f64,
        prices: &PriceContext,
    ) -> Result<Delivery>;
}

#[derive(Clone)]
pub struct CostOracles {
    pub conversion: Arc<dyn ConversionOracle>,
    pub trucking: Arc<dyn TruckingOracle>,
    pub pipeline: Arc<dyn PipelineOracle>,
}

impl CostOracles {
    pub fn new(
        conversion: Arc<dyn ConversionOracle>,
        trucking: Arc<dyn TruckingOracle>,
        pipeline: Arc<dyn PipelineOracle>,
    ) -> Self {
        Self {
            conversion,
            trucking,
            pipeline,
        }
    }

    /// 同一個物件同時實作三種 oracle 時使用
    pub fn from_shared<O>(oracle: Arc<O>) -> Self
    where
        O: ConversionOracle + TruckingOracle + PipelineOracle + 'static,
    {
        Self {
            conversion: oracle.clone(),
            trucking: oracle.clone(),
            pipeline: oracle,
        }
    }
}
