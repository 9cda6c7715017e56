use crate::utils::error::{Result, TransportError};
use geo::{Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// 生產廠類型：決定呼叫哪一組成本 oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantType {
    Hydrogen,
    Ammonia,
}

impl PlantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlantType::Hydrogen => "hydrogen",
            PlantType::Ammonia => "ammonia",
        }
    }
}

impl fmt::Display for PlantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlantType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hydrogen" => Ok(PlantType::Hydrogen),
            "ammonia" => Ok(PlantType::Ammonia),
            other => Err(TransportError::InvalidConfigValueError {
                field: "run.plant_type".to_string(),
                value: other.to_string(),
                reason: "Valid plant types: hydrogen, ammonia".to_string(),
            }),
        }
    }
}

/// 需求中心要求的交貨狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemandState {
    Gas500Bar,
    Lh2,
    Nh3,
}

impl DemandState {
    pub const SUPPORTED: [&'static str; 3] = ["500 bar", "LH2", "NH3"];

    pub fn label(&self) -> &'static str {
        match self {
            DemandState::Gas500Bar => "500 bar",
            DemandState::Lh2 => "LH2",
            DemandState::Nh3 => "NH3",
        }
    }

    /// 不支援的狀態是設定錯誤，不做近似
    pub fn parse(demand_center: &str, raw: &str) -> Result<Self> {
        match raw.trim() {
            "500 bar" => Ok(DemandState::Gas500Bar),
            "LH2" => Ok(DemandState::Lh2),
            "NH3" => Ok(DemandState::Nh3),
            other => Err(TransportError::UnsupportedDemandState {
                demand_center: demand_center.to_string(),
                state: other.to_string(),
            }),
        }
    }

    /// On-site conversion target when the site already is the demand center.
    /// Ammonia delivered from a hydrogen plant uses the `NH3 load` variant.
    pub fn local_conversion_target(&self) -> ConversionTarget {
        match self {
            DemandState::Gas500Bar => ConversionTarget::Gas500Bar,
            DemandState::Lh2 => ConversionTarget::Lh2,
            DemandState::Nh3 => ConversionTarget::Nh3Load,
        }
    }

    pub fn conversion_target(&self) -> ConversionTarget {
        match self {
            DemandState::Gas500Bar => ConversionTarget::Gas500Bar,
            DemandState::Lh2 => ConversionTarget::Lh2,
            DemandState::Nh3 => ConversionTarget::Nh3,
        }
    }
}

impl fmt::Display for DemandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionTarget {
    Gas500Bar,
    Lh2,
    Nh3,
    Nh3Load,
}

impl ConversionTarget {
    pub fn label(&self) -> &'static str {
        match self {
            ConversionTarget::Gas500Bar => "500 bar",
            ConversionTarget::Lh2 => "LH2",
            ConversionTarget::Nh3 => "NH3",
            ConversionTarget::Nh3Load => "NH3_load",
        }
    }
}

impl fmt::Display for ConversionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一個六角格 (候選生產地點)
#[derive(Debug, Clone)]
pub struct Site {
    pub index: usize,
    pub geometry: Polygon<f64>,
    /// km to the nearest existing road
    pub road_dist: f64,
    /// 其餘輸入屬性，保持原順序輸出
    pub properties: Map<String, Value>,
    /// Geometry exactly as read, written back unchanged.
    pub source_geometry: Option<Value>,
    /// Feature 上 type/geometry/properties 以外的成員 (例如 `id`)
    pub feature_extra: Map<String, Value>,
}

impl Site {
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

/// 需求中心 CSV 的原始列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandCenterRecord {
    #[serde(rename = "Demand center")]
    pub name: String,
    #[serde(rename = "Lat [deg]")]
    pub lat: f64,
    #[serde(rename = "Lon [deg]")]
    pub lon: f64,
    #[serde(rename = "Annual demand [kg/a]")]
    pub annual_demand: f64,
    #[serde(rename = "Demand state")]
    pub demand_state: String,
}

#[derive(Debug, Clone)]
pub struct DemandCenter {
    pub name: String,
    /// x = lon, y = lat
    pub location: Point<f64>,
    pub annual_demand_quantity: f64,
    pub demand_state: DemandState,
}

impl DemandCenter {
    pub fn from_record(record: &DemandCenterRecord) -> Result<Self> {
        use crate::utils::validation::{
            validate_non_empty_string, validate_positive_f64, validate_range,
        };

        let name = record.name.trim();
        let demand_state = DemandState::parse(name, &record.demand_state)?;
        validate_non_empty_string("Demand center", name)?;
        validate_range(&format!("{} Lat [deg]", name), record.lat, -90.0, 90.0)?;
        validate_range(&format!("{} Lon [deg]", name), record.lon, -180.0, 180.0)?;
        validate_positive_f64(
            &format!("{} Annual demand [kg/a]", name),
            record.annual_demand,
        )?;

        Ok(Self {
            name: name.to_string(),
            location: Point::new(record.lon, record.lat),
            annual_demand_quantity: record.annual_demand,
            demand_state,
        })
    }

    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    pub fn lon(&self) -> f64 {
        self.location.x()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadCosts {
    pub capex: f64,
    pub opex: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureCosts {
    pub short_road: RoadCosts,
    pub long_road: RoadCosts,
}

/// 所有六角格與需求中心共用的唯讀價格參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceContext {
    pub electricity_price: f64,
    pub heat_price: f64,
    pub plant_interest_rate: f64,
    pub infrastructure_interest_rate: f64,
    pub infrastructure_lifetime_years: f64,
    pub infrastructure: InfrastructureCosts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportFlags {
    pub pipeline_construction: bool,
    pub road_construction: bool,
}

impl Default for TransportFlags {
    fn default() -> Self {
        Self {
            pipeline_construction: true,
            road_construction: true,
        }
    }
}

/// Water-cost parameters, see `core::water`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterParameters {
    /// kWh/m3
    pub freshwater_treatment_electricity: f64,
    /// kWh/m3
    pub ocean_treatment_electricity: f64,
    /// €/100 km/m3
    pub transport_cost: f64,
    /// €/m3
    pub specific_cost: f64,
    /// L/kg of commodity
    pub water_demand: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// € per kg delivered
    pub cost: f64,
    pub label: String,
}

impl Delivery {
    pub fn new(cost: f64, label: impl Into<String>) -> Self {
        Self {
            cost,
            label: label.into(),
        }
    }
}

/// 運輸方式的報價；`Unavailable` 表示設定不允許，與成本 0 不同
#[derive(Debug, Clone, PartialEq)]
pub enum Offer {
    Unavailable,
    Available(Delivery),
}

impl Offer {
    pub fn cost(&self) -> Option<f64> {
        match self {
            Offer::Available(delivery) => Some(delivery.cost),
            Offer::Unavailable => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Offer::Available(delivery) => Some(delivery.label.as_str()),
            Offer::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Offer::Available(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChosenStrategy {
    Local,
    Trucking,
    Pipeline,
    Unavailable,
}

impl ChosenStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            ChosenStrategy::Local => "local",
            ChosenStrategy::Trucking => "trucking",
            ChosenStrategy::Pipeline => "pipeline",
            ChosenStrategy::Unavailable => "unavailable",
        }
    }
}

pub const LOCAL_TRUCKING_STATE: &str = "None";

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub road_construction_cost: f64,
    pub trucking: Offer,
    pub pipeline: Offer,
    pub chosen: ChosenStrategy,
    pub lowest_cost: Option<f64>,
    /// 單一運輸方式的 oracle 失敗；另一種方式仍照常計算
    pub offer_failures: Vec<String>,
}

impl StrategyResult {
    /// The site contains the demand point: conversion only, no transport.
    pub fn local(conversion_cost: f64) -> Self {
        Self {
            road_construction_cost: 0.0,
            trucking: Offer::Available(Delivery::new(conversion_cost, LOCAL_TRUCKING_STATE)),
            pipeline: Offer::Available(Delivery::new(conversion_cost, LOCAL_TRUCKING_STATE)),
            chosen: ChosenStrategy::Local,
            lowest_cost: Some(conversion_cost),
            offer_failures: Vec::new(),
        }
    }

    pub fn remote(road_construction_cost: f64, trucking: Offer, pipeline: Offer) -> Self {
        // 平手時取卡車
        let (chosen, lowest_cost) = match (trucking.cost(), pipeline.cost()) {
            (Some(t), Some(p)) if p < t => (ChosenStrategy::Pipeline, Some(p)),
            (Some(t), _) => (ChosenStrategy::Trucking, Some(t)),
            (None, Some(p)) => (ChosenStrategy::Pipeline, Some(p)),
            (None, None) => (ChosenStrategy::Unavailable, None),
        };

        Self {
            road_construction_cost,
            trucking,
            pipeline,
            chosen,
            lowest_cost,
            offer_failures: Vec::new(),
        }
    }

    pub fn with_offer_failures(mut self, failures: Vec<String>) -> Self {
        self.offer_failures = failures;
        self
    }

    pub fn trucking_state(&self) -> Option<&str> {
        self.trucking.label()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteDiagnostic {
    pub site_index: usize,
    pub demand_center: Option<String>,
    pub message: String,
}

/// extract 階段的輸出
#[derive(Debug, Clone)]
pub struct RunInput {
    pub sites: Vec<Site>,
    /// FeatureCollection 上的其他成員 (`crs`, `name`, ...)
    pub collection_extra: Map<String, Value>,
    pub demand_centers: Vec<DemandCenterRecord>,
    pub prices: PriceContext,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub sites: Vec<Site>,
    pub collection_extra: Map<String, Value>,
    /// 新增欄位名稱，依寫入順序
    pub columns: Vec<String>,
    pub diagnostics: Vec<SiteDiagnostic>,
}
