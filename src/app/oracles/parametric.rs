//! Table-driven cost oracles. Every cost is linear in the tabulated unit
//! costs, so results are reproducible from the TOML parameters alone.

use crate::core::road::crf;
use crate::domain::model::{ConversionTarget, Delivery, DemandState, PlantType, PriceContext};
use crate::domain::ports::{ConversionOracle, PipelineOracle, TruckingOracle};
use crate::utils::error::{Result, TransportError};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative_f64, validate_positive_f64, Validate,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionParameters {
    /// kWh per kg
    pub electricity_demand: f64,
    /// kWh per kg
    pub heat_demand: f64,
    /// € per (kg/a) of installed capacity
    pub capex: f64,
    /// yearly OPEX as a share of CAPEX
    pub opex_share: f64,
    pub lifetime_years: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTable {
    #[serde(rename = "500 bar")]
    pub gas_500bar: ConversionParameters,
    #[serde(rename = "LH2")]
    pub lh2: ConversionParameters,
    #[serde(rename = "NH3")]
    pub nh3: ConversionParameters,
    #[serde(rename = "NH3_load")]
    pub nh3_load: ConversionParameters,
}

impl ConversionTable {
    pub fn get(&self, target: ConversionTarget) -> &ConversionParameters {
        match target {
            ConversionTarget::Gas500Bar => &self.gas_500bar,
            ConversionTarget::Lh2 => &self.lh2,
            ConversionTarget::Nh3 => &self.nh3,
            ConversionTarget::Nh3Load => &self.nh3_load,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruckParameters {
    /// € per kg, independent of distance (loading, terminal)
    pub fixed_cost: f64,
    /// € per kg per km
    pub cost_per_km: f64,
}

impl TruckParameters {
    fn per_kg(&self, distance_km: f64) -> f64 {
        self.fixed_cost + self.cost_per_km * distance_km
    }
}

/// 未列出的卡車型態不參與比較
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TruckTable {
    #[serde(rename = "500 bar", default)]
    pub gas_500bar: Option<TruckParameters>,
    #[serde(rename = "LH2", default)]
    pub lh2: Option<TruckParameters>,
    #[serde(rename = "NH3", default)]
    pub nh3: Option<TruckParameters>,
}

impl TruckTable {
    fn candidates(&self) -> impl Iterator<Item = (DemandState, &TruckParameters)> {
        [
            (DemandState::Gas500Bar, self.gas_500bar.as_ref()),
            (DemandState::Lh2, self.lh2.as_ref()),
            (DemandState::Nh3, self.nh3.as_ref()),
        ]
        .into_iter()
        .filter_map(|(state, params)| params.map(|p| (state, p)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSize {
    pub name: String,
    /// kg/a a single line can carry
    pub max_capacity: f64,
    /// € per km
    pub capex_per_km: f64,
    pub opex_share: f64,
    /// kWh per kg per km (compression / pumping)
    pub electricity_per_kg_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleParameters {
    pub conversion: ConversionTable,
    #[serde(default)]
    pub trucks: TruckTable,
    pub hydrogen_pipelines: Vec<PipelineSize>,
    pub ammonia_pipelines: Vec<PipelineSize>,
}

impl Validate for OracleParameters {
    fn validate(&self) -> Result<()> {
        for (label, params) in [
            ("500 bar", &self.conversion.gas_500bar),
            ("LH2", &self.conversion.lh2),
            ("NH3", &self.conversion.nh3),
            ("NH3_load", &self.conversion.nh3_load),
        ] {
            let field = |name: &str| format!("oracles.conversion.{}.{}", label, name);
            validate_non_negative_f64(&field("electricity_demand"), params.electricity_demand)?;
            validate_non_negative_f64(&field("heat_demand"), params.heat_demand)?;
            validate_non_negative_f64(&field("capex"), params.capex)?;
            validate_non_negative_f64(&field("opex_share"), params.opex_share)?;
            validate_positive_f64(&field("lifetime_years"), params.lifetime_years)?;
        }

        for (state, truck) in self.trucks.candidates() {
            let field = |name: &str| format!("oracles.trucks.{}.{}", state, name);
            validate_non_negative_f64(&field("fixed_cost"), truck.fixed_cost)?;
            validate_non_negative_f64(&field("cost_per_km"), truck.cost_per_km)?;
        }

        for (table, sizes) in [
            ("hydrogen_pipelines", &self.hydrogen_pipelines),
            ("ammonia_pipelines", &self.ammonia_pipelines),
        ] {
            if sizes.is_empty() {
                return Err(TransportError::MissingConfigError {
                    field: format!("oracles.{}", table),
                });
            }
            for size in sizes {
                let field = |name: &str| format!("oracles.{}.{}.{}", table, size.name, name);
                validate_non_empty_string(&format!("oracles.{}.name", table), &size.name)?;
                validate_positive_f64(&field("max_capacity"), size.max_capacity)?;
                validate_non_negative_f64(&field("capex_per_km"), size.capex_per_km)?;
                validate_non_negative_f64(&field("opex_share"), size.opex_share)?;
                validate_non_negative_f64(
                    &field("electricity_per_kg_km"),
                    size.electricity_per_kg_km,
                )?;
            }
        }

        Ok(())
    }
}

impl OracleParameters {
    /// 除了表格本身，還要求該廠型實際會用到的卡車列
    pub fn validate_for(&self, plant_type: PlantType) -> Result<()> {
        self.validate()?;

        match plant_type {
            PlantType::Ammonia if self.trucks.nh3.is_none() => {
                Err(TransportError::MissingConfigError {
                    field: "oracles.trucks.NH3".to_string(),
                })
            }
            PlantType::Hydrogen if self.trucks.candidates().next().is_none() => {
                Err(TransportError::MissingConfigError {
                    field: "oracles.trucks".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

pub struct ParametricOracles {
    params: OracleParameters,
}

impl ParametricOracles {
    pub fn new(mut params: OracleParameters) -> Self {
        // 管徑依容量由小到大排好，查表時直接取第一個夠用的
        for sizes in [&mut params.hydrogen_pipelines, &mut params.ammonia_pipelines] {
            sizes.sort_by(|a, b| a.max_capacity.total_cmp(&b.max_capacity));
        }
        Self { params }
    }

    fn per_kg_conversion(
        &self,
        target: ConversionTarget,
        annual_quantity: f64,
        prices: &PriceContext,
    ) -> Result<f64> {
        Ok(self.conversion_cost(target, annual_quantity, prices)? / annual_quantity)
    }

    /// 最小可容納需求量的管徑；都不夠時用最大管徑並聯。`sizes` 已依容量排序
    fn pipeline_size(sizes: &[PipelineSize], annual_quantity: f64) -> Option<(&PipelineSize, f64)> {
        if let Some(size) = sizes.iter().find(|s| s.max_capacity >= annual_quantity) {
            return Some((size, 1.0));
        }
        let largest = sizes.last()?;
        Some((largest, (annual_quantity / largest.max_capacity).ceil()))
    }

    fn pipeline_transport(
        sizes: &[PipelineSize],
        annual_quantity: f64,
        distance_km: f64,
        prices: &PriceContext,
    ) -> Result<Delivery> {
        let (size, lines) = Self::pipeline_size(sizes, annual_quantity)
            .ok_or_else(|| TransportError::oracle("pipeline", "no pipeline sizes configured"))?;

        let annuity = crf(
            prices.infrastructure_interest_rate,
            prices.infrastructure_lifetime_years,
        );
        let annual = lines * distance_km * size.capex_per_km * (annuity + size.opex_share);
        let energy = size.electricity_per_kg_km * distance_km * prices.electricity_price;

        let label = if lines > 1.0 {
            format!("{} x{}", size.name, lines)
        } else {
            size.name.clone()
        };
        Ok(Delivery::new(annual / annual_quantity + energy, label))
    }
}

impl ConversionOracle for ParametricOracles {
    fn conversion_cost(
        &self,
        target: ConversionTarget,
        annual_quantity: f64,
        prices: &PriceContext,
    ) -> Result<f64> {
        let p = self.params.conversion.get(target);
        let energy = p.electricity_demand * prices.electricity_price + p.heat_demand * prices.heat_price;
        let capital = p.capex * (crf(prices.plant_interest_rate, p.lifetime_years) + p.opex_share);
        Ok(annual_quantity * (energy + capital))
    }
}

impl TruckingOracle for ParametricOracles {
    fn cheapest_hydrogen_trucking(
        &self,
        demand_state: DemandState,
        annual_quantity: f64,
        distance_km: f64,
        prices: &PriceContext,
    ) -> Result<Delivery> {
        let mut best: Option<Delivery> = None;

        for (truck_state, truck) in self.params.trucks.candidates() {
            let mut cost = self.per_kg_conversion(
                truck_state.conversion_target(),
                annual_quantity,
                prices,
            )? + truck.per_kg(distance_km);
            if truck_state != demand_state {
                cost += self.per_kg_conversion(
                    demand_state.conversion_target(),
                    annual_quantity,
                    prices,
                )?;
            }

            if best.as_ref().map_or(true, |b| cost < b.cost) {
                best = Some(Delivery::new(cost, truck_state.label()));
            }
        }

        best.ok_or_else(|| TransportError::oracle("trucking", "no truck types configured"))
    }

    fn ammonia_trucking_cost(
        &self,
        _demand_state: DemandState,
        distance_km: f64,
        annual_quantity: f64,
        _prices: &PriceContext,
    ) -> Result<f64> {
        let truck = self
            .params
            .trucks
            .nh3
            .ok_or_else(|| TransportError::oracle("trucking", "no NH3 truck configured"))?;
        Ok(annual_quantity * truck.per_kg(distance_km))
    }
}

impl PipelineOracle for ParametricOracles {
    fn cheapest_hydrogen_pipeline(
        &self,
        demand_state: DemandState,
        annual_quantity: f64,
        distance_km: f64,
        prices: &PriceContext,
    ) -> Result<Delivery> {
        let mut delivery = Self::pipeline_transport(
            &self.params.hydrogen_pipelines,
            annual_quantity,
            distance_km,
            prices,
        )?;
        // 管線送達低壓氣體，需求端一律要轉換
        delivery.cost +=
            self.per_kg_conversion(demand_state.conversion_target(), annual_quantity, prices)?;
        Ok(delivery)
    }

    fn ammonia_pipeline(
        &self,
        distance_km: f64,
        annual_quantity: f64,
        prices: &PriceContext,
    ) -> Result<Delivery> {
        Self::pipeline_transport(
            &self.params.ammonia_pipelines,
            annual_quantity,
            distance_km,
            prices,
        )
    }
}
