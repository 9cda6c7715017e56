use crate::domain::model::{InfrastructureCosts, RoadCosts};

/// 短路與長路的分界 (km)
pub const LONG_ROAD_THRESHOLD_KM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadTier {
    /// Already connected to the road network.
    None,
    Short,
    Long,
}

impl RoadTier {
    pub fn for_distance(distance_to_road: f64) -> Self {
        if distance_to_road == 0.0 {
            RoadTier::None
        } else if distance_to_road < LONG_ROAD_THRESHOLD_KM {
            RoadTier::Short
        } else {
            RoadTier::Long
        }
    }

    pub fn unit_costs(&self, infrastructure: &InfrastructureCosts) -> Option<RoadCosts> {
        match self {
            RoadTier::None => None,
            RoadTier::Short => Some(infrastructure.short_road),
            RoadTier::Long => Some(infrastructure.long_road),
        }
    }
}

/// Capital recovery factor `r(1+r)^n / ((1+r)^n - 1)`; `1/n` when `r == 0`.
pub fn crf(interest_rate: f64, lifetime_years: f64) -> f64 {
    if interest_rate == 0.0 {
        return 1.0 / lifetime_years;
    }
    let growth = (1.0 + interest_rate).powf(lifetime_years);
    interest_rate * growth / (growth - 1.0)
}

/// 年化道路建設成本 (€/a)，尚未除以年需求量
pub fn road_construction_cost(
    distance_to_road: f64,
    unit_costs: RoadCosts,
    interest_rate: f64,
    lifetime_years: f64,
) -> f64 {
    distance_to_road * unit_costs.capex * crf(interest_rate, lifetime_years)
        + distance_to_road * unit_costs.opex
}

pub fn tiered_road_construction_cost(
    distance_to_road: f64,
    infrastructure: &InfrastructureCosts,
    interest_rate: f64,
    lifetime_years: f64,
) -> f64 {
    match RoadTier::for_distance(distance_to_road).unit_costs(infrastructure) {
        Some(unit_costs) => {
            road_construction_cost(distance_to_road, unit_costs, interest_rate, lifetime_years)
        }
        None => 0.0,
    }
}
