use crate::domain::model::{Site, SiteDiagnostic, WaterParameters};
use serde_json::Value;

pub const OCEAN_WATER_COSTS: &str = "Ocean water costs";
pub const FRESHWATER_COSTS: &str = "Freshwater costs";
pub const LOWEST_WATER_COST: &str = "Lowest water cost";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterCosts {
    pub freshwater: f64,
    pub ocean: f64,
}

impl WaterCosts {
    pub fn lowest(&self) -> f64 {
        self.freshwater.min(self.ocean)
    }
}

/// 每公斤產品的用水成本 (€/kg)
pub fn water_costs(
    params: &WaterParameters,
    electricity_price: f64,
    waterbody_dist: f64,
    waterway_dist: f64,
    ocean_dist: f64,
) -> WaterCosts {
    let per_km = params.transport_cost / 100.0;
    let freshwater = (params.specific_cost
        + per_km * waterbody_dist.min(waterway_dist)
        + params.freshwater_treatment_electricity * electricity_price)
        * params.water_demand
        / 1000.0;
    let ocean = (params.specific_cost
        + per_km * ocean_dist
        + params.ocean_treatment_electricity * electricity_price)
        * params.water_demand
        / 1000.0;

    WaterCosts { freshwater, ocean }
}

/// Writes the three water columns; sites missing a distance get nulls and a diagnostic.
pub fn apply_water_costs(
    sites: &mut [Site],
    params: &WaterParameters,
    electricity_price: f64,
) -> Vec<SiteDiagnostic> {
    let mut diagnostics = Vec::new();

    for site in sites.iter_mut() {
        let distances = (
            site.property_f64("waterbody_dist"),
            site.property_f64("waterway_dist"),
            site.property_f64("ocean_dist"),
        );

        let values = match distances {
            (Some(waterbody), Some(waterway), Some(ocean)) => {
                let costs = water_costs(params, electricity_price, waterbody, waterway, ocean);
                [
                    Value::from(costs.ocean),
                    Value::from(costs.freshwater),
                    Value::from(costs.lowest()),
                ]
            }
            _ => {
                diagnostics.push(SiteDiagnostic {
                    site_index: site.index,
                    demand_center: None,
                    message: "missing waterbody_dist, waterway_dist or ocean_dist".to_string(),
                });
                Default::default()
            }
        };

        for (name, value) in [OCEAN_WATER_COSTS, FRESHWATER_COSTS, LOWEST_WATER_COST]
            .into_iter()
            .zip(values)
        {
            site.properties.insert(name.to_string(), value);
        }
    }

    if !diagnostics.is_empty() {
        tracing::warn!(
            "💧 {} hexagons lack water distances; water costs left empty",
            diagnostics.len()
        );
    }

    diagnostics
}
