//! Least-cost transport strategy for one (site, demand center) pair.
//!
//! The engine holds only immutable run context, so a single instance is
//! shared by every worker thread.

use crate::core::geodesic::{contains_demand, distance_to_demand};
use crate::core::road::tiered_road_construction_cost;
use crate::domain::model::{
    Delivery, DemandCenter, Offer, PlantType, PriceContext, Site, StrategyResult, TransportFlags,
};
use crate::domain::ports::CostOracles;
use crate::utils::error::{Result, TransportError};

pub const AMMONIA_TRUCKING_STATE: &str = "NH3";

pub struct StrategyEngine {
    plant_type: PlantType,
    flags: TransportFlags,
    prices: PriceContext,
    oracles: CostOracles,
}

impl StrategyEngine {
    pub fn new(
        plant_type: PlantType,
        flags: TransportFlags,
        prices: PriceContext,
        oracles: CostOracles,
    ) -> Self {
        Self {
            plant_type,
            flags,
            prices,
            oracles,
        }
    }

    pub fn plant_type(&self) -> PlantType {
        self.plant_type
    }

    pub fn flags(&self) -> TransportFlags {
        self.flags
    }

    pub fn prices(&self) -> &PriceContext {
        &self.prices
    }

    pub fn evaluate(&self, site: &Site, demand: &DemandCenter) -> Result<StrategyResult> {
        // 含有需求點的六角格：只做轉換，不論建設旗標
        if contains_demand(&site.geometry, &demand.location) {
            return self.local_result(demand);
        }

        let distance_km = distance_to_demand(&site.geometry, demand.location)?;
        let quantity = demand.annual_demand_quantity;

        let mut failures = Vec::new();

        let (road_construction_cost, trucking) = if self.flags.road_construction {
            let annual_road_cost = tiered_road_construction_cost(
                site.road_dist,
                &self.prices.infrastructure,
                self.prices.infrastructure_interest_rate,
                self.prices.infrastructure_lifetime_years,
            );
            (
                annual_road_cost / quantity,
                resolve(self.trucking_offer(demand, distance_km), &mut failures),
            )
        } else if site.road_dist == 0.0 {
            (
                0.0,
                resolve(self.trucking_offer(demand, distance_km), &mut failures),
            )
        } else {
            (0.0, Offer::Unavailable)
        };

        // 管線與卡車互相獨立：一方失敗不影響另一方
        let pipeline = if self.flags.pipeline_construction {
            resolve(self.pipeline_offer(demand, distance_km), &mut failures)
        } else {
            Offer::Unavailable
        };

        Ok(
            StrategyResult::remote(road_construction_cost, trucking, pipeline)
                .with_offer_failures(failures),
        )
    }

    fn local_result(&self, demand: &DemandCenter) -> Result<StrategyResult> {
        let cost = match self.plant_type {
            PlantType::Hydrogen => {
                let annual = self.oracles.conversion.conversion_cost(
                    demand.demand_state.local_conversion_target(),
                    demand.annual_demand_quantity,
                    &self.prices,
                )?;
                finite("conversion", annual / demand.annual_demand_quantity)?
            }
            // 氨廠產品已是最終狀態
            PlantType::Ammonia => 0.0,
        };
        Ok(StrategyResult::local(cost))
    }

    fn trucking_offer(&self, demand: &DemandCenter, distance_km: f64) -> Result<Offer> {
        let quantity = demand.annual_demand_quantity;
        let mut delivery = match self.plant_type {
            PlantType::Hydrogen => self.oracles.trucking.cheapest_hydrogen_trucking(
                demand.demand_state,
                quantity,
                distance_km,
                &self.prices,
            )?,
            PlantType::Ammonia => {
                let annual = self.oracles.trucking.ammonia_trucking_cost(
                    demand.demand_state,
                    distance_km,
                    quantity,
                    &self.prices,
                )?;
                Delivery::new(annual / quantity, AMMONIA_TRUCKING_STATE)
            }
        };
        delivery.cost = finite("trucking", delivery.cost)?;
        Ok(Offer::Available(delivery))
    }

    fn pipeline_offer(&self, demand: &DemandCenter, distance_km: f64) -> Result<Offer> {
        let quantity = demand.annual_demand_quantity;
        let mut delivery = match self.plant_type {
            PlantType::Hydrogen => self.oracles.pipeline.cheapest_hydrogen_pipeline(
                demand.demand_state,
                quantity,
                distance_km,
                &self.prices,
            )?,
            PlantType::Ammonia => {
                self.oracles
                    .pipeline
                    .ammonia_pipeline(distance_km, quantity, &self.prices)?
            }
        };
        delivery.cost = finite("pipeline", delivery.cost)?;
        Ok(Offer::Available(delivery))
    }
}

fn resolve(offer: Result<Offer>, failures: &mut Vec<String>) -> Offer {
    match offer {
        Ok(offer) => offer,
        Err(e) => {
            failures.push(e.to_string());
            Offer::Unavailable
        }
    }
}

fn finite(oracle: &str, cost: f64) -> Result<f64> {
    if cost.is_finite() {
        Ok(cost)
    } else {
        Err(TransportError::oracle(
            oracle,
            format!("returned a non-finite cost ({})", cost),
        ))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::model::{
        ConversionTarget, Delivery, DemandState, InfrastructureCosts, PriceContext, RoadCosts,
    };
    use crate::domain::ports::{ConversionOracle, PipelineOracle, TruckingOracle};
    use crate::utils::error::{Result, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn prices() -> PriceContext {
        PriceContext {
            electricity_price: 0.1,
            heat_price: 0.05,
            plant_interest_rate: 0.08,
            infrastructure_interest_rate: 0.05,
            infrastructure_lifetime_years: 20.0,
            infrastructure: InfrastructureCosts {
                short_road: RoadCosts {
                    capex: 1000.0,
                    opex: 50.0,
                },
                long_road: RoadCosts {
                    capex: 600.0,
                    opex: 30.0,
                },
            },
        }
    }

    /// 固定回傳值的 oracle，方便核對引擎的分支
    #[derive(Default)]
    pub struct FixedOracle {
        pub calls: AtomicUsize,
        pub fail_trucking: bool,
        pub fail_pipeline: bool,
    }

    impl FixedOracle {
        pub fn conversion_annual(target: ConversionTarget, quantity: f64) -> f64 {
            let per_kg = match target {
                ConversionTarget::Gas500Bar => 0.3,
                ConversionTarget::Lh2 => 1.2,
                ConversionTarget::Nh3 => 0.9,
                ConversionTarget::Nh3Load => 0.7,
            };
            per_kg * quantity
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ConversionOracle for FixedOracle {
        fn conversion_cost(
            &self,
            target: ConversionTarget,
            annual_quantity: f64,
            _prices: &PriceContext,
        ) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Self::conversion_annual(target, annual_quantity))
        }
    }

    impl TruckingOracle for FixedOracle {
        fn cheapest_hydrogen_trucking(
            &self,
            _demand_state: DemandState,
            _annual_quantity: f64,
            distance_km: f64,
            _prices: &PriceContext,
        ) -> Result<Delivery> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_trucking {
                return Err(TransportError::oracle("trucking", "no truck configured"));
            }
            let label = if distance_km > 500.0 { "LH2" } else { "500 bar" };
            Ok(Delivery::new(1.0 + 0.001 * distance_km, label))
        }

        fn ammonia_trucking_cost(
            &self,
            _demand_state: DemandState,
            distance_km: f64,
            annual_quantity: f64,
            _prices: &PriceContext,
        ) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_trucking {
                return Err(TransportError::oracle("trucking", "no NH3 truck configured"));
            }
            Ok((0.2 + 0.0005 * distance_km) * annual_quantity)
        }
    }

    impl PipelineOracle for FixedOracle {
        fn cheapest_hydrogen_pipeline(
            &self,
            _demand_state: DemandState,
            _annual_quantity: f64,
            distance_km: f64,
            _prices: &PriceContext,
        ) -> Result<Delivery> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_pipeline {
                return Err(TransportError::oracle("pipeline", "no pipeline size fits"));
            }
            Ok(Delivery::new(0.8 + 0.002 * distance_km, "Medium"))
        }

        fn ammonia_pipeline(
            &self,
            distance_km: f64,
            _annual_quantity: f64,
            _prices: &PriceContext,
        ) -> Result<Delivery> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_pipeline {
                return Err(TransportError::oracle("pipeline", "no pipeline size fits"));
            }
            Ok(Delivery::new(0.1 + 0.001 * distance_km, "Small"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{prices, FixedOracle};
    use super::*;
    use crate::core::road::crf;
    use crate::domain::model::{ChosenStrategy, ConversionTarget, DemandState};
    use geo::{polygon, LineString, Point, Polygon};
    use serde_json::Map;
    use std::sync::Arc;

    const QUANTITY: f64 = 2.0e6;

    fn site(lon: f64, lat: f64, road_dist: f64) -> Site {
        let h = 0.05;
        Site {
            index: 0,
            geometry: polygon![
                (x: lon - h, y: lat - h),
                (x: lon + h, y: lat - h),
                (x: lon + h, y: lat + h),
                (x: lon - h, y: lat + h),
            ],
            road_dist,
            properties: Map::new(),
            source_geometry: None,
            feature_extra: Map::new(),
        }
    }

    fn demand(state: DemandState) -> DemandCenter {
        DemandCenter {
            name: "Nairobi".to_string(),
            location: Point::new(36.82, -1.29),
            annual_demand_quantity: QUANTITY,
            demand_state: state,
        }
    }

    fn engine(plant_type: PlantType, road: bool, pipeline: bool) -> (StrategyEngine, Arc<FixedOracle>) {
        let oracle = Arc::new(FixedOracle::default());
        let engine = StrategyEngine::new(
            plant_type,
            TransportFlags {
                pipeline_construction: pipeline,
                road_construction: road,
            },
            prices(),
            CostOracles::from_shared(oracle.clone()),
        );
        (engine, oracle)
    }

    #[test]
    fn test_containing_site_is_local_conversion() {
        let (engine, _) = engine(PlantType::Hydrogen, true, true);
        let result = engine
            .evaluate(&site(36.82, -1.29, 25.0), &demand(DemandState::Lh2))
            .unwrap();

        let expected = FixedOracle::conversion_annual(ConversionTarget::Lh2, QUANTITY) / QUANTITY;
        assert_eq!(result.road_construction_cost, 0.0);
        assert_eq!(result.trucking_state(), Some("None"));
        assert_eq!(result.trucking.cost(), Some(expected));
        assert_eq!(result.pipeline.cost(), Some(expected));
        assert_eq!(result.chosen, ChosenStrategy::Local);
    }

    #[test]
    fn test_containing_site_nh3_uses_load_variant() {
        let (engine, _) = engine(PlantType::Hydrogen, true, true);
        let result = engine
            .evaluate(&site(36.82, -1.29, 0.0), &demand(DemandState::Nh3))
            .unwrap();

        let expected =
            FixedOracle::conversion_annual(ConversionTarget::Nh3Load, QUANTITY) / QUANTITY;
        assert_eq!(result.trucking.cost(), Some(expected));
        assert_eq!(result.pipeline.cost(), Some(expected));
    }

    #[test]
    fn test_containment_wins_over_disabled_construction() {
        let (engine, oracle) = engine(PlantType::Hydrogen, false, false);
        let result = engine
            .evaluate(&site(36.82, -1.29, 42.0), &demand(DemandState::Gas500Bar))
            .unwrap();

        assert!(result.trucking.is_available());
        assert!(result.pipeline.is_available());
        assert_eq!(result.road_construction_cost, 0.0);
        // 只呼叫了轉換 oracle
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn test_containing_site_ammonia_plant_is_free() {
        let (engine, oracle) = engine(PlantType::Ammonia, true, true);
        let result = engine
            .evaluate(&site(36.82, -1.29, 3.0), &demand(DemandState::Nh3))
            .unwrap();

        assert_eq!(result.trucking.cost(), Some(0.0));
        assert_eq!(result.pipeline.cost(), Some(0.0));
        assert_eq!(result.trucking_state(), Some("None"));
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_remote_site_short_road_scenario() {
        let (engine, _) = engine(PlantType::Hydrogen, true, true);
        let result = engine
            .evaluate(&site(37.5, -1.0, 5.0), &demand(DemandState::Gas500Bar))
            .unwrap();

        let expected = (5.0 * 1000.0 * crf(0.05, 20.0) + 5.0 * 50.0) / QUANTITY;
        assert_eq!(result.road_construction_cost, expected);
        assert!(result.trucking.is_available());
        assert!(result.pipeline.is_available());
        assert_eq!(result.pipeline.label(), Some("Medium"));
    }

    #[test]
    fn test_remote_site_long_road_uses_long_tier() {
        let (engine, _) = engine(PlantType::Hydrogen, true, false);
        let result = engine
            .evaluate(&site(37.5, -1.0, 10.0), &demand(DemandState::Gas500Bar))
            .unwrap();

        let expected = (10.0 * 600.0 * crf(0.05, 20.0) + 10.0 * 30.0) / QUANTITY;
        assert_eq!(result.road_construction_cost, expected);
    }

    #[test]
    fn test_road_disabled_and_unconnected_site_cannot_truck() {
        let (engine, _) = engine(PlantType::Hydrogen, false, true);
        let result = engine
            .evaluate(&site(37.5, -1.0, 0.5), &demand(DemandState::Lh2))
            .unwrap();

        assert_eq!(result.trucking, Offer::Unavailable);
        assert_eq!(result.trucking_state(), None);
        assert_eq!(result.road_construction_cost, 0.0);
        assert_eq!(result.chosen, ChosenStrategy::Pipeline);
    }

    #[test]
    fn test_road_disabled_but_connected_site_can_truck() {
        let (engine, _) = engine(PlantType::Hydrogen, false, true);
        let result = engine
            .evaluate(&site(37.5, -1.0, 0.0), &demand(DemandState::Lh2))
            .unwrap();

        assert!(result.trucking.is_available());
        assert_eq!(result.road_construction_cost, 0.0);
    }

    #[test]
    fn test_pipeline_disabled_is_unavailable() {
        let (engine, _) = engine(PlantType::Hydrogen, true, false);
        for road_dist in [0.0, 3.0, 30.0] {
            let result = engine
                .evaluate(&site(38.5, 0.5, road_dist), &demand(DemandState::Lh2))
                .unwrap();
            assert_eq!(result.pipeline, Offer::Unavailable);
            assert_eq!(result.chosen, ChosenStrategy::Trucking);
        }
    }

    #[test]
    fn test_ammonia_plant_trucking_is_per_unit_nh3() {
        let (engine, _) = engine(PlantType::Ammonia, true, true);
        let s = site(37.5, -1.0, 0.0);
        let d = demand(DemandState::Nh3);
        let result = engine.evaluate(&s, &d).unwrap();

        let distance = distance_to_demand(&s.geometry, d.location).unwrap();
        assert_eq!(result.trucking_state(), Some("NH3"));
        assert_eq!(
            result.trucking.cost(),
            Some((0.2 + 0.0005 * distance) * QUANTITY / QUANTITY)
        );
        assert_eq!(result.pipeline.label(), Some("Small"));
    }

    #[test]
    fn test_degenerate_geometry_is_reported() {
        let (engine, _) = engine(PlantType::Hydrogen, true, true);
        let mut s = site(37.5, -1.0, 0.0);
        s.geometry = Polygon::new(
            LineString::from(vec![(37.0, -1.0), (38.0, -1.0), (37.0, -1.0)]),
            vec![],
        );
        assert!(matches!(
            engine.evaluate(&s, &demand(DemandState::Lh2)),
            Err(TransportError::GeometryError { .. })
        ));
    }

    fn failing_engine(plant_type: PlantType, oracle: FixedOracle) -> StrategyEngine {
        StrategyEngine::new(
            plant_type,
            TransportFlags::default(),
            prices(),
            CostOracles::from_shared(Arc::new(oracle)),
        )
    }

    #[test]
    fn test_pipeline_failure_keeps_trucking() {
        let engine = failing_engine(
            PlantType::Hydrogen,
            FixedOracle {
                fail_pipeline: true,
                ..Default::default()
            },
        );
        let result = engine
            .evaluate(&site(37.5, -1.0, 0.0), &demand(DemandState::Lh2))
            .unwrap();

        assert_eq!(result.pipeline, Offer::Unavailable);
        assert!(result.trucking.is_available());
        assert_eq!(result.chosen, ChosenStrategy::Trucking);
        assert_eq!(result.lowest_cost, result.trucking.cost());
        assert_eq!(result.offer_failures.len(), 1);
        assert!(result.offer_failures[0].contains("pipeline"));
    }

    #[test]
    fn test_trucking_failure_keeps_pipeline() {
        let (healthy, _) = engine(PlantType::Ammonia, true, true);
        let failing = failing_engine(
            PlantType::Ammonia,
            FixedOracle {
                fail_trucking: true,
                ..Default::default()
            },
        );
        let s = site(37.5, -1.0, 0.0);
        let d = demand(DemandState::Nh3);

        let expected = healthy.evaluate(&s, &d).unwrap();
        let result = failing.evaluate(&s, &d).unwrap();

        assert_eq!(result.trucking, Offer::Unavailable);
        assert_eq!(result.pipeline, expected.pipeline);
        assert_eq!(result.chosen, ChosenStrategy::Pipeline);
        assert_eq!(result.lowest_cost, expected.pipeline.cost());
        assert_eq!(result.offer_failures.len(), 1);
        assert!(result.offer_failures[0].contains("no NH3 truck configured"));
        assert!(expected.offer_failures.is_empty());
    }

    #[test]
    fn test_both_offers_failing_is_unavailable() {
        let engine = failing_engine(
            PlantType::Hydrogen,
            FixedOracle {
                fail_trucking: true,
                fail_pipeline: true,
                ..Default::default()
            },
        );
        let result = engine
            .evaluate(&site(37.5, -1.0, 4.0), &demand(DemandState::Lh2))
            .unwrap();

        assert_eq!(result.chosen, ChosenStrategy::Unavailable);
        assert_eq!(result.lowest_cost, None);
        // 道路成本與卡車報價無關，仍照算
        assert!(result.road_construction_cost > 0.0);
        assert_eq!(result.offer_failures.len(), 2);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let (engine, _) = engine(PlantType::Hydrogen, true, true);
        let s = site(39.0, 1.0, 7.5);
        let d = demand(DemandState::Lh2);
        let a = engine.evaluate(&s, &d).unwrap();
        let b = engine.evaluate(&s, &d).unwrap();
        assert_eq!(
            a.trucking.cost().map(f64::to_bits),
            b.trucking.cost().map(f64::to_bits)
        );
        assert_eq!(a, b);
    }
}
