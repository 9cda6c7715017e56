//! Runs the strategy engine over every (demand center, site) pair and writes
//! the namespaced result columns back onto the sites.

use crate::core::strategy::StrategyEngine;
use crate::domain::model::{
    DemandCenter, DemandCenterRecord, PlantType, Site, SiteDiagnostic, StrategyResult,
};
use crate::utils::error::{Result, TransportError};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub road_construction: String,
    pub trucking: String,
    pub pipeline: String,
    pub trucking_state: String,
    pub lowest_cost: String,
    pub chosen_strategy: String,
}

impl ColumnNames {
    pub fn new(demand_center: &str, plant_type: PlantType) -> Self {
        // 氫廠的成本含轉換，欄名也要標示
        let (trucking, pipeline) = match plant_type {
            PlantType::Hydrogen => (
                format!("{} trucking transport and conversion costs", demand_center),
                format!("{} pipeline transport and conversion costs", demand_center),
            ),
            PlantType::Ammonia => (
                format!("{} trucking transport costs", demand_center),
                format!("{} pipeline transport costs", demand_center),
            ),
        };

        Self {
            road_construction: format!("{} road construction costs", demand_center),
            trucking,
            pipeline,
            trucking_state: format!("{} trucking state", demand_center),
            lowest_cost: format!("{} lowest cost", demand_center),
            chosen_strategy: format!("{} chosen strategy", demand_center),
        }
    }

    pub fn in_order(&self) -> [&str; 6] {
        [
            self.road_construction.as_str(),
            self.trucking.as_str(),
            self.pipeline.as_str(),
            self.trucking_state.as_str(),
            self.lowest_cost.as_str(),
            self.chosen_strategy.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SiteOutcome {
    Evaluated(StrategyResult),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AggregationReport {
    pub columns: Vec<String>,
    pub diagnostics: Vec<SiteDiagnostic>,
}

/// Parses every demand center before any site is touched, so an unsupported
/// demand state aborts the run up front.
pub fn validate_demand_centers(records: &[DemandCenterRecord]) -> Result<Vec<DemandCenter>> {
    let mut seen = HashSet::new();
    let mut centers = Vec::with_capacity(records.len());

    for record in records {
        let center = DemandCenter::from_record(record)?;
        if !seen.insert(center.name.clone()) {
            return Err(TransportError::InvalidConfigValueError {
                field: "Demand center".to_string(),
                value: center.name,
                reason: "Demand center names must be unique".to_string(),
            });
        }
        centers.push(center);
    }

    Ok(centers)
}

/// 每個六角格獨立計算；collect 保留輸入順序，與完成順序無關
pub fn evaluate_demand_center(
    engine: &StrategyEngine,
    pool: &ThreadPool,
    sites: &[Site],
    demand: &DemandCenter,
) -> Vec<SiteOutcome> {
    pool.install(|| {
        sites
            .par_iter()
            .map(|site| match engine.evaluate(site, demand) {
                Ok(result) => SiteOutcome::Evaluated(result),
                Err(e) => SiteOutcome::Failed(e.to_string()),
            })
            .collect()
    })
}

fn cost_value(cost: Option<f64>) -> Value {
    cost.map(Value::from).unwrap_or(Value::Null)
}

fn write_columns(site: &mut Site, names: &ColumnNames, outcome: &SiteOutcome) {
    let values: [Value; 6] = match outcome {
        SiteOutcome::Evaluated(result) => [
            Value::from(result.road_construction_cost),
            cost_value(result.trucking.cost()),
            cost_value(result.pipeline.cost()),
            result
                .trucking_state()
                .map(|s| Value::String(s.to_string()))
                .unwrap_or(Value::Null),
            cost_value(result.lowest_cost),
            Value::String(result.chosen.label().to_string()),
        ],
        SiteOutcome::Failed(_) => Default::default(),
    };

    for (name, value) in names.in_order().into_iter().zip(values) {
        site.properties.insert(name.to_string(), value);
    }
}

pub fn aggregate(
    engine: &StrategyEngine,
    pool: &ThreadPool,
    sites: &mut [Site],
    records: &[DemandCenterRecord],
) -> Result<AggregationReport> {
    let demand_centers = validate_demand_centers(records)?;

    let mut columns = Vec::with_capacity(demand_centers.len() * 6);
    let mut diagnostics = Vec::new();

    for demand in &demand_centers {
        tracing::info!(
            "🚚 Optimisation for {} at ({:.3}, {:.3}) ({}, {:.0} kg/a) begins over {} hexagons",
            demand.name,
            demand.lat(),
            demand.lon(),
            demand.demand_state,
            demand.annual_demand_quantity,
            sites.len()
        );
        let started = Instant::now();

        let outcomes = evaluate_demand_center(engine, pool, sites, demand);
        let names = ColumnNames::new(&demand.name, engine.plant_type());

        let mut failed = 0usize;
        for (site, outcome) in sites.iter_mut().zip(&outcomes) {
            match outcome {
                SiteOutcome::Failed(message) => {
                    failed += 1;
                    tracing::warn!(
                        "⚠️ Hexagon {} skipped for {}: {}",
                        site.index,
                        demand.name,
                        message
                    );
                    diagnostics.push(SiteDiagnostic {
                        site_index: site.index,
                        demand_center: Some(demand.name.clone()),
                        message: message.clone(),
                    });
                }
                SiteOutcome::Evaluated(result) => {
                    for message in &result.offer_failures {
                        tracing::warn!(
                            "⚠️ Hexagon {} offer unavailable for {}: {}",
                            site.index,
                            demand.name,
                            message
                        );
                        diagnostics.push(SiteDiagnostic {
                            site_index: site.index,
                            demand_center: Some(demand.name.clone()),
                            message: message.clone(),
                        });
                    }
                }
            }
            write_columns(site, &names, outcome);
        }

        tracing::info!(
            "✅ Optimisation for {} complete in {:?} ({} failed)",
            demand.name,
            started.elapsed(),
            failed
        );
        columns.extend(names.in_order().iter().map(|c| c.to_string()));
    }

    Ok(AggregationReport {
        columns,
        diagnostics,
    })
}

pub fn build_thread_pool(worker_threads: Option<usize>) -> Result<ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = worker_threads {
        builder = builder.num_threads(threads);
    }
    builder
        .build()
        .map_err(|e| TransportError::ProcessingError {
            message: format!("Failed to build worker pool: {}", e),
        })
}
