//! CSV parameter tables: demand centers, infrastructure costs, country prices.

use crate::domain::model::{
    DemandCenterRecord, InfrastructureCosts, PriceContext, RoadCosts, SiteDiagnostic,
};
use crate::utils::error::{Result, TransportError};
use crate::utils::validation::{validate_non_negative_f64, validate_positive_f64};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const SHORT_ROAD: &str = "Short road";
pub const LONG_ROAD: &str = "Long road";

fn reader(data: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data)
}

pub fn read_demand_centers(data: &[u8]) -> Result<Vec<DemandCenterRecord>> {
    let records = reader(data)
        .deserialize()
        .collect::<std::result::Result<Vec<DemandCenterRecord>, _>>()?;

    if records.is_empty() {
        return Err(TransportError::ValidationError {
            message: "demand center table has no rows".to_string(),
        });
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct InfrastructureRow {
    #[serde(rename = "Infrastructure")]
    name: String,
    #[serde(rename = "CAPEX")]
    capex: f64,
    #[serde(rename = "OPEX")]
    opex: f64,
}

pub fn read_infrastructure(data: &[u8]) -> Result<InfrastructureCosts> {
    let rows = reader(data)
        .deserialize()
        .collect::<std::result::Result<Vec<InfrastructureRow>, _>>()?;

    let find = |name: &str| -> Result<RoadCosts> {
        let row = rows
            .iter()
            .find(|row| row.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| TransportError::MissingConfigError {
                field: format!("Infrastructure '{}'", name),
            })?;
        validate_non_negative_f64(&format!("{} CAPEX", name), row.capex)?;
        validate_non_negative_f64(&format!("{} OPEX", name), row.opex)?;
        Ok(RoadCosts {
            capex: row.capex,
            opex: row.opex,
        })
    };

    Ok(InfrastructureCosts {
        short_road: find(SHORT_ROAD)?,
        long_road: find(LONG_ROAD)?,
    })
}

#[derive(Debug, Deserialize)]
struct CountryRow {
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Electricity price (euros/kWh)")]
    electricity_price: f64,
    #[serde(rename = "Heat price (euros/kWh)")]
    heat_price: f64,
    #[serde(rename = "Plant interest rate")]
    plant_interest_rate: f64,
    #[serde(rename = "Infrastructure interest rate")]
    infrastructure_interest_rate: f64,
    #[serde(rename = "Infrastructure lifetime (years)")]
    infrastructure_lifetime_years: f64,
}

/// 依國家名稱挑出價格列，再與道路成本組成 PriceContext
pub fn read_price_context(
    data: &[u8],
    country: &str,
    infrastructure: InfrastructureCosts,
) -> Result<PriceContext> {
    let rows = reader(data)
        .deserialize()
        .collect::<std::result::Result<Vec<CountryRow>, _>>()?;

    let row = rows
        .into_iter()
        .find(|row| row.country.eq_ignore_ascii_case(country.trim()))
        .ok_or_else(|| TransportError::ConfigError {
            message: format!("country '{}' not found in the country parameter table", country),
        })?;

    validate_non_negative_f64("Electricity price (euros/kWh)", row.electricity_price)?;
    validate_non_negative_f64("Heat price (euros/kWh)", row.heat_price)?;
    validate_non_negative_f64("Plant interest rate", row.plant_interest_rate)?;
    validate_non_negative_f64(
        "Infrastructure interest rate",
        row.infrastructure_interest_rate,
    )?;
    validate_positive_f64(
        "Infrastructure lifetime (years)",
        row.infrastructure_lifetime_years,
    )?;

    Ok(PriceContext {
        electricity_price: row.electricity_price,
        heat_price: row.heat_price,
        plant_interest_rate: row.plant_interest_rate,
        infrastructure_interest_rate: row.infrastructure_interest_rate,
        infrastructure_lifetime_years: row.infrastructure_lifetime_years,
        infrastructure,
    })
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Flat attribute table (no geometry); columns in order of first appearance.
pub fn write_attribute_table(rows: &[&Map<String, Value>]) -> Result<Vec<u8>> {
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|h| cell(row.get(*h))))?;
    }
    writer
        .into_inner()
        .map_err(|e| TransportError::ProcessingError {
            message: format!("Failed to flush CSV: {}", e),
        })
}

pub fn write_diagnostics(diagnostics: &[SiteDiagnostic]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for diagnostic in diagnostics {
        writer.serialize(diagnostic)?;
    }
    writer
        .into_inner()
        .map_err(|e| TransportError::ProcessingError {
            message: format!("Failed to flush CSV: {}", e),
        })
}
