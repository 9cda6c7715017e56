use crate::adapters::{geojson, tables};
use crate::core::aggregation::{aggregate, build_thread_pool};
use crate::core::strategy::StrategyEngine;
use crate::core::water::{apply_water_costs, FRESHWATER_COSTS, LOWEST_WATER_COST, OCEAN_WATER_COSTS};
use crate::core::{ConfigProvider, CostOracles, Pipeline, RunInput, Storage, TransformResult};
use crate::domain::model::{PlantType, TransportFlags};
use crate::utils::error::{Result, TransportError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

pub const DIAGNOSTICS_FILE: &str = "diagnostics.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

pub struct TransportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    oracles: CostOracles,
}

impl<S: Storage, C: ConfigProvider> TransportPipeline<S, C> {
    pub fn new(storage: S, config: C, oracles: CostOracles) -> Self {
        Self {
            storage,
            config,
            oracles,
        }
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    fn wants_format(&self, format: &str) -> bool {
        self.config
            .output_formats()
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    generated_at: DateTime<Utc>,
    country: &'a str,
    plant_type: PlantType,
    flags: TransportFlags,
    sites: usize,
    columns: &'a [String],
    diagnostics: usize,
    files: &'a [String],
}

fn bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for TransportPipeline<S, C> {
    async fn extract(&self) -> Result<RunInput> {
        tracing::debug!("Reading hexagons from {}", self.config.hexagons_path());

        let (hexagons, demand, infrastructure, countries) = tokio::try_join!(
            self.storage.read_file(self.config.hexagons_path()),
            self.storage.read_file(self.config.demand_centers_path()),
            self.storage.read_file(self.config.infrastructure_path()),
            self.storage.read_file(self.config.country_parameters_path()),
        )?;

        let layer = geojson::read_layer(&hexagons)?;
        let demand_centers = tables::read_demand_centers(&demand)?;
        let infrastructure = tables::read_infrastructure(&infrastructure)?;
        let prices =
            tables::read_price_context(&countries, self.config.country(), infrastructure)?;

        tracing::debug!(
            "🌍 {}: electricity {} €/kWh, heat {} €/kWh",
            self.config.country(),
            prices.electricity_price,
            prices.heat_price
        );

        Ok(RunInput {
            sites: layer.sites,
            collection_extra: layer.extra,
            demand_centers,
            prices,
        })
    }

    async fn transform(&self, input: RunInput) -> Result<TransformResult> {
        let plant_type = self.config.plant_type();
        let flags = self.config.transport_flags();
        let worker_threads = self.config.worker_threads();
        let water = self.config.water_parameters().copied();
        let oracles = self.oracles.clone();

        tracing::info!(
            "⚙️ Plant type: {}, pipeline construction: {}, road construction: {}",
            plant_type,
            flags.pipeline_construction,
            flags.road_construction
        );

        // CPU 密集的計算交給 rayon，不佔用 async runtime
        let handle = tokio::task::spawn_blocking(move || -> Result<TransformResult> {
            let RunInput {
                mut sites,
                collection_extra,
                demand_centers,
                prices,
            } = input;
            let electricity_price = prices.electricity_price;

            let engine = StrategyEngine::new(plant_type, flags, prices, oracles);
            let pool = build_thread_pool(worker_threads)?;
            let report = aggregate(&engine, &pool, &mut sites, &demand_centers)?;

            let mut columns = report.columns;
            let mut diagnostics = report.diagnostics;

            if let Some(params) = water {
                tracing::info!("💧 Computing water costs...");
                diagnostics.extend(apply_water_costs(&mut sites, &params, electricity_price));
                columns.extend(
                    [OCEAN_WATER_COSTS, FRESHWATER_COSTS, LOWEST_WATER_COST]
                        .iter()
                        .map(|c| c.to_string()),
                );
            }

            Ok(TransformResult {
                sites,
                collection_extra,
                columns,
                diagnostics,
            })
        });

        handle.await.map_err(|e| TransportError::ProcessingError {
            message: format!("Strategy computation aborted: {}", e),
        })?
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let filename = self.config.output_filename();
        let mut written: Vec<(String, Vec<u8>)> = Vec::new();

        if self.wants_format("geojson") {
            written.push((
                filename.clone(),
                geojson::write_layer(&result.sites, &result.collection_extra)?,
            ));
        }

        if self.wants_format("csv") {
            let rows: Vec<_> = result.sites.iter().map(|s| &s.properties).collect();
            let csv_name = Path::new(&filename)
                .with_extension("csv")
                .to_string_lossy()
                .into_owned();
            written.push((csv_name, tables::write_attribute_table(&rows)?));
        }

        if !result.diagnostics.is_empty() {
            tracing::warn!(
                "⚠️ {} per-site diagnostics written to {}",
                result.diagnostics.len(),
                DIAGNOSTICS_FILE
            );
            written.push((
                DIAGNOSTICS_FILE.to_string(),
                tables::write_diagnostics(&result.diagnostics)?,
            ));
        }

        let mut file_names: Vec<String> = written.iter().map(|(name, _)| name.clone()).collect();
        file_names.push(SUMMARY_FILE.to_string());
        let summary = RunSummary {
            generated_at: Utc::now(),
            country: self.config.country(),
            plant_type: self.config.plant_type(),
            flags: self.config.transport_flags(),
            sites: result.sites.len(),
            columns: &result.columns,
            diagnostics: result.diagnostics.len(),
            files: &file_names,
        };
        written.push((
            SUMMARY_FILE.to_string(),
            serde_json::to_vec_pretty(&summary)?,
        ));

        if self.config.compression_enabled() {
            let zip_name = Path::new(&filename)
                .with_extension("zip")
                .to_string_lossy()
                .into_owned();
            let zip_data = bundle(&written)?;
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());

            let zip_path = self.output_file(&zip_name);
            self.storage.write_file(&zip_path, &zip_data).await?;
            return Ok(zip_path);
        }

        for (name, data) in &written {
            self.storage
                .write_file(&self.output_file(name), data)
                .await?;
        }

        // 第一個檔案是主要輸出 (GeoJSON 或 CSV)
        let primary = written
            .first()
            .map(|(name, _)| name.as_str())
            .unwrap_or(SUMMARY_FILE);
        Ok(self.output_file(primary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strategy::test_support::FixedOracle;
    use crate::domain::model::WaterParameters;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                TransportError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        plant_type: PlantType,
        flags: TransportFlags,
        output_formats: Vec<String>,
        compression: bool,
        water: Option<WaterParameters>,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                plant_type: PlantType::Hydrogen,
                flags: TransportFlags::default(),
                output_formats: vec!["geojson".to_string()],
                compression: false,
                water: None,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn country(&self) -> &str {
            "Kenya"
        }

        fn plant_type(&self) -> PlantType {
            self.plant_type
        }

        fn transport_flags(&self) -> TransportFlags {
            self.flags
        }

        fn hexagons_path(&self) -> &str {
            "hexagons.geojson"
        }

        fn demand_centers_path(&self) -> &str {
            "demand.csv"
        }

        fn infrastructure_path(&self) -> &str {
            "infrastructure.csv"
        }

        fn country_parameters_path(&self) -> &str {
            "countries.csv"
        }

        fn output_path(&self) -> &str {
            "out"
        }

        fn output_filename(&self) -> String {
            format!("hexagons_with_transport_{}.geojson", self.plant_type)
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn compression_enabled(&self) -> bool {
            self.compression
        }

        fn worker_threads(&self) -> Option<usize> {
            Some(2)
        }

        fn water_parameters(&self) -> Option<&WaterParameters> {
            self.water.as_ref()
        }
    }

    // 第一格包含 Nairobi，第二格約 100 km 外
    const HEXAGONS: &str = r#"{
        "type": "FeatureCollection",
        "name": "kenya_hexagons",
        "features": [
            {"type": "Feature", "id": "a", "properties": {"road_dist": 0.0, "ocean_dist": 400.0, "waterbody_dist": 2.0, "waterway_dist": 5.0},
             "geometry": {"type": "Polygon", "coordinates": [[[36.77, -1.33], [36.87, -1.33], [36.87, -1.24], [36.77, -1.24], [36.77, -1.33]]]}},
            {"type": "Feature", "properties": {"road_dist": 4.0},
             "geometry": {"type": "Polygon", "coordinates": [[[37.67, -1.33], [37.77, -1.33], [37.77, -1.24], [37.67, -1.24], [37.67, -1.33]]]}}
        ]
    }"#;

    const DEMAND: &str = "Demand center,Lat [deg],Lon [deg],Annual demand [kg/a],Demand state\nNairobi,-1.286,36.817,10000000,LH2\n";
    const INFRA: &str = "Infrastructure,CAPEX,OPEX\nShort road,626478,7729\nLong road,481304,7729\n";
    const COUNTRIES: &str = "Country,Electricity price (euros/kWh),Heat price (euros/kWh),Plant interest rate,Infrastructure interest rate,Infrastructure lifetime (years)\nKenya,0.1,0.02,0.08,0.05,50\n";

    async fn seeded_storage(demand: &str) -> MockStorage {
        let storage = MockStorage::new();
        storage.put("hexagons.geojson", HEXAGONS).await;
        storage.put("demand.csv", demand).await;
        storage.put("infrastructure.csv", INFRA).await;
        storage.put("countries.csv", COUNTRIES).await;
        storage
    }

    fn pipeline(storage: MockStorage, config: MockConfig) -> TransportPipeline<MockStorage, MockConfig> {
        let oracles = CostOracles::from_shared(Arc::new(FixedOracle::default()));
        TransportPipeline::new(storage, config, oracles)
    }

    #[tokio::test]
    async fn test_extract_reads_all_inputs() {
        let storage = seeded_storage(DEMAND).await;
        let pipeline = pipeline(storage, MockConfig::new());

        let input = pipeline.extract().await.unwrap();

        assert_eq!(input.sites.len(), 2);
        assert_eq!(input.demand_centers.len(), 1);
        assert_eq!(input.prices.electricity_price, 0.1);
        assert_eq!(input.prices.infrastructure.short_road.capex, 626478.0);
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_io_error() {
        let storage = MockStorage::new();
        let pipeline = pipeline(storage, MockConfig::new());

        assert!(matches!(
            pipeline.extract().await,
            Err(TransportError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_transform_writes_columns_per_demand_center() {
        let storage = seeded_storage(DEMAND).await;
        let pipeline = pipeline(storage, MockConfig::new());

        let input = pipeline.extract().await.unwrap();
        let result = pipeline.transform(input).await.unwrap();

        assert_eq!(result.columns.len(), 6);
        assert!(result.diagnostics.is_empty());

        let local = &result.sites[0].properties;
        assert_eq!(local["Nairobi chosen strategy"], "local");
        assert_eq!(local["Nairobi trucking state"], "None");
        assert!((local["Nairobi lowest cost"].as_f64().unwrap() - 1.2).abs() < 1e-12);

        let remote = &result.sites[1].properties;
        assert_ne!(remote["Nairobi chosen strategy"], "local");
        assert!(remote["Nairobi road construction costs"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_transform_rejects_unsupported_state() {
        let demand = "Demand center,Lat [deg],Lon [deg],Annual demand [kg/a],Demand state\nNairobi,-1.286,36.817,10000000,300 bar\n";
        let storage = seeded_storage(demand).await;
        let pipeline = pipeline(storage, MockConfig::new());

        let input = pipeline.extract().await.unwrap();
        assert!(matches!(
            pipeline.transform(input).await,
            Err(TransportError::UnsupportedDemandState { .. })
        ));
    }

    #[tokio::test]
    async fn test_transform_adds_water_columns_when_configured() {
        let storage = seeded_storage(DEMAND).await;
        let mut config = MockConfig::new();
        config.water = Some(WaterParameters {
            freshwater_treatment_electricity: 0.4,
            ocean_treatment_electricity: 3.7,
            transport_cost: 0.1,
            specific_cost: 1.25,
            water_demand: 21.0,
        });
        let pipeline = pipeline(storage, config);

        let input = pipeline.extract().await.unwrap();
        let result = pipeline.transform(input).await.unwrap();

        assert_eq!(result.columns.len(), 9);
        assert!(result.sites[0].properties[LOWEST_WATER_COST].is_f64());
        // 第二格沒有水源距離
        assert!(result.sites[1].properties[LOWEST_WATER_COST].is_null());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].site_index, 1);
    }

    #[tokio::test]
    async fn test_load_writes_geojson_and_summary() {
        let storage = seeded_storage(DEMAND).await;
        let pipeline = pipeline(storage.clone(), MockConfig::new());

        let input = pipeline.extract().await.unwrap();
        let result = pipeline.transform(input).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(output_path, "out/hexagons_with_transport_hydrogen.geojson");

        let geojson = storage.get_file(&output_path).await.unwrap();
        let value: Value = serde_json::from_slice(&geojson).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 2);
        assert_eq!(value["name"], "kenya_hexagons");
        assert_eq!(value["features"][0]["id"], "a");

        let summary = storage.get_file("out/run_summary.json").await.unwrap();
        let summary: Value = serde_json::from_slice(&summary).unwrap();
        assert_eq!(summary["country"], "Kenya");
        assert_eq!(summary["plant_type"], "hydrogen");
        assert_eq!(summary["sites"], 2);

        // 沒有診斷訊息就不寫 diagnostics.csv
        assert!(storage.get_file("out/diagnostics.csv").await.is_none());
    }

    #[tokio::test]
    async fn test_load_csv_format() {
        let storage = seeded_storage(DEMAND).await;
        let mut config = MockConfig::new();
        config.output_formats = vec!["geojson".to_string(), "csv".to_string()];
        let pipeline = pipeline(storage.clone(), config);

        let input = pipeline.extract().await.unwrap();
        let result = pipeline.transform(input).await.unwrap();
        pipeline.load(result).await.unwrap();

        let csv = storage
            .get_file("out/hexagons_with_transport_hydrogen.csv")
            .await
            .unwrap();
        let csv = String::from_utf8(csv).unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("road_dist"));
        assert!(header.contains("Nairobi chosen strategy"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_load_with_compression_bundles_everything() {
        let storage = seeded_storage(DEMAND).await;
        let mut config = MockConfig::new();
        config.compression = true;
        let pipeline = pipeline(storage.clone(), config);

        let input = pipeline.extract().await.unwrap();
        let result = pipeline.transform(input).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(output_path, "out/hexagons_with_transport_hydrogen.zip");

        let zip_bytes = storage.get_file(&output_path).await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut file_names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        file_names.sort();

        assert_eq!(
            file_names,
            vec!["hexagons_with_transport_hydrogen.geojson", "run_summary.json"]
        );
    }
}
