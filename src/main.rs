use anyhow::Context;
use clap::Parser;
use hex_transport::core::ConfigProvider;
use hex_transport::utils::{logger, validation::Validate};
use hex_transport::{
    CliConfig, CostOracles, EtlEngine, LocalStorage, ParametricOracles, TransportConfig,
    TransportPipeline,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 載入 TOML 配置 (日誌格式由配置決定，先載入再初始化日誌)
    let mut config = TransportConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;

    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting hex-transport");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 應用命令列覆蓋設定
    config.apply_overrides(&args.overrides());

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let flags = config.transport_flags();
    tracing::info!("📋 Run: {}", config.run.name);
    if let Some(description) = &config.run.description {
        tracing::info!("📝 {}", description);
    }
    tracing::info!(
        "🌍 Country: {}, plant type: {}, pipeline construction: {}, road construction: {}",
        config.country(),
        config.plant_type(),
        flags.pipeline_construction,
        flags.road_construction
    );

    if args.dry_run {
        println!("🔍 Dry run - configuration is valid");
        println!("   Hexagons: {}", config.hexagons_path());
        println!("   Demand centers: {}", config.demand_centers_path());
        println!("   Infrastructure: {}", config.infrastructure_path());
        println!("   Country parameters: {}", config.country_parameters_path());
        println!(
            "   Output: {}/{} ({})",
            config.output_path(),
            config.output_filename(),
            config.output_formats().join(", ")
        );
        println!(
            "   Water costs: {}",
            if config.water_parameters().is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 所有路徑相對於目前目錄
    let storage = LocalStorage::new(".".to_string());
    let oracles = CostOracles::from_shared(Arc::new(ParametricOracles::new(
        config.oracles.clone(),
    )));
    let pipeline = TransportPipeline::new(storage, config, oracles);

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Transport run completed successfully!");
            println!("✅ Transport run completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Transport run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}
