use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting transport cost run...");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("Reading hexagons and parameter tables...");
        let input = self.pipeline.extract().await?;
        tracing::info!(
            "Read {} hexagons and {} demand centers",
            input.sites.len(),
            input.demand_centers.len()
        );
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("Computing transport strategies...");
        let evaluations = input.sites.len() * input.demand_centers.len();
        let started = Instant::now();
        let result = self.pipeline.transform(input).await?;
        self.monitor.log_throughput(evaluations, started.elapsed());
        tracing::info!(
            "Added {} columns ({} per-site diagnostics)",
            result.columns.len(),
            result.diagnostics.len()
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("Writing results...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
