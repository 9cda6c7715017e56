pub mod transport_pipeline;

pub use transport_pipeline::TransportPipeline;
