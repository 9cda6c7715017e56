// Adapters layer: concrete implementations for external systems (files, formats).

pub mod geojson;
pub mod storage;
pub mod tables;

pub use storage::LocalStorage;
