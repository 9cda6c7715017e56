// Application layer: concrete pipelines and cost oracles.

pub mod oracles;
pub mod pipelines;
