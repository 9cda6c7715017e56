pub mod parametric;

pub use parametric::{OracleParameters, ParametricOracles};
