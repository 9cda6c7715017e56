use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{demand_center}: '{state}' demand not supported")]
    UnsupportedDemandState {
        demand_center: String,
        state: String,
    },

    #[error("Geometry error: {message}")]
    GeometryError { message: String },

    #[error("{oracle} oracle failed: {message}")]
    OracleError { oracle: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Computation,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 失敗的執行一律非零退出
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low | ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl TransportError {
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::GeometryError {
            message: message.into(),
        }
    }

    pub fn oracle(oracle: &str, message: impl Into<String>) -> Self {
        Self::OracleError {
            oracle: oracle.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnsupportedDemandState { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ValidationError { .. } => {
                ErrorCategory::Input
            }
            Self::GeometryError { .. } | Self::OracleError { .. } | Self::ProcessingError { .. } => {
                ErrorCategory::Computation
            }
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Computation => match self {
                // 單一六角格的錯誤只影響該格
                Self::GeometryError { .. } | Self::OracleError { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::UnsupportedDemandState { .. } => {
                "Set 'Demand state' to one of: 500 bar, LH2, NH3".to_string()
            }
            Self::MissingConfigError { field } => format!("Add '{}' to the configuration", field),
            Self::InvalidConfigValueError { field, .. }
            | Self::ConfigValidationError { field, .. } => {
                format!("Check the value of '{}' in the configuration", field)
            }
            Self::ConfigError { .. } => "Check the TOML configuration file".to_string(),
            Self::CsvError(_) => "Check the parameter table headers and number formats".to_string(),
            Self::SerializationError(_) => "Check that the hexagon file is valid GeoJSON".to_string(),
            Self::ValidationError { .. } => "Fix the offending input rows and rerun".to_string(),
            Self::GeometryError { .. } => {
                "Regenerate the hexagon grid; the polygon is degenerate".to_string()
            }
            Self::OracleError { .. } => "Check the oracle parameter tables".to_string(),
            Self::ProcessingError { .. } => "Rerun with --verbose for details".to_string(),
            Self::IoError(_) | Self::ZipError(_) => {
                "Check that the paths exist and are writable".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Input data problem: {}", self),
            ErrorCategory::Computation => format!("Cost computation failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
