use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Infeasible: {0}")]
    Infeasible(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Numeric overflow in {context}")]
    Overflow { context: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimulationError {
    /// Short machine-readable name of the error family, used by the
    /// HTTP and CLI surfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            SimulationError::InvalidInput { .. } => "invalid_input",
            SimulationError::Infeasible(_) => "infeasible",
            SimulationError::InsufficientData(_) => "insufficient_data",
            SimulationError::DivisionByZero { .. } => "division_by_zero",
            SimulationError::Overflow { .. } => "overflow",
            SimulationError::Serialization(_) => "serialization",
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(e: serde_json::Error) -> Self {
        SimulationError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for SimulationError {
    fn from(e: serde_yaml::Error) -> Self {
        SimulationError::Serialization(e.to_string())
    }
}
