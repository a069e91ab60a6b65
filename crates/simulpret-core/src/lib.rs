//! Mortgage simulation engine for the French market.
//!
//! Every calculator is a pure function from a typed input record to a
//! [`ComputationOutput`] envelope. All of them share the annuity primitive in
//! [`amortization`]; the [`api`] module holds the wire records (French field
//! names) that the CLI, HTTP server and Node bindings exchange.

pub mod amortization;
pub mod api;
pub mod capacity;
pub mod error;
pub mod offers;
pub mod optimizer;
pub mod policy;
pub mod rental;
pub mod types;
pub mod variable_rate;

#[cfg(feature = "bank_rates")]
pub mod bank_rates;

pub use error::SimulationError;
pub use policy::SimulationPolicy;
pub use types::*;

/// Standard result type for all simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;
