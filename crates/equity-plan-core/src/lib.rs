pub mod calendar;
pub mod error;
pub mod types;

#[cfg(feature = "forms")]
pub mod forms;

#[cfg(feature = "charts")]
pub mod charts;

#[cfg(feature = "loader")]
pub mod loader;

pub use error::EquityPlanError;
pub use types::*;

/// Standard result type for all equity-plan operations
pub type EquityPlanResult<T> = Result<T, EquityPlanError>;
