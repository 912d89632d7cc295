pub mod config;
pub mod error;
pub mod instrument;
pub mod profile;
pub mod types;

#[cfg(feature = "allocation")]
pub mod allocation;

#[cfg(feature = "analytics")]
pub mod analytics;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "planning")]
pub mod planning;

#[cfg(feature = "recommender")]
pub mod recommender;

pub use error::EngineError;
pub type EngineResult<T> = Result<T, EngineError>;
