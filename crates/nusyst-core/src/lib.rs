//! # nusyst-core
//!
//! Data model and contracts of the nusyst systematic-response engine.
//!
//! - [`ParameterRegistry`]: the configured dials, append-only for a run
//! - [`ResponseCalculator`]: numeric engines (kinematics + dial value → weight)
//! - [`EventResponseProvider`]: one parameter's contribution to one event
//! - [`ResponseAggregator`]: merges and validates all contributions for an event

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod registry;
pub mod traits;
pub mod types;

pub use aggregate::ResponseAggregator;
pub use diagnostics::{DiagnosticRecord, DiagnosticSink, MemorySink};
pub use error::{Error, Result};
pub use event::{FourMomentum, InteractionEvent, Particle, ProcessFlags};
pub use registry::ParameterRegistry;
pub use traits::{EnergyRegime, EventResponseProvider, ResponseCalculator};
pub use types::{
    EventResponseSet, ParameterHeader, ParameterId, ParameterResponse,
    ParameterResponseWithCentral, ResponseEntry,
};
