//! Core traits for nusyst
//!
//! Response calculators are pure numeric engines that know nothing about the
//! event model; providers bridge one registered parameter to one calculator.
//! The aggregator only depends on these traits.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::event::InteractionEvent;
use crate::types::{ParameterId, ParameterResponse, ParameterResponseWithCentral};

/// Partition of the incoming energy range with its own interpolation grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyRegime {
    /// Below the boundary.
    Low,
    /// At or above the boundary.
    High,
}

impl EnergyRegime {
    /// Both regimes, low first.
    pub const ALL: [EnergyRegime; 2] = [EnergyRegime::Low, EnergyRegime::High];

    /// Short label for logs and tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyRegime::Low => "low",
            EnergyRegime::High => "high",
        }
    }
}

/// Numeric response engine: kinematics and a dial value in, weight out.
pub trait ResponseCalculator: Send + Sync {
    /// Weight for an event with incoming `energy` and the two binning
    /// coordinates `kinematics`, evaluated at `dial`.
    ///
    /// Numerical degeneracies return the neutral weight `1.0`.
    fn weight(&self, energy: f64, kinematics: [f64; 2], dial: f64) -> f64;

    /// Regime used for `energy`, for calculators that partition the energy range.
    fn regime(&self, _energy: f64) -> Option<EnergyRegime> {
        None
    }

    /// Calculator name (e.g., "HistogramRatioCalculator")
    fn name(&self) -> &str;
}

/// Contribution of one registered parameter to each event.
pub trait EventResponseProvider {
    /// Provider instance name.
    fn name(&self) -> &str;

    /// Parameter this provider answers for.
    fn parameter_id(&self) -> ParameterId;

    /// True if the event matches the process the provider models.
    fn is_applicable(&self, event: &InteractionEvent) -> bool;

    /// Responses at every configured dial value, in dial order.
    ///
    /// Not-applicable events yield the all-ones response of the declared length.
    fn respond(&mut self, event: &InteractionEvent) -> Result<ParameterResponse>;

    /// Like [`respond`](Self::respond), plus the weight at the central value.
    fn respond_with_central(
        &mut self,
        event: &InteractionEvent,
    ) -> Result<ParameterResponseWithCentral>;

    /// End-of-run hook (flush diagnostic sinks).
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
