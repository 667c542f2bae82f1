//! Optional per-event validation output.
//!
//! Sinks are purely observational: providers record into them after the
//! response is computed, and a sink never influences the response.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::Result;
use crate::traits::EnergyRegime;
use crate::types::ParameterId;

/// Derived kinematics and selected weight for one evaluated event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    /// Parameter that produced the weight.
    pub parameter_id: ParameterId,
    /// Probe PDG code.
    pub nu_pdg: i32,
    /// Final-state lepton PDG code.
    pub lepton_pdg: i32,
    /// Probe energy (GeV).
    pub e_nu: f64,
    /// Final-state lepton momentum (GeV).
    pub lepton_momentum: f64,
    /// Final-state lepton cos θ with respect to +z.
    pub lepton_cos_theta: f64,
    /// Energy transfer (GeV).
    pub q0: f64,
    /// Three-momentum transfer (GeV).
    pub q3: f64,
    /// Q² = −q² (GeV²).
    pub q2: f64,
    /// Hadronic invariant mass (GeV), NaN if unknown.
    pub w: f64,
    /// Target nucleus PDG code.
    pub target_pdg: i32,
    /// Regime the calculator selected, if it partitions energy.
    pub regime: Option<EnergyRegime>,
    /// Weight at the central value.
    pub weight: f64,
}

/// Destination for [`DiagnosticRecord`]s.
pub trait DiagnosticSink {
    /// Store one record.
    fn record(&mut self, record: &DiagnosticRecord) -> Result<()>;

    /// Persist buffered records.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<DiagnosticRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded rows.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&mut self, record: &DiagnosticRecord) -> Result<()> {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
        Ok(())
    }
}
