//! Read-only view of a simulated interaction, as handed to providers.
//!
//! The event source extracts these fields upstream; providers never walk a
//! generator particle list.

use serde::{Deserialize, Serialize};

/// Four-momentum `(px, py, pz, E)` in GeV.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FourMomentum {
    /// x component
    pub px: f64,
    /// y component
    pub py: f64,
    /// z component
    pub pz: f64,
    /// Energy
    pub e: f64,
}

impl FourMomentum {
    /// Create a four-momentum.
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Magnitude of the three-momentum.
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Invariant mass squared, `E² − |p|²`.
    pub fn mag2(&self) -> f64 {
        self.e * self.e - (self.px * self.px + self.py * self.py + self.pz * self.pz)
    }

    /// Cosine of the polar angle with respect to +z.
    pub fn cos_theta(&self) -> f64 {
        let p = self.p();
        if p == 0.0 { 1.0 } else { self.pz / p }
    }

    /// Opening angle between the three-momenta, in `[0, π]`.
    ///
    /// Zero if either vector has zero length.
    pub fn angle(&self, other: &FourMomentum) -> f64 {
        let norm = self.p() * other.p();
        if norm <= 0.0 {
            return 0.0;
        }
        let dot = self.px * other.px + self.py * other.py + self.pz * other.pz;
        (dot / norm).clamp(-1.0, 1.0).acos()
    }
}

impl std::ops::Sub for FourMomentum {
    type Output = FourMomentum;

    fn sub(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum::new(self.px - rhs.px, self.py - rhs.py, self.pz - rhs.pz, self.e - rhs.e)
    }
}

/// A particle: PDG code plus four-momentum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// PDG code
    pub pdg: i32,
    /// Four-momentum
    pub p4: FourMomentum,
}

impl Particle {
    /// Create a particle.
    pub fn new(pdg: i32, p4: FourMomentum) -> Self {
        Self { pdg, p4 }
    }
}

/// Interaction classification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessFlags {
    /// Quasi-elastic scattering
    pub quasi_elastic: bool,
    /// Weak charged current
    pub weak_cc: bool,
    /// Weak neutral current
    pub weak_nc: bool,
    /// Meson-exchange current (2p2h)
    pub mec: bool,
    /// Resonant production
    pub resonant: bool,
    /// Deep inelastic scattering
    pub deep_inelastic: bool,
}

impl ProcessFlags {
    /// Charged-current quasi-elastic flags.
    pub fn ccqe() -> Self {
        Self { quasi_elastic: true, weak_cc: true, ..Self::default() }
    }
}

/// One simulated interaction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Incoming lepton (probe).
    pub probe: Option<Particle>,
    /// Final-state primary lepton.
    pub final_state_lepton: Option<Particle>,
    /// Interaction flags.
    pub process: ProcessFlags,
    /// Target nucleus PDG code.
    pub target_pdg: i32,
    /// Struck nucleon PDG code, if the generator recorded one.
    pub hit_nucleon_pdg: Option<i32>,
    /// Hadronic invariant mass in GeV, if known.
    pub w: Option<f64>,
}

impl InteractionEvent {
    /// Four-momentum transfer `probe − lepton`, if both leptons are present.
    pub fn momentum_transfer(&self) -> Option<FourMomentum> {
        match (self.probe, self.final_state_lepton) {
            (Some(nu), Some(lep)) => Some(nu.p4 - lep.p4),
            _ => None,
        }
    }
}
