//! Lepton-side kinematics derived from an event.

use std::f64::consts::FRAC_PI_2;

use nusyst_core::{Error, InteractionEvent, Result};

/// Kinematic inputs the RPA calculator can bin in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeptonKinematics {
    /// Probe energy (GeV).
    pub e_nu: f64,
    /// Final-state lepton momentum (GeV).
    pub lepton_momentum: f64,
    /// Opening angle between the leptons, in `[0, π]`.
    pub angle: f64,
    /// cos of `angle`.
    pub cos_angle: f64,
    /// sin of `angle`, negated for backward leptons (`angle >= π/2`).
    pub signed_sin_angle: f64,
    /// Energy transfer (GeV).
    pub q0: f64,
    /// Three-momentum transfer (GeV).
    pub q3: f64,
    /// Q² = −q² (GeV²).
    pub q2: f64,
}

impl LeptonKinematics {
    /// Derive kinematics from the probe and final-state lepton.
    ///
    /// Fails with [`Error::IncompleteEvent`] if either lepton is missing.
    pub fn from_event(event: &InteractionEvent) -> Result<Self> {
        let (nu, lep) = match (event.probe, event.final_state_lepton) {
            (Some(nu), Some(lep)) => (nu.p4, lep.p4),
            (nu, lep) => {
                return Err(Error::IncompleteEvent(format!(
                    "failed to find incoming and final-state lepton (probe: {}, lepton: {}, target: {})",
                    if nu.is_some() { "present" } else { "missing" },
                    if lep.is_some() { "present" } else { "missing" },
                    event.target_pdg
                )));
            }
        };

        let q = nu - lep;
        let angle = lep.angle(&nu);
        let mut signed_sin_angle = angle.sin();
        if angle >= FRAC_PI_2 {
            signed_sin_angle = -signed_sin_angle;
        }

        Ok(Self {
            e_nu: nu.e,
            lepton_momentum: lep.p(),
            angle,
            cos_angle: angle.cos(),
            signed_sin_angle,
            q0: q.e,
            q3: q.p(),
            q2: -q.mag2(),
        })
    }
}
