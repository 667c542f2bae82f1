//! Selection of the two kinematic interpolation axes.

use std::fmt;
use std::str::FromStr;

use nusyst_core::Error;

use crate::kinematics::LeptonKinematics;

/// Which kinematic coordinates are interpolation axes 2 and 3.
///
/// Resolved once at setup from the manifest's `binning_mode` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinningMode {
    /// `q3q0`: (momentum transfer, energy transfer).
    MomentumEnergyTransfer,
    /// `PCTheta`: (lepton momentum, cos θ).
    LeptonMomentumCosAngle,
    /// `PSTheta`: (lepton momentum, signed sin θ).
    LeptonMomentumSignedSinAngle,
    /// `PTheta`: (lepton momentum, θ).
    LeptonMomentumAngle,
}

impl BinningMode {
    /// Selector string as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinningMode::MomentumEnergyTransfer => "q3q0",
            BinningMode::LeptonMomentumCosAngle => "PCTheta",
            BinningMode::LeptonMomentumSignedSinAngle => "PSTheta",
            BinningMode::LeptonMomentumAngle => "PTheta",
        }
    }

    /// Coordinates for axes 2 and 3.
    pub fn coordinates(&self, k: &LeptonKinematics) -> [f64; 2] {
        match self {
            BinningMode::MomentumEnergyTransfer => [k.q3, k.q0],
            BinningMode::LeptonMomentumCosAngle => [k.lepton_momentum, k.cos_angle],
            BinningMode::LeptonMomentumSignedSinAngle => [k.lepton_momentum, k.signed_sin_angle],
            BinningMode::LeptonMomentumAngle => [k.lepton_momentum, k.angle],
        }
    }
}

impl FromStr for BinningMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "q3q0" => Ok(BinningMode::MomentumEnergyTransfer),
            "PCTheta" => Ok(BinningMode::LeptonMomentumCosAngle),
            "PSTheta" => Ok(BinningMode::LeptonMomentumSignedSinAngle),
            "PTheta" => Ok(BinningMode::LeptonMomentumAngle),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown binning mode '{other}' (expected q3q0, PCTheta, PSTheta or PTheta)"
            ))),
        }
    }
}

impl fmt::Display for BinningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for mode in [
            BinningMode::MomentumEnergyTransfer,
            BinningMode::LeptonMomentumCosAngle,
            BinningMode::LeptonMomentumSignedSinAngle,
            BinningMode::LeptonMomentumAngle,
        ] {
            assert_eq!(mode.as_str().parse::<BinningMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_unknown_mode() {
        assert!(matches!("q0q3".parse::<BinningMode>(), Err(Error::InvalidConfiguration(_))));
        assert!(matches!("".parse::<BinningMode>(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_coordinates() {
        let k = LeptonKinematics {
            e_nu: 1.0,
            lepton_momentum: 0.7,
            angle: 0.3,
            cos_angle: 0.3f64.cos(),
            signed_sin_angle: 0.3f64.sin(),
            q0: 0.2,
            q3: 0.5,
            q2: 0.21,
        };
        assert_eq!(BinningMode::MomentumEnergyTransfer.coordinates(&k), [0.5, 0.2]);
        assert_eq!(BinningMode::LeptonMomentumAngle.coordinates(&k), [0.7, 0.3]);
        assert_eq!(BinningMode::LeptonMomentumCosAngle.coordinates(&k), [0.7, 0.3f64.cos()]);
    }
}
