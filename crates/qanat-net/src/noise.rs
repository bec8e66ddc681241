//! Channel error models.
//!
//! A noise model transforms a possibly-absent qubit on its way out of a
//! quantum channel: `Option<Qubit>` in, `Option<Qubit>` out. Models
//! never fail; loss is expressed as `None`, which downstream stages pass
//! through untouched. Channels chain models in declaration order.

use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;

use qanat_core::{gates, linalg, GateCache, Qubit};

use crate::error::{NetError, NetResult};

/// Fiber attenuation in dB/km (Yin et al.).
pub const ATTENUATION_COEFFICIENT: f64 = -0.16;

/// A pluggable channel error model.
#[derive(Debug, Clone)]
pub enum NoiseModel {
    /// Photon loss in fiber: the qubit survives with probability
    /// `10^(length·coefficient/10)`; on loss it is forcibly measured
    /// (physical collapse on absorption) and replaced with `None`.
    Attenuation {
        /// Survival probability along the full channel length.
        survival: f64,
    },

    /// Independent Gaussian-distributed X and Z rotations per qubit
    /// (mean 0, scale `variance`).
    RandomUnitary { variance: f64 },

    /// One fixed unitary applied identically to every qubit.
    SystematicUnitary { operator: Array2<Complex64> },
}

impl NoiseModel {
    /// Attenuation over `length_km` of fiber at the default coefficient.
    pub fn attenuation(length_km: f64) -> Self {
        Self::attenuation_with_coefficient(length_km, ATTENUATION_COEFFICIENT)
    }

    /// Attenuation with an explicit coefficient in dB/km.
    pub fn attenuation_with_coefficient(length_km: f64, coefficient: f64) -> Self {
        let decibel_loss = length_km * coefficient;
        Self::Attenuation {
            survival: 10.0_f64.powf(decibel_loss / 10.0),
        }
    }

    /// Per-qubit random X/Z rotation noise.
    pub fn random_unitary(variance: f64) -> Self {
        Self::RandomUnitary { variance }
    }

    /// Systematic unitary noise, either from an explicit 2×2 operator or
    /// sampled once from Gaussian X/Z rotation angles of the given scale.
    ///
    /// Supplying neither is a construction error.
    pub fn systematic_unitary(
        operator: Option<Array2<Complex64>>,
        variance: Option<f64>,
    ) -> NetResult<Self> {
        match (operator, variance) {
            (Some(operator), _) => Ok(Self::SystematicUnitary { operator }),
            (None, Some(variance)) => {
                let mut rng = rand::thread_rng();
                let x_angle: f64 = rng.sample::<f64, _>(StandardNormal) * variance;
                let z_angle: f64 = rng.sample::<f64, _>(StandardNormal) * variance;
                let operator = gates::rotation_z(z_angle).dot(&gates::rotation_x(x_angle));
                Ok(Self::SystematicUnitary { operator })
            }
            (None, None) => Err(NetError::NoiseConfig(
                "provide either an operator or a sampling variance".to_string(),
            )),
        }
    }

    /// Apply this model to a qubit leaving a channel.
    pub fn apply(&self, qubit: Option<Qubit>, cache: &GateCache) -> Option<Qubit> {
        let qubit = qubit?;
        match self {
            Self::Attenuation { survival } => {
                if rand::thread_rng().r#gen::<f64>() > *survival {
                    // Photon absorbed: collapse the state, lose the qubit.
                    if let Err(err) = qubit.measure(cache) {
                        tracing::warn!(%err, "collapse on attenuation loss failed");
                    }
                    None
                } else {
                    Some(qubit)
                }
            }
            Self::RandomUnitary { variance } => {
                let mut rng = rand::thread_rng();
                let x_angle: f64 = rng.sample::<f64, _>(StandardNormal) * variance;
                let z_angle: f64 = rng.sample::<f64, _>(StandardNormal) * variance;
                if let Err(err) = gates::rx(&qubit, x_angle, cache)
                    .and_then(|()| gates::rz(&qubit, z_angle, cache))
                {
                    tracing::warn!(%err, "random unitary noise failed");
                }
                Some(qubit)
            }
            Self::SystematicUnitary { operator } => {
                let expanded =
                    linalg::tensor_fill_identity(operator, qubit.num_qubits(), qubit.index());
                if let Err(err) = qubit.system().apply(&expanded) {
                    tracing::warn!(%err, "systematic unitary noise failed");
                }
                Some(qubit)
            }
        }
    }

    /// Thread a qubit through a chain of models, in order.
    pub fn apply_chain(
        models: &[NoiseModel],
        qubit: Option<Qubit>,
        cache: &GateCache,
    ) -> Option<Qubit> {
        models
            .iter()
            .fold(qubit, |qubit, model| model.apply(qubit, cache))
    }
}
