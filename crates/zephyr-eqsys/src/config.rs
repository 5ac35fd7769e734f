//! Resolved per-system configuration and solver-block mapping.
//!
//! These are the *output* of configuration loading: every default has
//! already been merged in. Equation systems never see raw input.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── EquationSystemKind ─────────────────────────────────────────────

/// The closed set of equation-system kinds a declaration may name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquationSystemKind {
    /// Momentum plus continuity for low-Mach flow.
    LowMachEOM,
    /// Volume-of-fluid transport.
    VolumeOfFluid,
    /// SST two-equation turbulence (k, omega).
    ShearStressTransport,
    /// Chien k-epsilon turbulence (k, epsilon).
    ChienKEpsilon,
    /// Wilcox k-omega turbulence (k, omega).
    WilcoxKOmega,
    /// One-equation turbulent kinetic energy.
    TurbKineticEnergy,
    /// Enthalpy transport with temperature extraction.
    Enthalpy,
    /// Solid heat conduction.
    HeatConduction,
    /// Wall-distance Poisson solve.
    WallDistance,
}

impl EquationSystemKind {
    /// Every kind, in the order they are tried during load.
    pub const ALL: [EquationSystemKind; 9] = [
        Self::LowMachEOM,
        Self::VolumeOfFluid,
        Self::ShearStressTransport,
        Self::ChienKEpsilon,
        Self::WilcoxKOmega,
        Self::TurbKineticEnergy,
        Self::Enthalpy,
        Self::HeatConduction,
        Self::WallDistance,
    ];

    /// The tag used in input documents.
    pub fn tag(self) -> &'static str {
        match self {
            Self::LowMachEOM => "LowMachEOM",
            Self::VolumeOfFluid => "VolumeOfFluid",
            Self::ShearStressTransport => "ShearStressTransport",
            Self::ChienKEpsilon => "ChienKEpsilon",
            Self::WilcoxKOmega => "WilcoxKOmega",
            Self::TurbKineticEnergy => "TurbKineticEnergy",
            Self::Enthalpy => "Enthalpy",
            Self::HeatConduction => "HeatConduction",
            Self::WallDistance => "WallDistance",
        }
    }
}

impl fmt::Display for EquationSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EquationSystemKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.tag() == s)
            .ok_or_else(|| ConfigError::UnknownEquationSystemKind {
                name: s.to_string(),
            })
    }
}

// ── SystemConfig ───────────────────────────────────────────────────

/// Under-relaxation applied by [`solution_update`](crate::update::solution_update).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relaxation {
    /// Fraction of the old field kept.
    pub field_fraction: f64,
    /// Fraction of the linear-solve delta added.
    pub delta_fraction: f64,
}

impl Default for Relaxation {
    fn default() -> Self {
        Self {
            field_fraction: 1.0,
            delta_fraction: 1.0,
        }
    }
}

/// Options only some kinds understand.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum KindOptions {
    /// No kind-specific options.
    #[default]
    None,
    /// [`EquationSystemKind::LowMachEOM`] options.
    LowMach {
        /// Element-based continuity. `None` picks the realm default
        /// (edge-based when the realm uses edges).
        element_continuity_eqs: Option<bool>,
    },
    /// [`EquationSystemKind::Enthalpy`] options.
    Enthalpy {
        /// Lower temperature clip.
        minimum_temperature: f64,
        /// Upper temperature clip.
        maximum_temperature: f64,
        /// Log a clipping summary after each solve.
        output_clipping_diagnostic: bool,
    },
}

/// Fully resolved configuration of one equation system.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemConfig {
    /// Which variant to construct.
    pub kind: EquationSystemKind,
    /// User-supplied name, if any.
    pub name: Option<String>,
    /// Linear solves per nonlinear pass.
    pub max_iterations: u32,
    /// Scaled residual below which the system is converged.
    pub convergence_tolerance: f64,
    /// Decoupled overset iteration.
    pub decoupled_overset_solve: bool,
    /// Overset correctors when decoupled.
    pub num_overset_correctors: u32,
    /// Solution under-relaxation.
    pub relaxation: Relaxation,
    /// Constant volumetric source per dof component.
    pub source: Option<Vec<f64>>,
    /// Kind-specific options.
    pub options: KindOptions,
}

impl SystemConfig {
    /// A config with every default for `kind`.
    pub fn new(kind: EquationSystemKind) -> Self {
        let options = match kind {
            EquationSystemKind::LowMachEOM => KindOptions::LowMach {
                element_continuity_eqs: None,
            },
            EquationSystemKind::Enthalpy => KindOptions::Enthalpy {
                minimum_temperature: 250.0,
                maximum_temperature: 3000.0,
                output_clipping_diagnostic: true,
            },
            _ => KindOptions::None,
        };
        Self {
            kind,
            name: None,
            max_iterations: 1,
            convergence_tolerance: 1.0,
            decoupled_overset_solve: false,
            num_overset_correctors: 1,
            relaxation: Relaxation::default(),
            source: None,
            options,
        }
    }
}

// ── SolverSpecification ────────────────────────────────────────────

/// Mapping from equation (or dof) name to solver block name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolverSpecification {
    blocks: IndexMap<String, String>,
}

impl SolverSpecification {
    /// Wrap an existing mapping.
    pub fn new(blocks: IndexMap<String, String>) -> Self {
        Self { blocks }
    }

    /// Map `equation` to `block`.
    pub fn insert(&mut self, equation: impl Into<String>, block: impl Into<String>) {
        self.blocks.insert(equation.into(), block.into());
    }

    /// The solver block for `equation`.
    ///
    /// Fails with [`ConfigError::MissingSolverMapping`] on a miss.
    pub fn block_name(&self, equation: &str) -> Result<&str, ConfigError> {
        match self.blocks.get(equation) {
            Some(b) => Ok(b),
            None => {
                log::warn!("Missed equation solver block specification for {equation}");
                Err(ConfigError::MissingSolverMapping {
                    equation: equation.to_string(),
                })
            }
        }
    }

    /// Number of mapped equations.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_parses_from_its_tag() {
        for kind in EquationSystemKind::ALL {
            assert_eq!(kind.tag().parse::<EquationSystemKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        match "NavierStokesMagic".parse::<EquationSystemKind>() {
            Err(ConfigError::UnknownEquationSystemKind { name }) => {
                assert_eq!(name, "NavierStokesMagic");
            }
            other => panic!("expected UnknownEquationSystemKind, got {other:?}"),
        }
    }

    #[test]
    fn enthalpy_defaults() {
        let cfg = SystemConfig::new(EquationSystemKind::Enthalpy);
        assert_eq!(
            cfg.options,
            KindOptions::Enthalpy {
                minimum_temperature: 250.0,
                maximum_temperature: 3000.0,
                output_clipping_diagnostic: true,
            }
        );
        assert_eq!(cfg.max_iterations, 1);
        assert_eq!(cfg.convergence_tolerance, 1.0);
    }

    #[test]
    fn missing_solver_block_is_an_error() {
        let mut spec = SolverSpecification::default();
        spec.insert("velocity", "solve_scalar");
        assert_eq!(spec.block_name("velocity"), Ok("solve_scalar"));
        assert!(matches!(
            spec.block_name("enthalpy"),
            Err(ConfigError::MissingSolverMapping { .. })
        ));
    }
}
