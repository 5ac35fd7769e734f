//! YAML input and its resolution into per-system configuration.
//!
//! Loading is two-phase. [`EquationSystemsConfig::resolve`] first seeds
//! every system with the collection-level overset defaults (read only
//! when the realm has overset meshes), then applies the system's own
//! block on top. The result is a list of fully resolved
//! [`SystemConfig`]s; no system is built until every declaration has
//! resolved.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use zephyr_eqsys::{
    BoundaryConditionData, ConfigError, EquationSystemKind, KindOptions,
    NonConformalBoundaryConditionData, OversetBoundaryConditionData,
    PeriodicBoundaryConditionData, PostProcessingData, Relaxation, SolverSpecification,
    SystemConfig, UserFunctionInitialConditionData,
};

fn one() -> u32 {
    1
}

fn parse_error(e: serde_yaml::Error) -> ConfigError {
    ConfigError::Parse {
        reason: e.to_string(),
    }
}

// ── SystemBlock ────────────────────────────────────────────────────

/// Relaxation as written in input; missing fractions default to 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelaxationBlock {
    /// Fraction of the old field kept.
    #[serde(default)]
    pub field_fraction: Option<f64>,
    /// Fraction of the delta added.
    #[serde(default)]
    pub delta_fraction: Option<f64>,
}

/// One system's block as written in input. Every key is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemBlock {
    /// User-facing name.
    pub name: Option<String>,
    /// Linear solves per nonlinear pass.
    pub max_iterations: Option<u32>,
    /// Scaled-residual convergence tolerance.
    pub convergence_tolerance: Option<f64>,
    /// Override of the collection's decoupled-overset default.
    pub decoupled_overset_solve: Option<bool>,
    /// Override of the collection's overset-corrector default.
    pub num_overset_correctors: Option<u32>,
    /// Under-relaxation of the solution update.
    pub solution_update_relaxation: Option<RelaxationBlock>,
    /// Constant volumetric source per dof component.
    pub source: Option<Vec<f64>>,
    /// LowMachEOM: element-based continuity.
    pub element_continuity_eqs: Option<bool>,
    /// Enthalpy: lower temperature clip.
    pub minimum_temperature: Option<f64>,
    /// Enthalpy: upper temperature clip.
    pub maximum_temperature: Option<f64>,
    /// Enthalpy: log clipping summaries.
    pub output_clipping_diagnostic: Option<bool>,
}

// ── EquationSystemsConfig ──────────────────────────────────────────

/// The `equation_systems` block of an input document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquationSystemsConfig {
    /// Collection name.
    pub name: String,
    /// Nonlinear passes per timestep.
    #[serde(default = "one")]
    pub max_iterations: u32,
    /// Default decoupled-overset flag for every system.
    #[serde(default)]
    pub decoupled_overset_solve: Option<bool>,
    /// Default overset-corrector count for every system.
    #[serde(default)]
    pub num_overset_correctors: Option<u32>,
    /// Equation (or dof) name to solver block.
    #[serde(default)]
    pub solver_system_specification: SolverSpecification,
    /// Ordered declarations, each a single-key map from kind tag to block.
    #[serde(default)]
    pub systems: Vec<IndexMap<String, Option<SystemBlock>>>,
}

#[derive(Deserialize)]
struct EquationSystemsDocument {
    equation_systems: EquationSystemsConfig,
}

impl EquationSystemsConfig {
    /// Parse a document with a top-level `equation_systems` key.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let doc: EquationSystemsDocument = serde_yaml::from_str(text).map_err(parse_error)?;
        doc.validate()?;
        Ok(doc.equation_systems)
    }

    /// Resolve every declaration in order.
    ///
    /// Fails with [`ConfigError::UnknownEquationSystemKind`] on the first
    /// unrecognized tag, before anything is constructed.
    pub fn resolve(&self, has_overset: bool) -> Result<Vec<SystemConfig>, ConfigError> {
        let (decoupled, correctors) = if has_overset {
            (
                self.decoupled_overset_solve.unwrap_or(false),
                self.num_overset_correctors.unwrap_or(1),
            )
        } else {
            (false, 1)
        };

        let mut resolved = Vec::with_capacity(self.systems.len());
        for declaration in &self.systems {
            let mut entries = declaration.iter();
            let (tag, block) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "systems".to_string(),
                        reason: format!(
                            "each declaration must name exactly one kind, found {}",
                            declaration.len()
                        ),
                    })
                }
            };
            let kind: EquationSystemKind = tag.parse()?;
            log::debug!("EquationSystems::load: {kind}");

            let mut config = SystemConfig::new(kind);
            config.decoupled_overset_solve = decoupled;
            config.num_overset_correctors = correctors;
            if let Some(block) = block {
                apply_block(&mut config, block)?;
            }
            resolved.push(config);
        }
        Ok(resolved)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl EquationSystemsDocument {
    fn validate(&self) -> Result<(), ConfigError> {
        self.equation_systems.validate()
    }
}

fn apply_block(config: &mut SystemConfig, block: &SystemBlock) -> Result<(), ConfigError> {
    if let Some(name) = &block.name {
        config.name = Some(name.clone());
    }
    if let Some(n) = block.max_iterations {
        if n == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_iterations".to_string(),
                reason: format!("{} needs at least 1", config.kind),
            });
        }
        config.max_iterations = n;
    }
    if let Some(tol) = block.convergence_tolerance {
        config.convergence_tolerance = tol;
    }
    if let Some(d) = block.decoupled_overset_solve {
        config.decoupled_overset_solve = d;
    }
    if let Some(n) = block.num_overset_correctors {
        config.num_overset_correctors = n;
    }
    if let Some(r) = block.solution_update_relaxation {
        config.relaxation = Relaxation {
            field_fraction: r.field_fraction.unwrap_or(1.0),
            delta_fraction: r.delta_fraction.unwrap_or(1.0),
        };
    }
    if let Some(source) = &block.source {
        config.source = Some(source.clone());
    }
    match &mut config.options {
        KindOptions::LowMach {
            element_continuity_eqs,
        } => {
            if block.element_continuity_eqs.is_some() {
                *element_continuity_eqs = block.element_continuity_eqs;
            }
        }
        KindOptions::Enthalpy {
            minimum_temperature,
            maximum_temperature,
            output_clipping_diagnostic,
        } => {
            if let Some(t) = block.minimum_temperature {
                *minimum_temperature = t;
            }
            if let Some(t) = block.maximum_temperature {
                *maximum_temperature = t;
            }
            if let Some(d) = block.output_clipping_diagnostic {
                *output_clipping_diagnostic = d;
            }
            if *minimum_temperature > *maximum_temperature {
                return Err(ConfigError::InvalidValue {
                    key: "minimum_temperature".to_string(),
                    reason: format!(
                        "{minimum_temperature} exceeds maximum_temperature {maximum_temperature}"
                    ),
                });
            }
        }
        KindOptions::None => {}
    }
    Ok(())
}

// ── SimulationConfig ───────────────────────────────────────────────

/// A boundary condition entry, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// No-slip / fixed-value wall.
    Wall(BoundaryConditionData),
    /// Prescribed inflow.
    Inflow(BoundaryConditionData),
    /// Open (outflow) boundary.
    Open(BoundaryConditionData),
    /// Symmetry plane.
    Symmetry(BoundaryConditionData),
    /// Atmospheric boundary-layer top.
    Abltop(BoundaryConditionData),
    /// Periodic pairing.
    Periodic(PeriodicBoundaryConditionData),
    /// Non-conformal interface.
    NonConformal(NonConformalBoundaryConditionData),
    /// Overset assembly.
    Overset(OversetBoundaryConditionData),
}

/// Constant initial values on a set of parts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantInitialCondition {
    /// Parts it applies to.
    pub target_names: Vec<String>,
    /// Field name to value per component.
    #[serde(default)]
    pub value: IndexMap<String, Vec<f64>>,
}

/// An initial condition entry, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitialCondition {
    /// Constant values.
    Constant(ConstantInitialCondition),
    /// User functions evaluated by the systems.
    UserFunction(UserFunctionInitialConditionData),
}

fn default_time_step() -> f64 {
    1.0
}

fn default_num_states() -> u32 {
    2
}

/// Realm-level input plus the `equation_systems` block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Element blocks fields and interior algorithms live on.
    pub target_names: Vec<String>,
    /// Timestep size.
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    /// Time-states of multi-state fields.
    #[serde(default = "default_num_states")]
    pub num_states: u32,
    /// Edge-based discretization.
    #[serde(default)]
    pub uses_edges: bool,
    /// Boundary conditions in registration order.
    #[serde(default)]
    pub boundary_conditions: Vec<BoundaryCondition>,
    /// Initial conditions in application order.
    #[serde(default)]
    pub initial_conditions: Vec<InitialCondition>,
    /// Surface post-processing requests.
    #[serde(default)]
    pub post_processing: Vec<PostProcessingData>,
    /// The equation systems.
    pub equation_systems: EquationSystemsConfig,
}

impl SimulationConfig {
    /// Parse a simulation document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_yaml::from_str(text).map_err(parse_error)?;
        config.equation_systems.validate()?;
        if !(config.time_step.is_finite() && config.time_step > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "time_step".to_string(),
                reason: format!("{} is not a positive finite number", config.time_step),
            });
        }
        if config.target_names.is_empty() {
            return Err(ConfigError::MissingKey {
                key: "target_names".to_string(),
                context: "simulation".to_string(),
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
equation_systems:
  name: theEqSys
  max_iterations: 2
  decoupled_overset_solve: true
  num_overset_correctors: 3
  solver_system_specification:
    velocity: solve_scalar
    pressure: solve_cont
  systems:
    - LowMachEOM:
        name: myLowMach
        max_iterations: 1
        convergence_tolerance: 1.0e-5
    - Enthalpy:
        decoupled_overset_solve: false
        maximum_temperature: 2000.0
    - WallDistance:
"#;

    #[test]
    fn parses_systems_in_order() {
        let cfg = EquationSystemsConfig::from_yaml(DOC).unwrap();
        assert_eq!(cfg.name, "theEqSys");
        assert_eq!(cfg.max_iterations, 2);
        assert_eq!(cfg.systems.len(), 3);
        assert_eq!(
            cfg.solver_system_specification.block_name("pressure"),
            Ok("solve_cont")
        );
        let kinds: Vec<_> = cfg
            .resolve(false)
            .unwrap()
            .into_iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EquationSystemKind::LowMachEOM,
                EquationSystemKind::Enthalpy,
                EquationSystemKind::WallDistance
            ]
        );
    }

    #[test]
    fn overset_defaults_apply_only_with_overset() {
        let cfg = EquationSystemsConfig::from_yaml(DOC).unwrap();

        let plain = cfg.resolve(false).unwrap();
        assert!(plain.iter().all(|c| !c.decoupled_overset_solve));
        assert!(plain.iter().all(|c| c.num_overset_correctors == 1));

        let overset = cfg.resolve(true).unwrap();
        assert!(overset[0].decoupled_overset_solve);
        assert_eq!(overset[0].num_overset_correctors, 3);
        // Per-system block overrides the seeded default.
        assert!(!overset[1].decoupled_overset_solve);
        assert_eq!(overset[1].num_overset_correctors, 3);
    }

    #[test]
    fn system_blocks_override_kind_defaults() {
        let cfg = EquationSystemsConfig::from_yaml(DOC).unwrap();
        let resolved = cfg.resolve(false).unwrap();
        assert_eq!(resolved[0].name.as_deref(), Some("myLowMach"));
        assert_eq!(resolved[0].convergence_tolerance, 1.0e-5);
        assert_eq!(
            resolved[1].options,
            KindOptions::Enthalpy {
                minimum_temperature: 250.0,
                maximum_temperature: 2000.0,
                output_clipping_diagnostic: true,
            }
        );
        assert_eq!(resolved[2].name, None);
    }

    #[test]
    fn unknown_kind_aborts_the_whole_load() {
        let doc = r#"
equation_systems:
  name: bad
  systems:
    - Enthalpy:
    - MagicFlow:
        max_iterations: 1
"#;
        let cfg = EquationSystemsConfig::from_yaml(doc).unwrap();
        match cfg.resolve(false) {
            Err(ConfigError::UnknownEquationSystemKind { name }) => assert_eq!(name, "MagicFlow"),
            other => panic!("expected UnknownEquationSystemKind, got {other:?}"),
        }
    }

    #[test]
    fn multi_key_declaration_is_invalid() {
        let doc = r#"
equation_systems:
  name: bad
  systems:
    - Enthalpy:
      HeatConduction:
"#;
        let cfg = EquationSystemsConfig::from_yaml(doc).unwrap();
        assert!(matches!(
            cfg.resolve(false),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let doc = "equation_systems:\n  name: x\n  max_iterations: 0\n";
        assert!(matches!(
            EquationSystemsConfig::from_yaml(doc),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn simulation_document_parses_tagged_conditions() {
        let doc = r#"
target_names: [block_1]
time_step: 0.5
boundary_conditions:
  - type: inflow
    target_name: inflow
    user_data:
      velocity: [1.0, 0.0, 0.0]
  - type: periodic
    master: left
    slave: right
initial_conditions:
  - type: constant
    target_names: [block_1]
    value:
      pressure: [0.0]
equation_systems:
  name: theEqSys
  systems:
    - HeatConduction:
"#;
        let cfg = SimulationConfig::from_yaml(doc).unwrap();
        assert_eq!(cfg.num_states, 2);
        assert_eq!(cfg.time_step, 0.5);
        match &cfg.boundary_conditions[0] {
            BoundaryCondition::Inflow(data) => {
                assert_eq!(data.value("velocity"), Some(&[1.0, 0.0, 0.0][..]));
            }
            other => panic!("expected inflow, got {other:?}"),
        }
        match &cfg.boundary_conditions[1] {
            BoundaryCondition::Periodic(data) => assert_eq!(data.search_tolerance, 1.0e-8),
            other => panic!("expected periodic, got {other:?}"),
        }
        assert_eq!(cfg.initial_conditions.len(), 1);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            SimulationConfig::from_yaml("target_names: [unclosed"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
