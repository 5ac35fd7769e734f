//! Algorithms and drivers that act on realm fields outside the linear solve.
//!
//! An [`Algorithm`] is one unit of work over a set of parts. An
//! [`AlgorithmDriver`] sequences work around a nonlinear pass: the
//! orchestrator runs global drivers before and after every pass, and
//! each system owns its own pre/post drivers.

use zephyr_core::{EntityRank, FieldId, FieldState, PartId};
use zephyr_mesh::MeshDatabase;

use crate::error::{ConfigError, EquationSystemError};
use crate::realm::Realm;

/// One unit of field work.
///
/// Object-safe; stored as `Box<dyn Algorithm>`.
pub trait Algorithm: Send {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Run the algorithm.
    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError>;
}

/// A sequence of work with optional setup and teardown.
pub trait AlgorithmDriver: Send {
    /// Name for logging and error reporting.
    fn name(&self) -> &str;

    /// Called before [`execute`](Self::execute).
    fn pre_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        Ok(())
    }

    /// The driver's main work.
    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError>;

    /// Called after [`execute`](Self::execute).
    fn post_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        Ok(())
    }
}

/// Run `driver` through pre-work, execute, and post-work.
pub fn run_driver(
    driver: &mut dyn AlgorithmDriver,
    realm: &mut Realm,
) -> Result<(), EquationSystemError> {
    driver.pre_work(realm)?;
    driver.execute(realm)?;
    driver.post_work(realm)
}

/// Run every algorithm in order, stopping at the first failure.
pub fn run_all(
    algorithms: &mut [Box<dyn Algorithm>],
    realm: &mut Realm,
) -> Result<(), EquationSystemError> {
    for alg in algorithms.iter_mut() {
        log::trace!("executing {}", alg.name());
        alg.execute(realm)?;
    }
    Ok(())
}

// ── AlgorithmSequence ──────────────────────────────────────────────

/// A driver that runs a list of algorithms in registration order.
#[derive(Default)]
pub struct AlgorithmSequence {
    name: String,
    algorithms: Vec<Box<dyn Algorithm>>,
}

impl AlgorithmSequence {
    /// An empty sequence.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            algorithms: Vec::new(),
        }
    }

    /// Append an algorithm.
    pub fn push(&mut self, algorithm: Box<dyn Algorithm>) {
        self.algorithms.push(algorithm);
    }

    /// Number of algorithms.
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

impl AlgorithmDriver for AlgorithmSequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        run_all(&mut self.algorithms, realm)
    }
}

// ── Field helpers ──────────────────────────────────────────────────

fn field_layout(
    mesh: &MeshDatabase,
    field: FieldId,
    alg: &str,
) -> Result<(EntityRank, usize), EquationSystemError> {
    let schema = mesh
        .schema(field)
        .ok_or_else(|| EquationSystemError::AlgorithmFailed {
            name: alg.to_string(),
            reason: format!("field #{field} is not declared"),
        })?;
    Ok((schema.rank(), schema.num_components() as usize))
}

fn real_slot<'m>(
    mesh: &'m mut MeshDatabase,
    field: FieldId,
    alg: &str,
) -> Result<&'m mut [f64], EquationSystemError> {
    mesh.real_mut(field)
        .ok_or_else(|| EquationSystemError::AlgorithmFailed {
            name: alg.to_string(),
            reason: format!("field #{field} is not real-valued"),
        })
}

// ── Concrete algorithms ────────────────────────────────────────────

/// Copies one time-state of a field into another, e.g. `NP1` into `N`
/// after initial conditions are set.
#[derive(Clone, Debug)]
pub struct CopyStateAlgorithm {
    name: String,
    field: FieldId,
    from: FieldState,
    to: FieldState,
}

impl CopyStateAlgorithm {
    /// Copy `from` into `to` for the field owning `field`.
    pub fn new(field: FieldId, from: FieldState, to: FieldState) -> Self {
        Self {
            name: format!("copy_state_{from}_to_{to}"),
            field,
            from,
            to,
        }
    }
}

impl Algorithm for CopyStateAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        realm
            .mesh_mut()
            .copy_state(self.field, self.from, self.to)
            .map_err(EquationSystemError::from)
    }
}

/// Writes a constant value per component into a field on some parts.
///
/// Used for constant boundary data and constant initial conditions. A
/// value list shorter than the component count repeats its last entry.
#[derive(Clone, Debug)]
pub struct ConstantFieldAlgorithm {
    name: String,
    field: FieldId,
    parts: Vec<PartId>,
    values: Vec<f64>,
}

impl ConstantFieldAlgorithm {
    /// Write `values` into `field` on `parts`.
    pub fn new(name: impl Into<String>, field: FieldId, parts: Vec<PartId>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            field,
            parts,
            values,
        }
    }
}

impl Algorithm for ConstantFieldAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let Some(&last) = self.values.last() else {
            return Ok(());
        };
        let mesh = realm.mesh_mut();
        let (rank, n) = field_layout(mesh, self.field, &self.name)?;
        let entities = mesh.selected_entities(rank, &self.parts);
        let data = real_slot(mesh, self.field, &self.name)?;
        for e in entities {
            for c in 0..n {
                data[e * n + c] = self.values.get(c).copied().unwrap_or(last);
            }
        }
        Ok(())
    }
}

/// Copies one field into another on some parts, e.g. boundary data into
/// the solution field.
#[derive(Clone, Debug)]
pub struct CopyFieldAlgorithm {
    name: String,
    source: FieldId,
    target: FieldId,
    parts: Vec<PartId>,
}

impl CopyFieldAlgorithm {
    /// Copy `source` into `target` on `parts`.
    pub fn new(
        name: impl Into<String>,
        source: FieldId,
        target: FieldId,
        parts: Vec<PartId>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            target,
            parts,
        }
    }
}

impl Algorithm for CopyFieldAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let mesh = realm.mesh_mut();
        let (rank, n) = field_layout(mesh, self.target, &self.name)?;
        let (src_rank, src_n) = field_layout(mesh, self.source, &self.name)?;
        if rank != src_rank || n != src_n {
            return Err(EquationSystemError::AlgorithmFailed {
                name: self.name.clone(),
                reason: format!(
                    "layout mismatch: {src_rank} x {src_n} into {rank} x {n}"
                ),
            });
        }
        let entities = mesh.selected_entities(rank, &self.parts);
        let src: Vec<f64> = mesh
            .real(self.source)
            .map(<[f64]>::to_vec)
            .unwrap_or_default();
        let dst = real_slot(mesh, self.target, &self.name)?;
        for e in entities {
            let row = e * n..(e + 1) * n;
            if let Some(values) = src.get(row.clone()) {
                dst[row].copy_from_slice(values);
            }
        }
        Ok(())
    }
}

// ── User functions ─────────────────────────────────────────────────

/// Analytic initial-condition functions.
#[derive(Clone, Debug, PartialEq)]
pub enum UserFunction {
    /// A constant per component.
    Constant(Vec<f64>),
    /// `offset + slope * x_axis` for every component.
    Linear {
        /// Value at the origin.
        offset: f64,
        /// Change per unit length.
        slope: f64,
        /// Coordinate direction.
        axis: usize,
    },
}

impl UserFunction {
    /// Build a function from its input name and parameters.
    ///
    /// `constant` takes one value per component; `linear` takes
    /// `[offset, slope]` or `[offset, slope, axis]`.
    pub fn parse(name: &str, params: &[f64]) -> Result<Self, ConfigError> {
        match name {
            "constant" => {
                if params.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: "function_params".to_string(),
                        reason: "constant needs at least one value".to_string(),
                    });
                }
                Ok(Self::Constant(params.to_vec()))
            }
            "linear" => match params {
                [offset, slope] => Ok(Self::Linear {
                    offset: *offset,
                    slope: *slope,
                    axis: 0,
                }),
                [offset, slope, axis] if *axis >= 0.0 && axis.fract() == 0.0 => Ok(Self::Linear {
                    offset: *offset,
                    slope: *slope,
                    axis: *axis as usize,
                }),
                _ => Err(ConfigError::InvalidValue {
                    key: "function_params".to_string(),
                    reason: "linear takes [offset, slope] or [offset, slope, axis]".to_string(),
                }),
            },
            other => Err(ConfigError::InvalidValue {
                key: "function_names".to_string(),
                reason: format!("unknown user function '{other}'"),
            }),
        }
    }
}

/// Evaluates a [`UserFunction`] on the nodes of some parts.
#[derive(Clone, Debug)]
pub struct UserFunctionAlgorithm {
    name: String,
    field: FieldId,
    parts: Vec<PartId>,
    function: UserFunction,
}

impl UserFunctionAlgorithm {
    /// Evaluate `function` into `field` on `parts`.
    pub fn new(field: FieldId, parts: Vec<PartId>, function: UserFunction) -> Self {
        Self {
            name: format!("user_function_ic_{field}"),
            field,
            parts,
            function,
        }
    }
}

impl Algorithm for UserFunctionAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let mesh = realm.mesh_mut();
        let (rank, n) = field_layout(mesh, self.field, &self.name)?;
        let entities = mesh.selected_entities(rank, &self.parts);
        match &self.function {
            UserFunction::Constant(values) => {
                let mut constant = ConstantFieldAlgorithm::new(
                    self.name.clone(),
                    self.field,
                    self.parts.clone(),
                    values.clone(),
                );
                constant.execute(realm)
            }
            &UserFunction::Linear {
                offset,
                slope,
                axis,
            } => {
                let dim = mesh.spatial_dimension() as usize;
                let coords: Vec<f64> = mesh
                    .get_field(EntityRank::Node, "coordinates")
                    .and_then(|id| mesh.real(id))
                    .map(<[f64]>::to_vec)
                    .ok_or_else(|| EquationSystemError::AlgorithmFailed {
                        name: self.name.clone(),
                        reason: "linear user function needs nodal coordinates".to_string(),
                    })?;
                if axis >= dim || rank != EntityRank::Node {
                    return Err(EquationSystemError::AlgorithmFailed {
                        name: self.name.clone(),
                        reason: format!("axis {axis} on a {rank} field is not supported"),
                    });
                }
                let data = real_slot(mesh, self.field, &self.name)?;
                for e in entities {
                    let x = coords.get(e * dim + axis).copied().unwrap_or(0.0);
                    for c in 0..n {
                        data[e * n + c] = offset + slope * x;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zephyr_core::{FieldType, ScalarField};

    fn realm_with_pressure() -> (Realm, FieldId, PartId) {
        let mut mesh = MeshDatabase::new(3);
        mesh.set_entity_count(EntityRank::Node, 4);
        let inlet = mesh.declare_part("inlet", Some(EntityRank::Node)).unwrap();
        mesh.add_entities(inlet, EntityRank::Node, &[1, 2]).unwrap();
        let mut realm = Realm::new(mesh, 2).unwrap();
        let fm = realm.field_manager();
        let p: ScalarField = fm
            .register_field(
                realm.mesh_mut(),
                "pressure",
                &[PartId::UNIVERSAL],
                None,
                FieldState::NONE,
            )
            .unwrap();
        (realm, p.id(), inlet)
    }

    #[test]
    fn constant_field_touches_only_part_entities() {
        let (mut realm, p, inlet) = realm_with_pressure();
        let mut alg = ConstantFieldAlgorithm::new("bc", p, vec![inlet], vec![5.0]);
        alg.execute(&mut realm).unwrap();
        assert_eq!(realm.mesh().real(p).unwrap(), &[0.0, 5.0, 5.0, 0.0]);
    }

    #[test]
    fn copy_state_moves_np1_into_n() {
        let (mut realm, p, inlet) = realm_with_pressure();
        ConstantFieldAlgorithm::new("ic", p, vec![inlet], vec![2.0])
            .execute(&mut realm)
            .unwrap();
        CopyStateAlgorithm::new(p, FieldState::NP1, FieldState::N)
            .execute(&mut realm)
            .unwrap();
        let n = realm.mesh().field_of_state(p, FieldState::N).unwrap();
        assert_eq!(realm.mesh().real(n).unwrap(), &[0.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn sequence_runs_in_order() {
        let (mut realm, p, inlet) = realm_with_pressure();
        let mut seq = AlgorithmSequence::new("pre");
        seq.push(Box::new(ConstantFieldAlgorithm::new(
            "a",
            p,
            vec![PartId::UNIVERSAL],
            vec![1.0],
        )));
        seq.push(Box::new(ConstantFieldAlgorithm::new("b", p, vec![inlet], vec![3.0])));
        run_driver(&mut seq, &mut realm).unwrap();
        assert_eq!(realm.mesh().real(p).unwrap(), &[1.0, 3.0, 3.0, 1.0]);
    }

    #[test]
    fn user_function_names_are_validated() {
        assert_eq!(
            UserFunction::parse("constant", &[1.0, 2.0]),
            Ok(UserFunction::Constant(vec![1.0, 2.0]))
        );
        assert!(UserFunction::parse("linear", &[0.0]).is_err());
        assert!(UserFunction::parse("taylor_vortex", &[]).is_err());
    }
}
