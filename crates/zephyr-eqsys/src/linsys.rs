//! The linear-system seam and a point-diagonal back end.
//!
//! Equation systems assemble into a [`LinearSystem`] row by row, one row
//! per (entity, component). The back end owns residual bookkeeping: the
//! nonlinear residual is the norm of the assembled right-hand side, and
//! the scaled residual divides it by the residual of the very first solve.

use crate::error::EquationSystemError;

/// Outcome of one linear solve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolveSummary {
    /// Linear iterations taken.
    pub iterations: usize,
    /// Nonlinear residual before the solve.
    pub residual: f64,
    /// Norm of the solution increment.
    pub increment: f64,
}

/// A discrete operator plus right-hand side for one equation system.
///
/// Rows are addressed by `(entity, component)`; the back end maps them to
/// its own storage. Object-safe; equation systems hold
/// `Option<Box<dyn LinearSystem>>`.
pub trait LinearSystem: Send {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Components per entity.
    fn num_dof(&self) -> usize;

    /// Size the system for `num_entities` entities.
    fn build_graph(&mut self, num_entities: usize);

    /// Clear every row before assembly.
    fn zero_system(&mut self);

    /// Accumulate into a row.
    fn sum_into(&mut self, entity: usize, component: usize, diag: f64, rhs: f64);

    /// Replace a row by a Dirichlet constraint `delta = rhs`.
    fn set_dirichlet(&mut self, entity: usize, component: usize, rhs: f64);

    /// Finish assembly.
    fn load_complete(&mut self);

    /// Solve into `delta` (laid out `entity * num_dof + component`).
    fn solve(&mut self, delta: &mut [f64]) -> Result<SolveSummary, EquationSystemError>;

    /// Residual norm of the last solve.
    fn nonlinear_residual(&self) -> f64;

    /// Residual of the first solve ever made with this system.
    fn first_nonlinear_residual(&self) -> f64;

    /// `nonlinear_residual / first_nonlinear_residual`.
    fn scaled_nonlinear_residual(&self) -> f64;

    /// Norm of the last solution increment.
    fn linear_solution_increment(&self) -> f64;
}

/// Creates linear systems from solver block names.
pub trait LinearSolverFactory: Send {
    /// Build a system for `system_name` configured by `block_name`.
    fn create(&self, system_name: &str, block_name: &str, num_dof: usize) -> Box<dyn LinearSystem>;
}

// ── DiagonalLinearSystem ───────────────────────────────────────────

/// Point-diagonal back end: `delta = rhs / diag` row by row.
#[derive(Clone, Debug)]
pub struct DiagonalLinearSystem {
    name: String,
    block: String,
    num_dof: usize,
    diag: Vec<f64>,
    rhs: Vec<f64>,
    fixed: Vec<bool>,
    first_residual: Option<f64>,
    residual: f64,
    scaled_residual: f64,
    increment: f64,
}

impl DiagonalLinearSystem {
    /// Create an unsized system. Call [`LinearSystem::build_graph`] first.
    pub fn new(name: impl Into<String>, block: impl Into<String>, num_dof: usize) -> Self {
        Self {
            name: name.into(),
            block: block.into(),
            num_dof,
            diag: Vec::new(),
            rhs: Vec::new(),
            fixed: Vec::new(),
            first_residual: None,
            residual: 0.0,
            scaled_residual: 0.0,
            increment: 0.0,
        }
    }

    /// Solver block this system was created from.
    pub fn block(&self) -> &str {
        &self.block
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rhs.len()
    }

    fn row(&self, entity: usize, component: usize) -> usize {
        entity * self.num_dof + component
    }
}

impl LinearSystem for DiagonalLinearSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_dof(&self) -> usize {
        self.num_dof
    }

    fn build_graph(&mut self, num_entities: usize) {
        let rows = num_entities * self.num_dof;
        self.diag = vec![0.0; rows];
        self.rhs = vec![0.0; rows];
        self.fixed = vec![false; rows];
    }

    fn zero_system(&mut self) {
        self.diag.fill(0.0);
        self.rhs.fill(0.0);
        self.fixed.fill(false);
    }

    fn sum_into(&mut self, entity: usize, component: usize, diag: f64, rhs: f64) {
        let r = self.row(entity, component);
        if r < self.rhs.len() && !self.fixed[r] {
            self.diag[r] += diag;
            self.rhs[r] += rhs;
        }
    }

    fn set_dirichlet(&mut self, entity: usize, component: usize, rhs: f64) {
        let r = self.row(entity, component);
        if r < self.rhs.len() {
            self.diag[r] = 1.0;
            self.rhs[r] = rhs;
            self.fixed[r] = true;
        }
    }

    fn load_complete(&mut self) {}

    fn solve(&mut self, delta: &mut [f64]) -> Result<SolveSummary, EquationSystemError> {
        if delta.len() != self.rhs.len() {
            return Err(EquationSystemError::LinearSolve {
                system: self.name.clone(),
                reason: format!(
                    "solution has {} rows, system has {}",
                    delta.len(),
                    self.rhs.len()
                ),
            });
        }
        self.residual = self.rhs.iter().map(|r| r * r).sum::<f64>().sqrt();
        let first = *self.first_residual.get_or_insert(self.residual);
        self.scaled_residual = self.residual / first.max(f64::EPSILON);

        for ((d, &a), &b) in delta.iter_mut().zip(&self.diag).zip(&self.rhs) {
            *d = if a != 0.0 { b / a } else { 0.0 };
        }
        self.increment = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
        Ok(SolveSummary {
            iterations: 1,
            residual: self.residual,
            increment: self.increment,
        })
    }

    fn nonlinear_residual(&self) -> f64 {
        self.residual
    }

    fn first_nonlinear_residual(&self) -> f64 {
        self.first_residual.unwrap_or(0.0)
    }

    fn scaled_nonlinear_residual(&self) -> f64 {
        self.scaled_residual
    }

    fn linear_solution_increment(&self) -> f64 {
        self.increment
    }
}

/// Factory for [`DiagonalLinearSystem`]s. Ignores solver block contents.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiagonalSolverFactory;

impl LinearSolverFactory for DiagonalSolverFactory {
    fn create(&self, system_name: &str, block_name: &str, num_dof: usize) -> Box<dyn LinearSystem> {
        Box::new(DiagonalLinearSystem::new(system_name, block_name, num_dof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_solve_divides_rows() {
        let mut sys = DiagonalLinearSystem::new("t", "solve_scalar", 2);
        sys.build_graph(2);
        sys.zero_system();
        sys.sum_into(0, 0, 2.0, 4.0);
        sys.sum_into(0, 1, 1.0, -1.0);
        sys.sum_into(1, 0, 4.0, 2.0);
        sys.set_dirichlet(1, 1, 3.0);
        sys.sum_into(1, 1, 100.0, 100.0);
        sys.load_complete();
        let mut delta = vec![0.0; 4];
        let summary = sys.solve(&mut delta).unwrap();
        assert_eq!(delta, vec![2.0, -1.0, 0.5, 3.0]);
        assert_eq!(summary.iterations, 1);
        assert!((sys.scaled_nonlinear_residual() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scaled_residual_is_relative_to_first_solve() {
        let mut sys = DiagonalLinearSystem::new("t", "b", 1);
        sys.build_graph(1);
        sys.sum_into(0, 0, 1.0, 10.0);
        let mut delta = vec![0.0];
        sys.solve(&mut delta).unwrap();
        sys.zero_system();
        sys.sum_into(0, 0, 1.0, 1.0);
        sys.solve(&mut delta).unwrap();
        assert!((sys.scaled_nonlinear_residual() - 0.1).abs() < 1e-12);
        assert_eq!(sys.first_nonlinear_residual(), 10.0);
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mut sys = DiagonalLinearSystem::new("t", "b", 1);
        sys.build_graph(3);
        let mut delta = vec![0.0; 2];
        assert!(matches!(
            sys.solve(&mut delta),
            Err(EquationSystemError::LinearSolve { .. })
        ));
    }
}
