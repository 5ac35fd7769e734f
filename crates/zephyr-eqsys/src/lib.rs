//! Equation-system capability trait and realm context for Zephyr.
//!
//! [`EquationSystem`] is the per-PDE unit: a set of lifecycle hooks with
//! defaults, backed by [`EquationSystemCore`] bookkeeping. Systems act on
//! a [`Realm`] passed into each hook, assemble through
//! [`SolverAlgorithm`]s into a [`LinearSystem`], and apply damped updates
//! with [`solution_update`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod algorithm;
pub mod assembly;
pub mod bc;
pub mod config;
pub mod error;
pub mod linsys;
pub mod overset;
pub mod realm;
pub mod system;
pub mod update;

pub use algorithm::{
    run_all, run_driver, Algorithm, AlgorithmDriver, AlgorithmSequence, ConstantFieldAlgorithm,
    CopyFieldAlgorithm, CopyStateAlgorithm, UserFunction, UserFunctionAlgorithm,
};
pub use assembly::{DirichletAssembly, SolverAlgorithm, TimeTermAssembly};
pub use bc::{
    BoundaryConditionData, NonConformalBoundaryConditionData, OversetBoundaryConditionData,
    PeriodicBoundaryConditionData, PostProcessingData, UserData,
    UserFunctionInitialConditionData,
};
pub use config::{EquationSystemKind, KindOptions, Relaxation, SolverSpecification, SystemConfig};
pub use error::{ConfigError, EquationSystemError};
pub use linsys::{
    DiagonalLinearSystem, DiagonalSolverFactory, LinearSolverFactory, LinearSystem, SolveSummary,
};
pub use overset::{NoFringeExchange, OversetExchange};
pub use realm::{NoRealmHooks, Realm, RealmHooks, TimeInfo};
pub use system::{
    EquationSystem, EquationSystemCore, EquationSystemFactory, EquationTimers,
    IterationStatistics, Lifecycle,
};
pub use update::{assemble_and_solve, solution_update};
