//! Boundary-condition, initial-condition, and post-processing input data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named constant values attached to a condition, e.g.
/// `velocity: [1.0, 0.0, 0.0]` or `temperature: [300.0]`.
pub type UserData = IndexMap<String, Vec<f64>>;

/// Data for wall, inflow, open, symmetry, and ABL-top conditions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConditionData {
    /// Name of the boundary part.
    pub target_name: String,
    /// Prescribed values keyed by dof name.
    #[serde(default)]
    pub user_data: UserData,
}

impl BoundaryConditionData {
    /// Condition on `target_name` with no user data.
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            user_data: UserData::new(),
        }
    }

    /// Add a prescribed value.
    pub fn with(mut self, dof: impl Into<String>, values: Vec<f64>) -> Self {
        self.user_data.insert(dof.into(), values);
        self
    }

    /// The prescribed value for `dof`, if any.
    pub fn value(&self, dof: &str) -> Option<&[f64]> {
        self.user_data.get(dof).map(Vec::as_slice)
    }
}

/// Data for a periodic pairing of two boundary parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodicBoundaryConditionData {
    /// Master side.
    pub master: String,
    /// Slave side.
    pub slave: String,
    /// Geometric search tolerance for node matching.
    #[serde(default = "default_search_tolerance")]
    pub search_tolerance: f64,
    /// Search method name.
    #[serde(default = "default_search_method")]
    pub search_method: String,
}

fn default_search_tolerance() -> f64 {
    1.0e-8
}

fn default_search_method() -> String {
    "stk_kdtree".to_string()
}

/// Data for a non-conformal interface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NonConformalBoundaryConditionData {
    /// Parts on the current side.
    pub current_target_names: Vec<String>,
    /// Parts on the opposing side.
    pub opposing_target_names: Vec<String>,
    /// Interface user data.
    #[serde(default)]
    pub user_data: UserData,
}

/// Data for an overset mesh assembly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OversetBoundaryConditionData {
    /// Overset group names.
    #[serde(default)]
    pub mesh_groups: Vec<String>,
}

/// A user-function initial condition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFunctionInitialConditionData {
    /// Parts it applies to.
    pub target_names: Vec<String>,
    /// Field name to function name.
    #[serde(default)]
    pub function_names: IndexMap<String, String>,
    /// Field name to function parameters.
    #[serde(default)]
    pub function_params: IndexMap<String, Vec<f64>>,
}

/// A surface post-processing request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PostProcessingData {
    /// Request type, e.g. `surface_average`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Surfaces it applies to.
    pub target_names: Vec<String>,
    /// Field names to report.
    #[serde(default)]
    pub parameters: Vec<String>,
}
