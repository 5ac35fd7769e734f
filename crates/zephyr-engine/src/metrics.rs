//! Per-timestep report of the nonlinear loop.
//!
//! [`TimestepReport`] captures convergence and timing data for a single
//! call to [`EquationSystems::advance_timestep`](crate::EquationSystems::advance_timestep).

/// Convergence and timing data for one timestep.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimestepReport {
    /// Step count of the realm after this step.
    pub step: u64,
    /// Nonlinear passes run.
    pub nonlinear_iterations: u32,
    /// Whether the last pass converged.
    pub converged: bool,
    /// Largest scaled norm after the last pass.
    pub max_scaled_norm: f64,
    /// Sum of norms over sum of increments after the last pass. May be
    /// non-finite when every increment is zero.
    pub mean_norm: f64,
    /// Wall-clock time of the whole step, in microseconds.
    pub total_us: u64,
    /// Per-system time spent in pre-iteration, solve, and post-iteration
    /// work: `(name, microseconds)`, in registration order.
    pub system_us: Vec<(String, u64)>,
}

impl TimestepReport {
    /// Time spent by the system named `name`.
    pub fn system_time_us(&self, name: &str) -> Option<u64> {
        self.system_us
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, us)| us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_is_empty() {
        let r = TimestepReport::default();
        assert_eq!(r.nonlinear_iterations, 0);
        assert!(!r.converged);
        assert!(r.system_us.is_empty());
        assert_eq!(r.system_time_us("MomentumEQS"), None);
    }

    #[test]
    fn system_time_is_found_by_name() {
        let r = TimestepReport {
            system_us: vec![("a".into(), 3), ("b".into(), 5)],
            ..TimestepReport::default()
        };
        assert_eq!(r.system_time_us("b"), Some(5));
    }
}
