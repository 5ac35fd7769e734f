//! Integration test: default hook behavior and realm forwarding on a
//! channel mesh.

use zephyr_core::{FieldState, FieldType, PartId, ScalarField, Topology};
use zephyr_eqsys::{
    run_all, Algorithm, AlgorithmDriver, BoundaryConditionData, ConstantFieldAlgorithm,
    CopyStateAlgorithm, EquationSystem, EquationSystemCore, EquationSystemError, Realm,
};
use zephyr_test_utils::{channel_realm, CallLog, RecordingRealmHooks};

struct Plain {
    core: EquationSystemCore,
    log: CallLog,
}

impl Plain {
    fn new(log: CallLog) -> Self {
        Self {
            core: EquationSystemCore::new("HeatCondEQS", "HeatCondEQS", "temperature"),
            log,
        }
    }
}

impl EquationSystem for Plain {
    fn core(&self) -> &EquationSystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EquationSystemCore {
        &mut self.core
    }

    fn register_symmetry_bc(
        &mut self,
        _realm: &mut Realm,
        _part: PartId,
        _topology: Topology,
        data: &BoundaryConditionData,
    ) -> Result<(), EquationSystemError> {
        self.log.push(format!("symmetry:{}", data.target_name));
        Ok(())
    }
}

struct Driver {
    name: &'static str,
    log: CallLog,
}

impl AlgorithmDriver for Driver {
    fn name(&self) -> &str {
        self.name
    }

    fn pre_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.log.push(format!("{}.pre", self.name));
        Ok(())
    }

    fn execute(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.log.push(format!("{}.execute", self.name));
        Ok(())
    }

    fn post_work(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.log.push(format!("{}.post", self.name));
        Ok(())
    }
}

struct Step {
    name: &'static str,
    fails: bool,
    log: CallLog,
}

impl Algorithm for Step {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&mut self, _realm: &mut Realm) -> Result<(), EquationSystemError> {
        self.log.push(self.name);
        if self.fails {
            return Err(EquationSystemError::AlgorithmFailed {
                name: self.name.to_string(),
                reason: "scripted".to_string(),
            });
        }
        Ok(())
    }
}

#[test]
fn realm_registrations_reach_the_hooks_by_part_name() {
    let log = CallLog::new();
    let (realm, channel) = channel_realm(2, 2);
    let mut realm = realm.with_hooks(Box::new(RecordingRealmHooks::new(log.clone())));
    let wall = realm.mesh().part(channel.wall).unwrap().subsets()[0];

    realm.register_nodal_fields(channel.block).unwrap();
    realm.register_interior_algorithm(channel.block);
    realm.register_wall_bc(wall, Topology::Quad4, &BoundaryConditionData::new("wall"));
    realm.register_periodic_bc(channel.inflow, channel.outflow, 1e-8, "stk_kdtree");

    assert_eq!(
        log.entries(),
        vec![
            "realm.register_nodal_fields:block_1",
            "realm.register_interior_algorithm:block_1",
            "realm.register_wall_bc:surface_3_quad4",
            "realm.register_periodic_bc:inflow:outflow",
        ]
    );
}

#[test]
fn default_initial_work_sets_conditions_then_copies_states() {
    let (mut realm, channel) = channel_realm(2, 2);
    let fm = realm.field_manager();
    let t: ScalarField = fm
        .register_field(
            realm.mesh_mut(),
            "temperature",
            &[channel.block],
            None,
            FieldState::NONE,
        )
        .unwrap();
    let mut sys = Plain::new(CallLog::new());
    sys.core_mut()
        .initial_condition_algorithms
        .push(Box::new(ConstantFieldAlgorithm::new(
            "ic",
            t.id(),
            vec![channel.block],
            vec![273.0],
        )));
    sys.core_mut()
        .copy_state_algorithms
        .push(Box::new(CopyStateAlgorithm::new(
            t.id(),
            FieldState::NP1,
            FieldState::N,
        )));

    sys.initial_work(&mut realm).unwrap();

    let old = realm.mesh().field_of_state(t.id(), FieldState::N).unwrap();
    assert!(realm.mesh().real(old).unwrap().iter().all(|&v| v == 273.0));
    assert!(realm.mesh().real(t.id()).unwrap().iter().all(|&v| v == 273.0));
}

#[test]
fn iteration_drivers_run_pre_execute_post_in_registration_order() {
    let log = CallLog::new();
    let (mut realm, _) = channel_realm(1, 2);
    let mut sys = Plain::new(log.clone());
    for name in ["first", "second"] {
        sys.core_mut().pre_iter_drivers.push(Box::new(Driver {
            name,
            log: log.clone(),
        }));
    }
    sys.core_mut().post_iter_drivers.push(Box::new(Driver {
        name: "after",
        log: log.clone(),
    }));

    sys.pre_iter_work(&mut realm).unwrap();
    sys.post_iter_work(&mut realm).unwrap();

    assert_eq!(
        log.entries(),
        vec![
            "first.pre",
            "first.execute",
            "first.post",
            "second.pre",
            "second.execute",
            "second.post",
            "after.pre",
            "after.execute",
            "after.post",
        ]
    );
}

#[test]
fn run_all_stops_at_the_first_failure() {
    let log = CallLog::new();
    let (mut realm, _) = channel_realm(1, 2);
    let mut algorithms: Vec<Box<dyn Algorithm>> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            Box::new(Step {
                name,
                fails: name == "b",
                log: log.clone(),
            }) as Box<dyn Algorithm>
        })
        .collect();

    let err = run_all(&mut algorithms, &mut realm).unwrap_err();

    assert!(matches!(err, EquationSystemError::AlgorithmFailed { name, .. } if name == "b"));
    assert_eq!(log.entries(), vec!["a", "b"]);
}

#[test]
fn abltop_defaults_to_symmetry() {
    let log = CallLog::new();
    let (mut realm, channel) = channel_realm(1, 2);
    let top = realm.mesh().part(channel.top).unwrap().subsets()[0];
    let mut sys = Plain::new(log.clone());

    sys.register_abltop_bc(&mut realm, top, Topology::Quad4, &BoundaryConditionData::new("top"))
        .unwrap();

    assert_eq!(log.entries(), vec!["symmetry:top"]);
}

#[test]
fn surface_post_processing_parts_are_recorded_once() {
    let (mut realm, channel) = channel_realm(1, 2);
    let mut sys = Plain::new(CallLog::new());
    let data = zephyr_eqsys::PostProcessingData::default();

    sys.register_surface_pp_algorithm(&mut realm, &data, &[channel.wall, channel.top])
        .unwrap();
    sys.register_surface_pp_algorithm(&mut realm, &data, &[channel.wall])
        .unwrap();

    assert_eq!(sys.core().surface_pp_parts, vec![channel.wall, channel.top]);
}
