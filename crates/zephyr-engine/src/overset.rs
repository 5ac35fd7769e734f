//! The fringe-update driver run at the start of every nonlinear pass.

use zephyr_core::FieldId;
use zephyr_eqsys::{AlgorithmDriver, EquationSystemError, Realm};

/// A field whose fringe values are refreshed before each pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OversetFieldUpdate {
    /// `StateNP1` slot of the field.
    pub field: FieldId,
    /// Rows of the per-entity block.
    pub nrows: usize,
    /// Columns of the per-entity block.
    pub ncols: usize,
}

/// Calls the realm's overset exchange for every registered field, in
/// registration order.
#[derive(Clone, Debug, Default)]
pub struct OversetUpdateDriver {
    fields: Vec<OversetFieldUpdate>,
}

impl OversetUpdateDriver {
    /// A driver with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `field`. Registering the same field twice keeps the first
    /// layout.
    pub fn register(&mut self, field: FieldId, nrows: usize, ncols: usize) {
        if self.fields.iter().any(|f| f.field == field) {
            log::debug!("overset field {field} already registered");
            return;
        }
        self.fields.push(OversetFieldUpdate {
            field,
            nrows,
            ncols,
        });
    }

    /// Registered fields.
    pub fn fields(&self) -> &[OversetFieldUpdate] {
        &self.fields
    }
}

impl AlgorithmDriver for OversetUpdateDriver {
    fn name(&self) -> &str {
        "overset_field_update"
    }

    fn execute(&mut self, realm: &mut Realm) -> Result<(), EquationSystemError> {
        let Some((exchange, mesh)) = realm.overset_and_mesh() else {
            return Ok(());
        };
        for f in &self.fields {
            exchange.update_fringe(mesh, f.field, f.nrows, f.ncols)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use zephyr_eqsys::OversetExchange;
    use zephyr_mesh::MeshDatabase;

    struct Counting(Arc<Mutex<Vec<(FieldId, usize, usize)>>>);

    impl OversetExchange for Counting {
        fn update_fringe(
            &mut self,
            _mesh: &mut MeshDatabase,
            field: FieldId,
            nrows: usize,
            ncols: usize,
        ) -> Result<(), EquationSystemError> {
            self.0.lock().unwrap().push((field, nrows, ncols));
            Ok(())
        }
    }

    #[test]
    fn updates_every_registered_field_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut realm = Realm::new(MeshDatabase::new(3), 2)
            .unwrap()
            .with_overset(Box::new(Counting(seen.clone())));
        let mut driver = OversetUpdateDriver::new();
        driver.register(FieldId(4), 1, 1);
        driver.register(FieldId(7), 3, 1);
        driver.register(FieldId(4), 9, 9);
        driver.execute(&mut realm).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(FieldId(4), 1, 1), (FieldId(7), 3, 1)]
        );
    }

    #[test]
    fn without_an_exchange_nothing_happens() {
        let mut realm = Realm::new(MeshDatabase::new(3), 2).unwrap();
        let mut driver = OversetUpdateDriver::new();
        driver.register(FieldId(0), 1, 1);
        assert!(driver.execute(&mut realm).is_ok());
    }
}
