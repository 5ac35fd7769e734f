//! Device-side field mirrors.
//!
//! A mirror is a copy of one real-valued state slot that accelerator
//! kernels read and write. The host side keeps a revision counter per
//! slot; a mirror records the revision it last copied. Fetching a mirror
//! through [`MeshDatabase::get_updated_ngp_field`] refreshes it when the
//! host moved on, unless the device holds unsynced modifications.
//!
//! [`MeshDatabase::get_updated_ngp_field`]: crate::MeshDatabase::get_updated_ngp_field

use zephyr_core::FieldId;

/// Device mirror of a real-valued field slot.
#[derive(Clone, Debug, PartialEq)]
pub struct NgpField {
    pub(crate) field: FieldId,
    pub(crate) values: Vec<f64>,
    pub(crate) synced_revision: u64,
    pub(crate) modified_on_device: bool,
}

impl NgpField {
    /// The host slot this mirrors.
    pub fn field(&self) -> FieldId {
        self.field
    }

    /// Device values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable device values. Call [`modify_on_device`](Self::modify_on_device)
    /// after writing so the next host sync picks the changes up.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Flag the device copy as newer than the host.
    pub fn modify_on_device(&mut self) {
        self.modified_on_device = true;
    }

    /// Whether the device holds changes not yet copied back.
    pub fn need_sync_to_host(&self) -> bool {
        self.modified_on_device
    }

    /// Host revision this mirror last matched.
    pub fn synced_revision(&self) -> u64 {
        self.synced_revision
    }
}
