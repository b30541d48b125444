use indexmap::IndexMap;
use smallvec::SmallVec;

use super::PlaneBinding;
use crate::{pipeline::Pipeline, plane::PlaneId, utils::CommitSerial};

/// Last committed z-order of one pipeline.
///
/// Plane implementations receive this state while a new z-order is programmed. The committed
/// order is only replaced after every plane of the new order saw it, so planes can compute
/// register deltas against the previous frame. The per-plane data slots are opaque to this crate.
#[derive(Debug, Clone)]
pub struct ZOrderState {
    pipeline: Pipeline,
    serial: Option<CommitSerial>,
    order: SmallVec<[PlaneId; 4]>,
    plane_data: IndexMap<PlaneId, u64>,
}

impl ZOrderState {
    pub(crate) fn new(pipeline: Pipeline) -> Self {
        ZOrderState {
            pipeline,
            serial: None,
            order: SmallVec::new(),
            plane_data: IndexMap::new(),
        }
    }

    /// Pipeline this state belongs to
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// Serial of the last commit, `None` if nothing was committed yet
    pub fn serial(&self) -> Option<CommitSerial> {
        self.serial
    }

    /// Planes of the last committed z-order, bottom-most first
    pub fn committed_order(&self) -> &[PlaneId] {
        &self.order
    }

    /// Position of a plane in the last committed z-order
    pub fn position_of(&self, plane: PlaneId) -> Option<usize> {
        self.order.iter().position(|p| *p == plane)
    }

    /// Data stored by a plane implementation
    pub fn plane_data(&self, plane: PlaneId) -> Option<u64> {
        self.plane_data.get(&plane).copied()
    }

    /// Store data for a plane, e.g. the register value written for it
    pub fn set_plane_data(&mut self, plane: PlaneId, data: u64) {
        self.plane_data.insert(plane, data);
    }

    pub(crate) fn commit(&mut self, bindings: &[PlaneBinding], serial: CommitSerial) {
        self.order = bindings.iter().map(|binding| binding.plane).collect();
        let order = &self.order;
        self.plane_data.retain(|plane, _| order.contains(plane));
        self.serial = Some(serial);
    }
}
