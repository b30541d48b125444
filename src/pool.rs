//! Plane pool
//!
//! The pool owns every plane of the platform. Planes are created once through a
//! [`PlaneFactory`] and stay in their slot until the pool is cleared, so a [`PlaneId`] always
//! refers to the same hardware plane. Planes failing initialization leave their slot empty.
//!
//! Each plane is either free or claimed by one [`Pipeline`]. Claims are tracked per slot, the
//! free set can be snapshotted as [`FreePlanes`] to run the selection policy without touching
//! the pool.

use tracing::{debug, error, warn};

use crate::{
    config::{PlaneCounts, MAX_PLANES_PER_TYPE},
    error::Error,
    pipeline::Pipeline,
    plane::{DisplayPlane, PlaneFactory, PlaneId, PlaneType},
};

/// Snapshot of the free planes of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreePlanes {
    masks: [u32; 3],
}

impl FreePlanes {
    /// Returns true if the plane is free
    pub fn contains(&self, id: PlaneId) -> bool {
        id.index < MAX_PLANES_PER_TYPE && self.masks[id.type_.slot()] & (1 << id.index) != 0
    }

    /// Lowest indexed free plane of the given type
    pub fn first(&self, type_: PlaneType) -> Option<PlaneId> {
        let mask = self.masks[type_.slot()];
        (mask != 0).then(|| PlaneId::new(type_, mask.trailing_zeros() as usize))
    }

    /// Number of free planes of the given type
    pub fn count(&self, type_: PlaneType) -> usize {
        self.masks[type_.slot()].count_ones() as usize
    }

    pub(crate) fn insert(&mut self, id: PlaneId) {
        if id.index < MAX_PLANES_PER_TYPE {
            self.masks[id.type_.slot()] |= 1 << id.index;
        }
    }

    pub(crate) fn remove(&mut self, id: PlaneId) {
        if id.index < MAX_PLANES_PER_TYPE {
            self.masks[id.type_.slot()] &= !(1 << id.index);
        }
    }
}

#[derive(Debug)]
struct PlaneSlot {
    plane: Box<dyn DisplayPlane>,
    claimed_by: Option<Pipeline>,
    reclaimed: bool,
}

/// Fixed set of planes, partitioned by type
#[derive(Debug, Default)]
pub struct PlanePool {
    slots: [Vec<Option<PlaneSlot>>; 3],
}

impl PlanePool {
    /// Create an empty pool
    pub fn new() -> Self {
        PlanePool::default()
    }

    /// Create and initialize the planes given by `counts`.
    ///
    /// Planes the factory can not create or which fail to initialize are skipped.
    /// Returns the number of planes added.
    pub fn populate(
        &mut self,
        counts: PlaneCounts,
        buffer_count: usize,
        factory: &mut dyn PlaneFactory,
    ) -> usize {
        self.clear();

        let mut added = 0;
        for type_ in PlaneType::ALL {
            let mut count = counts.get(type_);
            if count > MAX_PLANES_PER_TYPE {
                warn!(
                    ?type_,
                    count, "Platform lists more planes than can be tracked, ignoring the excess"
                );
                count = MAX_PLANES_PER_TYPE;
            }

            let slots = &mut self.slots[type_.slot()];
            for index in 0..count {
                let slot = Self::create_plane(PlaneId::new(type_, index), buffer_count, factory);
                added += slot.is_some() as usize;
                slots.push(slot);
            }
        }
        added
    }

    fn create_plane(
        id: PlaneId,
        buffer_count: usize,
        factory: &mut dyn PlaneFactory,
    ) -> Option<PlaneSlot> {
        let mut plane = match factory.create_plane(id) {
            Ok(plane) => plane,
            Err(err) => {
                error!(%id, "Failed to create plane: {}", err);
                return None;
            }
        };

        if plane.plane_type() != id.type_ || plane.index() != id.index {
            error!(%id, created = %plane.id(), "Factory created the wrong plane, dropping it");
            plane.deinitialize();
            return None;
        }

        if let Err(source) = plane.initialize(buffer_count) {
            let err = Error::PlaneInit { plane: id, source };
            error!(%id, ?err, "Plane failed to initialize");
            plane.deinitialize();
            return None;
        }

        debug!(%id, "Plane initialized");
        Some(PlaneSlot {
            plane,
            claimed_by: None,
            reclaimed: false,
        })
    }

    /// Deinitialize and drop every plane.
    ///
    /// Safe to call on a pool that was never or only partially populated.
    pub fn clear(&mut self) {
        for slots in self.slots.iter_mut() {
            for mut slot in slots.drain(..).flatten() {
                slot.plane.deinitialize();
            }
        }
    }

    /// Number of planes of the given type present in the pool
    pub fn count(&self, type_: PlaneType) -> usize {
        self.slots[type_.slot()].iter().flatten().count()
    }

    /// Number of slots of the given type, including planes that failed to initialize
    pub fn capacity(&self, type_: PlaneType) -> usize {
        self.slots[type_.slot()].len()
    }

    /// Returns true if the pool holds no planes
    pub fn is_empty(&self) -> bool {
        PlaneType::ALL.iter().all(|type_| self.count(*type_) == 0)
    }

    fn slot(&self, id: PlaneId) -> Option<&PlaneSlot> {
        self.slots[id.type_.slot()].get(id.index)?.as_ref()
    }

    fn slot_mut(&mut self, id: PlaneId) -> Option<&mut PlaneSlot> {
        self.slots[id.type_.slot()].get_mut(id.index)?.as_mut()
    }

    /// Access a plane
    pub fn get(&self, id: PlaneId) -> Option<&dyn DisplayPlane> {
        self.slot(id).map(|slot| &*slot.plane)
    }

    pub(crate) fn get_mut(&mut self, id: PlaneId) -> Option<&mut dyn DisplayPlane> {
        self.slot_mut(id).map(|slot| &mut *slot.plane as &mut dyn DisplayPlane)
    }

    /// Pipeline currently owning the plane
    pub fn claimed_by(&self, id: PlaneId) -> Option<Pipeline> {
        self.slot(id).and_then(|slot| slot.claimed_by)
    }

    /// Returns true if the plane exists and is not claimed
    pub fn is_free(&self, id: PlaneId) -> bool {
        self.slot(id).map(|slot| slot.claimed_by.is_none()).unwrap_or(false)
    }

    /// Returns true if the plane was released by its pipeline and not yet disabled
    pub fn is_reclaimed(&self, id: PlaneId) -> bool {
        self.slot(id).map(|slot| slot.reclaimed).unwrap_or(false)
    }

    /// Snapshot of all free planes
    pub fn free_planes(&self) -> FreePlanes {
        let mut free = FreePlanes::default();
        for id in self.ids() {
            if self.is_free(id) {
                free.insert(id);
            }
        }
        free
    }

    /// Ids of all planes present in the pool
    pub fn ids(&self) -> impl Iterator<Item = PlaneId> + '_ {
        PlaneType::ALL.into_iter().flat_map(move |type_| {
            self.slots[type_.slot()]
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_some())
                .map(move |(index, _)| PlaneId::new(type_, index))
        })
    }

    /// Claim a free plane for a pipeline.
    ///
    /// Returns whether the plane was waiting to be disabled after a reclaim,
    /// or `None` if the plane does not exist or is already claimed.
    pub(crate) fn claim(&mut self, id: PlaneId, pipeline: Pipeline) -> Option<bool> {
        let slot = self.slot_mut(id)?;
        if slot.claimed_by.is_some() {
            return None;
        }
        slot.claimed_by = Some(pipeline);
        Some(std::mem::replace(&mut slot.reclaimed, false))
    }

    /// Undo a [`claim`](PlanePool::claim), restoring the reclaimed mark
    pub(crate) fn unclaim(&mut self, id: PlaneId, reclaimed: bool) {
        if let Some(slot) = self.slot_mut(id) {
            slot.claimed_by = None;
            slot.reclaimed = reclaimed;
        }
    }

    /// Release a plane claimed by `pipeline`, marking it as reclaimed
    pub(crate) fn reclaim(&mut self, id: PlaneId, pipeline: Pipeline) -> Result<(), Error> {
        match self.slot_mut(id) {
            Some(slot) if slot.claimed_by == Some(pipeline) => {
                slot.claimed_by = None;
                slot.reclaimed = true;
                Ok(())
            }
            _ => Err(Error::PlaneNotClaimed { plane: id, pipeline }),
        }
    }

    /// Release every plane claimed by `pipeline`, returns the number of planes released
    pub(crate) fn reclaim_all(&mut self, pipeline: Pipeline) -> usize {
        let mut reclaimed = 0;
        for slot in self.slots.iter_mut().flatten().flatten() {
            if slot.claimed_by == Some(pipeline) {
                slot.claimed_by = None;
                slot.reclaimed = true;
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Planes claimed by a pipeline
    pub fn claimed(&self, pipeline: Pipeline) -> impl Iterator<Item = PlaneId> + '_ {
        self.ids()
            .filter(move |id| self.claimed_by(*id) == Some(pipeline))
    }

    /// Disable every reclaimed plane that was not claimed again.
    ///
    /// Returns the number of planes disabled.
    pub(crate) fn disable_reclaimed(&mut self) -> usize {
        let mut disabled = 0;
        for slot in self.slots.iter_mut().flatten().flatten() {
            if slot.reclaimed && slot.claimed_by.is_none() {
                slot.plane.disable();
                slot.reclaimed = false;
                disabled += 1;
            }
        }
        disabled
    }
}

impl Drop for PlanePool {
    fn drop(&mut self) {
        self.clear();
    }
}
