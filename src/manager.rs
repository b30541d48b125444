//! Plane manager
//!
//! The [`PlaneManager`] owns the [`PlanePool`] of a display engine and one [`ZOrderState`]
//! per scan-out pipeline. For every frame the caller builds a [`ZOrderConfig`], checks it with
//! [`PlaneManager::is_valid_zorder`] and hands it to [`PlaneManager::assign_planes`], which
//! picks a plane for every layer, enables it and commits the new stacking order.
//!
//! ```rust,ignore
//! use hwc_planes::{PlaneManager, PlaneManagerConfig, Pipeline, PlaneType, ZOrderConfig};
//!
//! let mut manager = PlaneManager::new(PlaneManagerConfig::default(), my_factory);
//! manager.initialize()?;
//!
//! let config: ZOrderConfig = [PlaneType::Overlay, PlaneType::Primary].into_iter().collect();
//! if manager.is_valid_zorder(Pipeline::Primary, &config) {
//!     // release the planes of the previous frame first
//!     manager.reclaim_planes(Pipeline::Primary);
//!     let assignment = manager.assign_planes(Pipeline::Primary, &config)?;
//!     manager.disable_reclaimed_planes();
//!     for binding in assignment.bindings() {
//!         // attach the layer's buffer to `binding.plane`
//!     }
//! }
//! ```
//!
//! ## Plane selection
//!
//! Every pipeline prefers the planes sharing its index (pipe A uses primary A and overlay A,
//! pipe B primary B and overlay C). Primary planes never move between pipelines, overlay planes
//! are borrowed from the other pipeline while idle and sprite planes are shared freely.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, error, info, info_span, instrument, trace, warn};

use crate::{
    config::PlaneManagerConfig,
    error::Error,
    pipeline::Pipeline,
    plane::{DisplayPlane, PlaneFactory, PlaneId, PlaneType},
    pool::{FreePlanes, PlanePool},
    utils::CommitCounter,
    zorder::{self, PlaneAssignment, PlaneBinding, ZOrderConfig, ZOrderState},
};

/// Selection policy: pick a free plane of `plane_type` for `pipeline` out of `free`.
///
/// Does not log, so it can be used for dry runs.
fn select_plane(pipeline: Pipeline, plane_type: PlaneType, free: &FreePlanes) -> Option<PlaneId> {
    let index = pipeline.preferred_index()?;

    match plane_type {
        PlaneType::Primary => Some(PlaneId::new(PlaneType::Primary, index)).filter(|id| free.contains(*id)),
        PlaneType::Sprite => free.first(PlaneType::Sprite),
        PlaneType::Overlay => [index, 1 - index]
            .into_iter()
            .map(|index| PlaneId::new(PlaneType::Overlay, index))
            .find(|id| free.contains(*id)),
    }
}

/// Planes touched by an allocation pass, used to roll it back
#[derive(Debug)]
struct Claimed {
    plane: PlaneId,
    was_reclaimed: bool,
    was_enabled: bool,
}

/// Assigns hardware planes to z-ordered layers
pub struct PlaneManager<F: PlaneFactory> {
    config: PlaneManagerConfig,
    factory: F,
    pool: PlanePool,
    initialized: bool,
    zorder: IndexMap<Pipeline, ZOrderState>,
    commits: CommitCounter,
    span: tracing::Span,
}

impl<F: PlaneFactory> fmt::Debug for PlaneManager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaneManager")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("initialized", &self.initialized)
            .field("zorder", &self.zorder)
            .finish_non_exhaustive()
    }
}

impl<F: PlaneFactory> PlaneManager<F> {
    /// Create a new manager.
    ///
    /// Environment overrides are applied to `config` once, here. No plane is created until
    /// [`initialize`](PlaneManager::initialize) is called.
    pub fn new(config: PlaneManagerConfig, factory: F) -> Self {
        Self::with_exact_config(config.with_env_overrides(), factory)
    }

    /// Create a new manager using `config` as given, ignoring the environment
    pub fn with_exact_config(config: PlaneManagerConfig, factory: F) -> Self {
        let span = info_span!(
            parent: None,
            "plane_manager",
            platform = ?config.platform,
        );

        PlaneManager {
            config,
            factory,
            pool: PlanePool::new(),
            initialized: false,
            zorder: IndexMap::new(),
            commits: CommitCounter::default(),
            span,
        }
    }

    /// Create all planes of the configured platform.
    ///
    /// Planes failing to initialize are left out; this is logged but not an error.
    #[instrument(parent = &self.span, skip_all)]
    pub fn initialize(&mut self) -> Result<(), Error> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }

        let counts = self.config.counts;
        let added = self
            .pool
            .populate(counts, self.config.buffer_count, &mut self.factory);

        for type_ in PlaneType::ALL {
            if counts.get(type_) > 0 && self.pool.count(type_) == 0 {
                warn!(?type_, "No plane of this type could be initialized");
            }
        }

        self.zorder = Pipeline::SCANOUT
            .into_iter()
            .map(|pipeline| (pipeline, ZOrderState::new(pipeline)))
            .collect();
        self.initialized = true;
        info!(added, expected = counts.total(), "Plane manager initialized");
        Ok(())
    }

    /// Release all planes.
    ///
    /// Can be called at any time, also after a failed or without any
    /// [`initialize`](PlaneManager::initialize).
    #[instrument(parent = &self.span, skip_all)]
    pub fn deinitialize(&mut self) {
        self.pool.clear();
        self.zorder.clear();
        if std::mem::replace(&mut self.initialized, false) {
            info!("Plane manager deinitialized");
        }
    }

    /// Returns true between [`initialize`](PlaneManager::initialize) and
    /// [`deinitialize`](PlaneManager::deinitialize)
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Active configuration, including environment overrides
    pub fn config(&self) -> &PlaneManagerConfig {
        &self.config
    }

    /// The plane pool
    pub fn pool(&self) -> &PlanePool {
        &self.pool
    }

    /// Access a plane, e.g. to attach a buffer after assignment
    pub fn plane(&self, id: PlaneId) -> Option<&dyn DisplayPlane> {
        self.pool.get(id)
    }

    /// Mutable access to a plane
    pub fn plane_mut(&mut self, id: PlaneId) -> Option<&mut dyn DisplayPlane> {
        self.pool.get_mut(id)
    }

    /// Check whether the hardware can realize a z-order.
    ///
    /// RGB layers (primary and sprite) and overlay layers must not interleave.
    /// This does not touch any plane state.
    pub fn is_valid_zorder(&self, pipeline: Pipeline, config: &ZOrderConfig) -> bool {
        let _guard = self.span.enter();
        zorder::is_valid(pipeline, config)
    }

    /// Like [`is_valid_zorder`](PlaneManager::is_valid_zorder), returning the conflicting spans
    pub fn validate_zorder(&self, config: &ZOrderConfig) -> Result<(), Error> {
        zorder::validate(config)
    }

    /// Returns true if a free plane of the given type can be used by the pipeline
    pub fn has_free_plane(&self, pipeline: Pipeline, plane_type: PlaneType) -> bool {
        self.initialized && select_plane(pipeline, plane_type, &self.pool.free_planes()).is_some()
    }

    /// Pick the free plane the pipeline would get for a layer of the given type.
    ///
    /// The plane is not claimed. Returns `None` if the manager is not initialized, the
    /// pipeline has no planes or no suitable plane is free.
    pub fn get_plane_helper(&self, pipeline: Pipeline, plane_type: PlaneType) -> Option<PlaneId> {
        let _guard = self.span.enter();
        if !self.initialized {
            error!("Plane manager is not initialized");
            return None;
        }
        if !pipeline.supports_planes() {
            error!(?pipeline, "Invalid display pipeline");
            return None;
        }
        select_plane(pipeline, plane_type, &self.pool.free_planes())
    }

    /// Assign a plane to every layer of a validated z-order and commit it.
    ///
    /// Runs in three passes:
    /// - a read-only probe making sure every layer can get a plane,
    /// - the allocation, claiming and enabling one plane per layer bottom to top,
    /// - the commit, handing the new order to every plane and storing it as the
    ///   pipeline's [`ZOrderState`].
    ///
    /// A z-order consisting of one sprite layer is served by the pipeline's primary plane if
    /// [`promote_single_sprite`](PlaneManagerConfig::promote_single_sprite) is set and that
    /// plane is free.
    ///
    /// The z-order is not validated again. On error no plane state was changed.
    #[profiling::function]
    #[instrument(level = "trace", parent = &self.span, skip(self, config), fields(layers = config.len()))]
    pub fn assign_planes(
        &mut self,
        pipeline: Pipeline,
        config: &ZOrderConfig,
    ) -> Result<PlaneAssignment, Error> {
        if !self.initialized {
            error!("Plane manager is not initialized");
            return Err(Error::NotInitialized);
        }
        if !pipeline.supports_planes() {
            error!(?pipeline, "Invalid display pipeline");
            return Err(Error::InvalidPipeline(pipeline.into()));
        }
        if config.is_empty() {
            return Err(Error::EmptyZOrder);
        }

        self.probe(pipeline, config)?;

        let mut types: SmallVec<[PlaneType; 4]> = config.plane_types().collect();
        if self.config.promote_single_sprite
            && types[..] == [PlaneType::Sprite]
            && self.has_free_plane(pipeline, PlaneType::Primary)
        {
            debug!("Serving single sprite layer with the primary plane");
            types[0] = PlaneType::Primary;
        }

        let bindings = self.allocate(pipeline, &types)?;
        let serial = self.commits.next_serial();

        let state = self
            .zorder
            .entry(pipeline)
            .or_insert_with(|| ZOrderState::new(pipeline));
        for binding in &bindings {
            // enabled above, so the plane exists
            if let Some(plane) = self.pool.get_mut(binding.plane) {
                plane.set_zorder_config(&bindings, state);
            }
        }
        state.commit(&bindings, serial);

        trace!(?serial, planes = ?bindings.iter().map(|b| b.plane).collect::<Vec<_>>(), "Committed z-order");
        Ok(PlaneAssignment {
            pipeline,
            serial,
            bindings,
        })
    }

    fn probe(&self, pipeline: Pipeline, config: &ZOrderConfig) -> Result<(), Error> {
        let mut free = self.pool.free_planes();
        for plane_type in config.plane_types() {
            match select_plane(pipeline, plane_type, &free) {
                Some(id) => free.remove(id),
                None => {
                    debug!(?pipeline, ?plane_type, "No plane available");
                    return Err(Error::NoFreePlane { pipeline, plane_type });
                }
            }
        }
        Ok(())
    }

    fn allocate(
        &mut self,
        pipeline: Pipeline,
        types: &[PlaneType],
    ) -> Result<SmallVec<[PlaneBinding; 4]>, Error> {
        let mut claimed: SmallVec<[Claimed; 4]> = SmallVec::new();

        for (position, plane_type) in types.iter().copied().enumerate() {
            let plane = select_plane(pipeline, plane_type, &self.pool.free_planes());
            let was_reclaimed = plane.and_then(|id| self.pool.claim(id, pipeline));

            let (Some(id), Some(was_reclaimed)) = (plane, was_reclaimed) else {
                error!(position, ?plane_type, "Failed to assign plane, rolling back");
                self.rollback(&claimed);
                return Err(Error::InconsistentAssignment { position, plane_type });
            };

            // planes have to be enabled before their z-order is programmed,
            // also when still enabled from a previous frame
            let mut was_enabled = false;
            if let Some(plane) = self.pool.get_mut(id) {
                was_enabled = plane.is_enabled();
                plane.enable();
            }
            trace!(position, %id, "Plane assigned");

            claimed.push(Claimed {
                plane: id,
                was_reclaimed,
                was_enabled,
            });
        }

        Ok(claimed
            .iter()
            .enumerate()
            .map(|(position, claimed)| PlaneBinding {
                position,
                plane: claimed.plane,
            })
            .collect())
    }

    fn rollback(&mut self, claimed: &[Claimed]) {
        for claimed in claimed.iter().rev() {
            if !claimed.was_enabled {
                if let Some(plane) = self.pool.get_mut(claimed.plane) {
                    plane.disable();
                }
            }
            self.pool.unclaim(claimed.plane, claimed.was_reclaimed);
        }
    }

    /// Last committed z-order of a pipeline.
    ///
    /// Returns `None` before initialization and for pipelines without planes.
    pub fn zorder_state(&self, pipeline: Pipeline) -> Option<&ZOrderState> {
        self.zorder.get(&pipeline)
    }

    /// Return a plane claimed by `pipeline` to the free planes.
    ///
    /// The plane stays enabled until [`disable_reclaimed_planes`](PlaneManager::disable_reclaimed_planes)
    /// is called, unless it is assigned again before that.
    pub fn reclaim_plane(&mut self, pipeline: Pipeline, plane: PlaneId) -> Result<(), Error> {
        let _guard = self.span.enter();
        self.pool.reclaim(plane, pipeline).map_err(|err| {
            warn!(?pipeline, %plane, "Failed to reclaim plane");
            err
        })
    }

    /// Return all planes claimed by `pipeline`, see [`reclaim_plane`](PlaneManager::reclaim_plane).
    ///
    /// Returns the number of planes reclaimed.
    pub fn reclaim_planes(&mut self, pipeline: Pipeline) -> usize {
        let _guard = self.span.enter();
        let reclaimed = self.pool.reclaim_all(pipeline);
        if reclaimed > 0 {
            trace!(?pipeline, reclaimed, "Reclaimed planes");
        }
        reclaimed
    }

    /// Disable all reclaimed planes that were not assigned again
    pub fn disable_reclaimed_planes(&mut self) -> usize {
        let _guard = self.span.enter();
        let disabled = self.pool.disable_reclaimed();
        if disabled > 0 {
            trace!(disabled, "Disabled reclaimed planes");
        }
        disabled
    }
}

impl<F: PlaneFactory> Drop for PlaneManager<F> {
    fn drop(&mut self) {
        self.deinitialize();
    }
}
