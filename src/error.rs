use crate::{
    pipeline::Pipeline,
    plane::{PlaneId, PlaneInitError, PlaneType},
    zorder::LayerSpan,
};

/// Errors thrown by the [`PlaneManager`](crate::manager::PlaneManager)
/// and the [`PlanePool`](crate::pool::PlanePool).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The raw plane type is not handled by this manager (e.g. cursor planes)
    #[error("Plane type `{0}` is not supported")]
    UnsupportedPlaneType(u32),
    /// The raw pipeline id does not name a known display pipeline
    #[error("Invalid display pipeline `{0}`")]
    InvalidPipeline(i32),
    /// A plane failed its hardware initialization and was excluded from the pool
    #[error("Failed to initialize {plane}")]
    PlaneInit {
        /// The plane that failed
        plane: PlaneId,
        /// Underlying plane error
        #[source]
        source: PlaneInitError,
    },
    /// RGB and overlay layers are interleaved in the requested z-order
    #[error("Invalid z-order: rgb layers {rgb} interleave with overlay layers {overlay}")]
    InvalidZOrder {
        /// Positions spanned by primary and sprite layers
        rgb: LayerSpan,
        /// Positions spanned by overlay layers
        overlay: LayerSpan,
    },
    /// The requested z-order contains no layers
    #[error("The requested z-order has no layers")]
    EmptyZOrder,
    /// No free plane of the requested type is available for the pipeline
    #[error("No free {plane_type} plane available for pipeline {pipeline:?}")]
    NoFreePlane {
        /// Pipeline the plane was requested for
        pipeline: Pipeline,
        /// Requested type
        plane_type: PlaneType,
    },
    /// A layer could not be bound although the probe succeeded.
    ///
    /// All planes bound during the same assignment were released again.
    #[error("Failed to bind a {plane_type} plane to layer {position} after a successful probe")]
    InconsistentAssignment {
        /// Position of the layer in the z-order
        position: usize,
        /// Type requested by the layer
        plane_type: PlaneType,
    },
    /// The plane is not currently claimed by the given pipeline
    #[error("{plane} is not claimed by pipeline {pipeline:?}")]
    PlaneNotClaimed {
        /// The plane
        plane: PlaneId,
        /// The pipeline that tried to reclaim it
        pipeline: Pipeline,
    },
    /// The plane manager has not been initialized yet
    #[error("Plane manager is not initialized")]
    NotInitialized,
    /// The plane manager was already initialized
    #[error("Plane manager is already initialized")]
    AlreadyInitialized,
}
