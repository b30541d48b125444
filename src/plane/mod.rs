//! Hardware plane abstraction
//!
//! The display engine exposes a fixed set of compositing planes. Each plane belongs to one
//! of three classes, described by [`PlaneType`], and is numbered per class. Programming the
//! plane registers is up to the [`DisplayPlane`] implementation; this crate only decides which
//! plane backs which layer and in which order the planes are stacked.
//!
//! Concrete planes are created through a [`PlaneFactory`], which is handed the [`PlaneId`] of
//! every plane the platform provides. Any `FnMut(PlaneId) -> Result<Box<dyn DisplayPlane>, Error>`
//! closure can be used as a factory.

use std::fmt;

use crate::{
    error::Error,
    zorder::{PlaneBinding, ZOrderState},
};

#[cfg(any(test, feature = "plane_test"))]
pub mod test;

/// Error type returned by [`DisplayPlane::initialize`]
pub type PlaneInitError = Box<dyn std::error::Error + Send + Sync>;

/// Class of a hardware plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlaneType {
    /// Full screen RGB plane, one per pipe
    Primary,
    /// Additional RGB plane, shared between pipes
    Sprite,
    /// YUV capable plane with its own scaler
    Overlay,
}

impl PlaneType {
    /// All plane types, in the order planes are created
    pub const ALL: [PlaneType; 3] = [PlaneType::Primary, PlaneType::Sprite, PlaneType::Overlay];

    /// Returns true for planes that scan out RGB framebuffers (primary and sprite)
    pub fn is_rgb(self) -> bool {
        matches!(self, PlaneType::Primary | PlaneType::Sprite)
    }

    /// Returns true for overlay planes
    pub fn is_overlay(self) -> bool {
        matches!(self, PlaneType::Overlay)
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            PlaneType::Primary => 0,
            PlaneType::Sprite => 1,
            PlaneType::Overlay => 2,
        }
    }
}

// Raw values as used by hardware composer callers
const RAW_SPRITE: u32 = 0;
const RAW_OVERLAY: u32 = 1;
const RAW_PRIMARY: u32 = 2;

impl TryFrom<u32> for PlaneType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            RAW_SPRITE => Ok(PlaneType::Sprite),
            RAW_OVERLAY => Ok(PlaneType::Overlay),
            RAW_PRIMARY => Ok(PlaneType::Primary),
            // cursor planes and anything newer are not managed here
            x => Err(Error::UnsupportedPlaneType(x)),
        }
    }
}

impl From<PlaneType> for u32 {
    fn from(type_: PlaneType) -> u32 {
        match type_ {
            PlaneType::Sprite => RAW_SPRITE,
            PlaneType::Overlay => RAW_OVERLAY,
            PlaneType::Primary => RAW_PRIMARY,
        }
    }
}

impl fmt::Display for PlaneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaneType::Primary => "primary",
            PlaneType::Sprite => "sprite",
            PlaneType::Overlay => "overlay",
        })
    }
}

/// Identity of a physical plane: its type and its index within that type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId {
    /// Type of the plane
    pub type_: PlaneType,
    /// Type-local index of the plane
    pub index: usize,
}

impl PlaneId {
    /// Create a new plane id
    pub fn new(type_: PlaneType, index: usize) -> Self {
        PlaneId { type_, index }
    }
}

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} plane {}", self.type_, self.index)
    }
}

/// A hardware compositing plane
///
/// Implementations program the plane registers. All methods are called from the thread
/// owning the [`PlaneManager`](crate::manager::PlaneManager).
pub trait DisplayPlane: fmt::Debug + Send {
    /// Identity of this plane
    fn id(&self) -> PlaneId;

    /// Type of this plane
    fn plane_type(&self) -> PlaneType {
        self.id().type_
    }

    /// Type-local index of this plane
    fn index(&self) -> usize {
        self.id().index
    }

    /// Initialize the hardware backing this plane with `buffer_count` data buffers.
    ///
    /// Planes failing to initialize are not added to the pool.
    fn initialize(&mut self, buffer_count: usize) -> Result<(), PlaneInitError>;

    /// Release all hardware resources of this plane.
    ///
    /// Also called for planes whose [`initialize`](DisplayPlane::initialize) failed.
    fn deinitialize(&mut self);

    /// Turn on scan-out for this plane
    fn enable(&mut self);

    /// Turn off scan-out for this plane
    fn disable(&mut self);

    /// Returns whether scan-out is currently turned on
    fn is_enabled(&self) -> bool;

    /// Program the z-order of this plane.
    ///
    /// `bindings` is the complete new stacking order, bottom-most first. `state` holds the
    /// previously committed order of the pipeline and may be used to store per-plane register
    /// values. The manager overwrites the committed order once every plane was programmed.
    fn set_zorder_config(&mut self, bindings: &[PlaneBinding], state: &mut ZOrderState);
}

/// Creates the concrete planes of a platform
pub trait PlaneFactory {
    /// Create the plane identified by `id`.
    ///
    /// Return [`Error::UnsupportedPlaneType`] if this factory can not build planes of that type.
    fn create_plane(&mut self, id: PlaneId) -> Result<Box<dyn DisplayPlane>, Error>;
}

impl<F> PlaneFactory for F
where
    F: FnMut(PlaneId) -> Result<Box<dyn DisplayPlane>, Error>,
{
    fn create_plane(&mut self, id: PlaneId) -> Result<Box<dyn DisplayPlane>, Error> {
        self(id)
    }
}
