//! Z-order requests and validation
//!
//! A [`ZOrderConfig`] lists the layers of one frame from the bottom-most to the top-most,
//! each requesting a [`PlaneType`]. The display engine can only blend RGB planes (primary and
//! sprite) and overlay planes as two contiguous bands: every RGB layer has to be either below
//! or above every overlay layer. [`validate`] checks this before any plane gets assigned.

use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use crate::{
    error::Error,
    pipeline::Pipeline,
    plane::{PlaneId, PlaneType},
    utils::CommitSerial,
};

mod state;

pub use self::state::ZOrderState;

/// One layer of a requested z-order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZOrderLayer {
    /// Plane type requested for this layer
    pub plane_type: PlaneType,
}

impl ZOrderLayer {
    /// Create a layer requesting a plane of the given type
    pub fn new(plane_type: PlaneType) -> Self {
        ZOrderLayer { plane_type }
    }
}

/// A requested stacking order, bottom-most layer first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZOrderConfig {
    layers: SmallVec<[ZOrderLayer; 4]>,
}

impl ZOrderConfig {
    /// Create an empty z-order
    pub fn new() -> Self {
        ZOrderConfig::default()
    }

    /// Add a layer on top of the current ones
    pub fn push(&mut self, plane_type: PlaneType) {
        self.layers.push(ZOrderLayer::new(plane_type));
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if there are no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers, bottom-most first
    pub fn layers(&self) -> &[ZOrderLayer] {
        &self.layers
    }

    /// Iterate over the requested plane types, bottom-most first
    pub fn plane_types(&self) -> impl Iterator<Item = PlaneType> + '_ {
        self.layers.iter().map(|layer| layer.plane_type)
    }
}

impl FromIterator<PlaneType> for ZOrderConfig {
    fn from_iter<T: IntoIterator<Item = PlaneType>>(iter: T) -> Self {
        ZOrderConfig {
            layers: iter.into_iter().map(ZOrderLayer::new).collect(),
        }
    }
}

impl From<&[PlaneType]> for ZOrderConfig {
    fn from(types: &[PlaneType]) -> Self {
        types.iter().copied().collect()
    }
}

/// Inclusive range of layer positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSpan {
    /// Lowest position
    pub first: usize,
    /// Highest position
    pub last: usize,
}

impl LayerSpan {
    fn extend(span: Option<LayerSpan>, position: usize) -> Option<LayerSpan> {
        Some(match span {
            Some(span) => LayerSpan {
                first: span.first,
                last: position,
            },
            None => LayerSpan {
                first: position,
                last: position,
            },
        })
    }

    /// Returns true if the two spans share at least one position range
    pub fn overlaps(&self, other: &LayerSpan) -> bool {
        !(self.last < other.first || self.first > other.last)
    }
}

impl fmt::Display for LayerSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.last)
    }
}

/// Positions covered by RGB and overlay layers of a z-order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZOrderSpans {
    /// Span of primary and sprite layers, `None` if there are none
    pub rgb: Option<LayerSpan>,
    /// Span of overlay layers, `None` if there are none
    pub overlay: Option<LayerSpan>,
}

impl ZOrderSpans {
    /// Scan a z-order once and collect both spans
    pub fn of(config: &ZOrderConfig) -> Self {
        config
            .plane_types()
            .enumerate()
            .fold(ZOrderSpans::default(), |mut spans, (position, type_)| {
                if type_.is_rgb() {
                    spans.rgb = LayerSpan::extend(spans.rgb, position);
                } else {
                    spans.overlay = LayerSpan::extend(spans.overlay, position);
                }
                spans
            })
    }

    /// Returns the conflicting spans if RGB and overlay layers interleave
    pub fn conflict(&self) -> Option<(LayerSpan, LayerSpan)> {
        match (self.rgb, self.overlay) {
            (Some(rgb), Some(overlay)) if rgb.overlaps(&overlay) => Some((rgb, overlay)),
            _ => None,
        }
    }
}

/// Check whether a z-order can be realized by the hardware.
///
/// RGB and overlay layers must form two contiguous bands. A z-order lacking either class is
/// always valid.
pub fn validate(config: &ZOrderConfig) -> Result<(), Error> {
    match ZOrderSpans::of(config).conflict() {
        Some((rgb, overlay)) => Err(Error::InvalidZOrder { rgb, overlay }),
        None => Ok(()),
    }
}

/// Boolean form of [`validate`], logging rejected configurations
pub fn is_valid(pipeline: Pipeline, config: &ZOrderConfig) -> bool {
    match validate(config) {
        Ok(()) => true,
        Err(err) => {
            trace!(?pipeline, "{}", err);
            false
        }
    }
}

/// A layer position and the plane backing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneBinding {
    /// Position of the layer, 0 is bottom-most
    pub position: usize,
    /// Plane assigned to the layer
    pub plane: PlaneId,
}

/// Result of a successful [`assign_planes`](crate::manager::PlaneManager::assign_planes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneAssignment {
    pub(crate) pipeline: Pipeline,
    pub(crate) serial: CommitSerial,
    pub(crate) bindings: SmallVec<[PlaneBinding; 4]>,
}

impl PlaneAssignment {
    /// Pipeline the planes were assigned for
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// Serial of the commit that made this assignment current
    pub fn serial(&self) -> CommitSerial {
        self.serial
    }

    /// All bindings, ordered by position
    pub fn bindings(&self) -> &[PlaneBinding] {
        &self.bindings
    }

    /// Plane backing the layer at `position`
    pub fn plane_for(&self, position: usize) -> Option<PlaneId> {
        self.bindings.get(position).map(|binding| binding.plane)
    }

    /// Planes in stacking order, bottom-most first
    pub fn planes(&self) -> impl Iterator<Item = PlaneId> + '_ {
        self.bindings.iter().map(|binding| binding.plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlaneType::*;

    fn config(types: &[PlaneType]) -> ZOrderConfig {
        ZOrderConfig::from(types)
    }

    #[test]
    fn single_class_is_valid() {
        for types in [
            &[Primary][..],
            &[Sprite, Primary, Sprite][..],
            &[Overlay][..],
            &[Overlay, Overlay][..],
        ] {
            assert!(validate(&config(types)).is_ok(), "{types:?}");
        }
    }

    #[test]
    fn empty_is_valid() {
        assert!(is_valid(Pipeline::Primary, &ZOrderConfig::new()));
    }

    #[test]
    fn bands_in_either_order_are_valid() {
        assert!(is_valid(Pipeline::Primary, &config(&[Overlay, Primary])));
        assert!(is_valid(Pipeline::Primary, &config(&[Primary, Overlay])));
        assert!(is_valid(Pipeline::External, &config(&[Overlay, Overlay, Sprite, Primary])));
        assert!(is_valid(Pipeline::External, &config(&[Primary, Sprite, Overlay, Overlay])));
    }

    #[test]
    fn rgb_between_overlays_is_invalid() {
        assert!(!is_valid(Pipeline::Primary, &config(&[Overlay, Sprite, Overlay])));
    }

    #[test]
    fn overlay_between_rgb_is_invalid() {
        let err = validate(&config(&[Primary, Overlay, Sprite])).unwrap_err();
        match err {
            Error::InvalidZOrder { rgb, overlay } => {
                assert_eq!(rgb, LayerSpan { first: 0, last: 2 });
                assert_eq!(overlay, LayerSpan { first: 1, last: 1 });
            }
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn spans_track_first_and_last() {
        let spans = ZOrderSpans::of(&config(&[Overlay, Overlay, Primary, Sprite, Primary]));
        assert_eq!(spans.overlay, Some(LayerSpan { first: 0, last: 1 }));
        assert_eq!(spans.rgb, Some(LayerSpan { first: 2, last: 4 }));
        assert_eq!(spans.conflict(), None);

        let spans = ZOrderSpans::of(&config(&[Sprite]));
        assert_eq!(spans.overlay, None);
        assert_eq!(spans.rgb, Some(LayerSpan { first: 0, last: 0 }));
    }

    #[test]
    fn assignment_lookup() {
        let mut counter = crate::utils::CommitCounter::default();
        let assignment = PlaneAssignment {
            pipeline: Pipeline::Primary,
            serial: counter.next_serial(),
            bindings: [
                PlaneBinding {
                    position: 0,
                    plane: PlaneId::new(Overlay, 0),
                },
                PlaneBinding {
                    position: 1,
                    plane: PlaneId::new(Primary, 0),
                },
            ]
            .into_iter()
            .collect(),
        };
        assert_eq!(assignment.plane_for(1), Some(PlaneId::new(Primary, 0)));
        assert_eq!(assignment.plane_for(2), None);
        assert_eq!(assignment.planes().count(), 2);
    }
}
