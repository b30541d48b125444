//! Platform plane tables and manager configuration

use crate::plane::PlaneType;

/// Environment variable disabling the single sprite to primary promotion
pub const NO_SPRITE_PROMOTION_ENV: &str = "HWC_PLANES_NO_SPRITE_PROMOTION";

/// Number of data buffers every plane is initialized with
pub const MIN_DATA_BUFFER_COUNT: usize = 1;

/// Upper bound of planes per type the pool can track
pub const MAX_PLANES_PER_TYPE: usize = 32;

/// Number of physical planes per type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaneCounts {
    /// Primary planes
    pub primary: usize,
    /// Sprite planes
    pub sprite: usize,
    /// Overlay planes
    pub overlay: usize,
}

impl PlaneCounts {
    /// Number of planes of the given type
    pub fn get(&self, type_: PlaneType) -> usize {
        match type_ {
            PlaneType::Primary => self.primary,
            PlaneType::Sprite => self.sprite,
            PlaneType::Overlay => self.overlay,
        }
    }

    /// Total number of planes
    pub fn total(&self) -> usize {
        self.primary + self.sprite + self.overlay
    }
}

/// Display engines with a known plane layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Tangier: primary A, B and C, sprite D, overlay A and C
    Tangier,
}

impl Platform {
    /// Plane layout of this platform
    pub fn plane_counts(self) -> PlaneCounts {
        match self {
            Platform::Tangier => PlaneCounts {
                primary: 3,
                sprite: 1,
                overlay: 2,
            },
        }
    }
}

/// Configuration of a [`PlaneManager`](crate::manager::PlaneManager)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneManagerConfig {
    /// Platform the counts were taken from, `None` for custom layouts
    pub platform: Option<Platform>,
    /// Planes to create per type
    pub counts: PlaneCounts,
    /// Data buffers to initialize each plane with
    pub buffer_count: usize,
    /// Serve a z-order made of a single sprite layer with the pipeline's primary plane
    pub promote_single_sprite: bool,
}

impl PlaneManagerConfig {
    /// Configuration for a known platform
    pub fn for_platform(platform: Platform) -> Self {
        PlaneManagerConfig {
            platform: Some(platform),
            counts: platform.plane_counts(),
            buffer_count: MIN_DATA_BUFFER_COUNT,
            promote_single_sprite: true,
        }
    }

    /// Configuration for a custom plane layout
    pub fn with_counts(counts: PlaneCounts) -> Self {
        PlaneManagerConfig {
            platform: None,
            counts,
            buffer_count: MIN_DATA_BUFFER_COUNT,
            promote_single_sprite: true,
        }
    }

    /// Apply overrides from the process environment.
    ///
    /// Setting [`NO_SPRITE_PROMOTION_ENV`] disables
    /// [`promote_single_sprite`](PlaneManagerConfig::promote_single_sprite).
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if lookup(NO_SPRITE_PROMOTION_ENV)
            .map(|x| is_truthy(&x))
            .unwrap_or(false)
        {
            self.promote_single_sprite = false;
        }
        self
    }
}

impl Default for PlaneManagerConfig {
    fn default() -> Self {
        PlaneManagerConfig::for_platform(Platform::Tangier)
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "1" || value == "true" || value == "yes" || value == "y"
}
