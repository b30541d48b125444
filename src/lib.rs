#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # hwc-planes: hardware plane assignment for display pipelines
//!
//! This crate manages the fixed set of compositing planes of a display engine (primary,
//! sprite and overlay planes) and answers two questions for every frame:
//!
//! - can a requested stacking order of layers be realized by the hardware, and
//! - which physical plane backs each layer of that order.
//!
//! It does not decide which layers to composite or when to refresh the display.
//!
//! ## Structure of the crate
//!
//! - [`plane`] describes planes: the [`PlaneType`] classes, the [`DisplayPlane`] trait
//!   implemented by the hardware layer and the [`PlaneFactory`] creating planes.
//! - [`pool`] owns the planes and tracks which pipeline claimed which plane.
//! - [`zorder`] holds the per-frame [`ZOrderConfig`], its validation and the committed
//!   [`ZOrderState`] of a pipeline.
//! - [`manager`] ties everything together in the [`PlaneManager`].
//! - [`config`] contains the plane tables of known platforms.
//!
//! ### Logging
//!
//! This crate makes use of [`tracing`] for its internal logging. Install a subscriber in your
//! binary to see its output, or refer to [`log compatibility`](tracing#log-compatibility)
//! to forward it to `log` based frameworks.

pub mod config;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod plane;
pub mod pool;
pub mod utils;
pub mod zorder;

pub use config::{Platform, PlaneCounts, PlaneManagerConfig};
pub use error::Error;
pub use manager::PlaneManager;
pub use pipeline::Pipeline;
pub use plane::{DisplayPlane, PlaneFactory, PlaneId, PlaneType};
pub use zorder::{PlaneAssignment, PlaneBinding, ZOrderConfig, ZOrderLayer, ZOrderState};
