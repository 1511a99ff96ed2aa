//! # MPR viewer core
//!
//! This crate holds the interaction core of a multi-planar medical image
//! viewer: three orthogonal views (axial, coronal, sagittal) of one CT
//! volume, each with its own pan and zoom, kept in sync through a shared
//! voxel of interest.
//!
//! The crate does not decode scans or draw widgets. Slice rasters, voxel
//! lookups, histograms and the segmentation mask come from a
//! [`ViewerBackend`]. The host page feeds pointer and keyboard input into a
//! [`Viewer`] and draws what [`Viewer::frame`] returns.
//!
//! What the core takes care of:
//!  - Pointer to pixel mapping under any pan/zoom
//!  - Zoom around the cursor, drag to pan, double click to reset
//!  - Window/level presets and a piecewise-linear contrast LUT applied
//!    locally, without fetching the raster again
//!  - Cross-view synchronisation with crosshairs on all three views
//!  - Brush and polygon editing of a segmentation mask
//!  - Mutually exclusive pointer tools
//!
//! An in-process [`MemoryBackend`] over an [`ndarray`] volume is included.
//! It renders the slices with bilinear interpolation along the stretched
//! axis and is what the demo binary and the tests run against.
//!
//! # Examples
//!
//! ## Pick the preset for lung tissue
//!
//! ```no_run
//! # use mpr_viewer::{MemoryBackend, Viewer, ViewerConfig};
//! # use mpr_viewer::enums::WindowPreset;
//! # use mpr_viewer::sync::SliceIndices;
//! # use mpr_viewer::volume::Volume;
//! # async fn run(volume: Volume) {
//! let indices = SliceIndices::for_dims(volume.dim());
//! let backend = MemoryBackend::new(volume, 20);
//! let mut viewer = Viewer::new(backend, ViewerConfig::default(), indices);
//! viewer.load_all().await;
//! viewer.apply_preset(WindowPreset::Lung).await;
//! assert_eq!(viewer.active_preset(), Some(WindowPreset::Lung));
//! # }
//! ```
//!
//! [`ViewerBackend`]: services::ViewerBackend

pub mod backend;
pub mod config;
pub mod contrast;
pub mod enums;
pub mod error;
pub mod geometry;
pub mod histogram;
mod interpolator;
pub mod mapper;
pub mod overlay;
pub mod segmentation;
pub mod services;
pub mod slice_cache;
pub mod sync;
pub mod tools;
pub mod transform;
pub mod viewer;
pub mod volume;
pub mod window;

pub use backend::MemoryBackend;
pub use config::ViewerConfig;
pub use error::{Result, ServiceError, ViewerError};
pub use viewer::{InputEvent, Viewer};
