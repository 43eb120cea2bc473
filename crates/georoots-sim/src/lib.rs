//! Headless rockfall early-warning animation.
//!
//! Load a site dataset, draw a stratified sample, and step a [`Scene`]
//! in which each sampled site becomes a rock on a ridge above a village.
//! Frames are rendered with [`render_frame`] and written by the binary.

pub mod dataset;
pub mod render;
pub mod scene;

pub use dataset::{
    DatasetError, SAMPLE_QUOTAS, SiteRecord, load_dataset, read_dataset, stratified_sample,
};
pub use render::{FRAME_WIDTH, render_frame};
pub use scene::{HEIGHT, Person, Rock, Scene, TICKS_PER_SECOND};
