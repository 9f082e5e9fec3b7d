//! SketchSync Render Library
//!
//! Frame composition and painters for the SketchSync board.
//! The default painter uses Vello for GPU-accelerated rendering.

mod display_list;
mod frame;
mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use display_list::{DisplayList, DrawCommand};
pub use frame::FrameLoop;
pub use renderer::{
    CULL_MARGIN_PX, FrameStats, GRID_MIN_ZOOM, GRID_SPACING, RenderContext, RenderError, RenderResult, build_frame,
};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloPainter;
