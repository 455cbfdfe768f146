//! Render-side output of the pipeline
//!
//! [`batching`] builds a [`RenderList`] from the spatial index each frame. The
//! rendering backend consumes the list: one instanced draw per
//! [`RenderSegment`](batching::RenderSegment), reading instance data from the
//! shader batch's [`RenderFlag`](batching::RenderFlag) array.

pub mod batching;
mod render_list;

pub use render_list::{RenderList, ResourceInterner};
