//! Rendering system for the preview.
//!
//! Everything here runs on the CPU and on the consumer thread:
//!
//! * `geometry` - sizes, rectangles, aspect-preserving fit and crop
//! * `transform` - the image pipeline a node applies to its skin
//! * `scene` - the tree of drawable nodes with cached renders
//! * `compositor` - turns dirty nodes into the rectangles to repaint
//! * `sink` - the display interface and an in-memory implementation

pub mod compositor;
pub mod geometry;
pub mod scene;
pub mod sink;
pub mod transform;

pub use compositor::Compositor;
pub use geometry::{CropAnchor, FitMode, Rect, Size};
pub use scene::{DrawableNode, Frame, NodeId, Scene, Skin};
pub use sink::{DisplaySink, MemorySink};
