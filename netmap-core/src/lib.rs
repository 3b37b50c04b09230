pub mod layout;
pub mod model;

pub use layout::{LayoutEngine, LayoutParams, Viewport};
pub use model::{Edge, EdgeKind, GraphSnapshot, Node, NodeKind, ScanSession};
