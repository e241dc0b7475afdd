pub mod analyze;
pub mod model;

// Re-export commonly used types/functions for consumers
pub use analyze::{analyze_entries, block_edges, build_blocks, Analysis, Block, Edge, EdgeKind, EdgeOut};
pub use model::{decode, load_raw_bin, read_u8, Image};
