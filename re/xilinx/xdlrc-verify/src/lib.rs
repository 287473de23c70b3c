//! Cross-checks the wires of a generated XDLRC report against the routing
//! nodes of a reference device.

mod check;
mod error;
pub mod vivado;

pub use check::{NodeCheck, OutputFormat, check_tile_order, find_node_mismatches, write_mismatches};
pub use error::Error;
pub use vivado::ReferenceDump;
