//! Read-only model of an FPGA device as described by an interchange
//! device resources file: tiles, sites, wires, pips, nodes and the
//! site type (primitive) definitions they instantiate.

pub mod annotations;
pub mod build;
pub mod db;
mod error;
mod model;

pub use error::Error;
pub use model::RoutingModel;
