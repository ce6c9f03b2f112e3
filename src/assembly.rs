//! Assembly of element contributions into tagged global systems.
//!
//! - [`tagging`] routes a single local block to every bound tag.
//! - [`blocks`] provides the element-level blocks the router writes into.
//! - [`global`] scatters element blocks into global vectors and CSR matrices.
pub mod blocks;
pub mod global;
pub mod tagging;
