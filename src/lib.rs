//! Tag-routed local-to-global assembly for finite element residuals and Jacobians.
//!
//! Objects that contribute to a residual or a Jacobian compute one local block per variable (pair)
//! and hand it to a [`TagRouter`](assembly::tagging::TagRouter), which deposits the block into
//! every tagged global system the object is bound to.
pub mod assembly;
pub mod error;
pub mod params;
pub mod tag;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
