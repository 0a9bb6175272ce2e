//! Command line argument definitions shared by the schroot front-ends.
//!
//! Each front-end flattens the option groups it supports into its own
//! parser, so restricted front-ends simply do not expose what their
//! policy forbids.

mod csbuild;
mod dchroot;
mod global;
mod schroot;

pub use csbuild::CsbuildOptions;
pub use dchroot::DchrootOptions;
pub use global::GlobalOpts;
pub use schroot::{ActionOpts, ListMode, RunOpts, SchrootOptions, SelectOpts};
