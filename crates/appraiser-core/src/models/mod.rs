//! Data models for the appraisal workflow

mod client;
mod collateral;
mod coordinate;
mod location;
mod permission;
mod photo;

pub use client::*;
pub use collateral::*;
pub use coordinate::*;
pub use location::*;
pub use permission::*;
pub use photo::*;
