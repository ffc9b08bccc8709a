//! # Terrain path profiles
//!
//! `terrapath` discretizes straight segments over a [`demgrid::DemGrid`]
//! and integrates their elevation profiles into path lengths.

mod error;
mod math;
mod profile;

pub use crate::{
    error::PathError,
    math::linspace,
    profile::{Profile, ProfileBuilder},
};
