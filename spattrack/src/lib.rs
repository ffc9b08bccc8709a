//! # Terrain-aware seismic source tracking
//!
//! `spattrack` computes topography-corrected propagation distances
//! between fixed sensors and every cell of an elevation grid, then uses
//! those distance fields together with recorded waveform amplitudes to
//! estimate the time-varying location of a moving source.

mod distance;
mod error;
mod locate;
mod solver;
mod track;
mod window;
mod xcorr;

pub use {
    crate::{
        distance::{spatial_distance, DistanceMap, DistanceOptions, DistanceSet},
        error::TrackError,
        locate::{locate_source, SourceEstimate},
        solver::{LbfgsSolver, Solution},
        track::{spatial_track, SeriesStats, TrackOptions, TrackSeries},
        window::{Window, WindowPlan},
        xcorr::{cross_correlate, CrossCorrelation},
    },
    demgrid, geo, terrapath,
};
