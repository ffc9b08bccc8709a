use terrapath::PathError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("DEM contains {0} void cells")]
    DemVoids(usize),

    #[error("station {index} at ({x}, {y}) lies outside the DEM extent")]
    StationOutsideDem { index: usize, x: f64, y: f64 },

    #[error("AOI extent reaches beyond the DEM extent")]
    AoiOutsideDem,

    #[error("waveform matrix has no channels")]
    EmptyWaveform,

    #[error("sampling rate must be positive, got {0}")]
    SamplingRate(f64),

    #[error("signals must be the same length ({0} vs {1})")]
    LengthMismatch(usize, usize),

    #[error("max lag {max_lag} must be smaller than the window of {samples} samples")]
    LagTooLong { max_lag: usize, samples: usize },

    #[error("overlap {overlap} must be smaller than the time window {window}")]
    OverlapTooLong { overlap: usize, window: usize },

    #[error("time window of {window} samples exceeds the {samples} available")]
    DegenerateWindow { window: usize, samples: usize },

    #[error("{0}")]
    Path(#[from] PathError),
}
