use crate::TrackError;
use std::ops::Range;

/// One fixed-length analysis window over a sample axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Window {
    /// Half-open sample range covered by this window.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Start of this window in seconds.
    pub fn start_time(&self, sampling_rate: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let start = self.start as f64;
        start / sampling_rate
    }
}

/// Slices a sample axis into overlapping fixed-length windows.
///
/// Window `i` spans `[i·(window − overlap), i·(window − overlap) +
/// window)`. Trailing samples that cannot fill a whole window are
/// dropped; every emitted window is full-length and in-bounds.
#[derive(Debug, Clone, Copy)]
pub struct WindowPlan {
    samples: usize,
    window: usize,
    overlap: usize,
    count: usize,
}

impl WindowPlan {
    pub fn new(samples: usize, window: usize, overlap: usize) -> Result<Self, TrackError> {
        if overlap >= window {
            return Err(TrackError::OverlapTooLong { overlap, window });
        }
        if window > samples {
            return Err(TrackError::DegenerateWindow { window, samples });
        }
        let count = (samples - window) / (window - overlap) + 1;
        Ok(Self {
            samples,
            window,
            overlap,
            count,
        })
    }

    /// Number of windows the plan yields.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Length of every window, in samples.
    pub fn window_len(&self) -> usize {
        self.window
    }

    pub fn iter(&self) -> impl Iterator<Item = Window> + '_ {
        let step = self.window - self.overlap;
        (0..self.count).map(move |index| {
            let start = index * step;
            let window = Window {
                index,
                start,
                end: start + self.window,
            };
            debug_assert!(window.end <= self.samples);
            window
        })
    }
}
