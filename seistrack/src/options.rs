use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand, ValueEnum};
use spattrack::{demgrid::Extent, geo::geometry::Coord};
use std::{path::PathBuf, str::FromStr};

/// Terrain-corrected distance fields and windowed source tracking.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// DEM raster (.asc, or .flt with a sibling .hdr).
    #[arg(short, long)]
    pub dem: PathBuf,

    /// Station coordinate "x,y" in the DEM's CRS; repeat per station.
    #[arg(short, long = "station", required = true)]
    pub stations: Vec<XY>,

    /// Area of interest "xmin,xmax,ymin,ymax"; defaults to the DEM
    /// extent.
    #[arg(long)]
    pub aoi: Option<Rectangle>,

    /// Skip clipping path profiles to the terrain.
    #[arg(long, default_value_t = false)]
    pub no_topography: bool,

    /// Accepted for interface compatibility; the thread pool sizes
    /// itself.
    #[arg(long)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Compute distance maps and the station distance matrix.
    Distance {
        /// Leave out the per-station distance maps.
        #[arg(long, default_value_t = false)]
        skip_maps: bool,

        /// Leave out the station distance matrix.
        #[arg(long, default_value_t = false)]
        skip_matrix: bool,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Track a moving source through waveform windows.
    Track {
        /// Waveform matrix; one whitespace-separated row per station.
        #[arg(short, long)]
        waveform: PathBuf,

        /// Samples per second.
        #[arg(long, default_value_t = 100.0)]
        sampling_rate: f64,

        /// Maximum cross-correlation lag, in samples.
        #[arg(long, default_value_t = 10)]
        max_lag: usize,

        /// Analysis window length, in samples.
        #[arg(long, default_value_t = 100)]
        time_window: usize,

        /// Overlap between consecutive windows, in samples.
        #[arg(long, default_value_t = 50)]
        overlap: usize,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Full records as JSON.
    Json,

    /// Flat summary as CSV.
    Csv,
}

#[derive(Clone, Debug, Copy)]
pub struct XY(pub Coord<f64>);

impl FromStr for XY {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (x_str, y_str) = s.split_once(',').ok_or_else(|| anyhow!("not a valid x,y"))?;
        let x = f64::from_str(x_str.trim())?;
        let y = f64::from_str(y_str.trim())?;
        Ok(Self(Coord { x, y }))
    }
}

#[derive(Clone, Debug, Copy)]
pub struct Rectangle(pub Extent);

impl FromStr for Rectangle {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(anyhow!("not a valid xmin,xmax,ymin,ymax"));
        }
        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(parts.iter()) {
            *slot = f64::from_str(part.trim())?;
        }
        Ok(Self(Extent {
            xmin: values[0],
            xmax: values[1],
            ymin: values[2],
            ymax: values[3],
        }))
    }
}
