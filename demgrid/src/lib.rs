//! Gridded digital elevation model (DEM) access.
//!
//! A [`DemGrid`] is a single in-memory elevation raster with a square
//! cell size and an affine cell↔world mapping. Two on-disk forms are
//! supported:
//!
//! 1. ESRI ASCII grid (`.asc`): text header followed by row-major
//!    samples, northernmost row first.
//! 1. ESRI float grid (`.flt`): raw little-endian `f32` samples with
//!    the same layout, described by a sibling `.hdr` file. The payload
//!    is read through a memory map.
//!
//! # References
//!
//! 1. [ESRI ASCII raster format](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/esri-ascii-raster-format.htm)
//! 1. [ESRI float grid format](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/float-to-raster.htm)

mod error;

pub use crate::error::GridError;
use byteorder::{ByteOrder, LittleEndian as LE};
use geo::geometry::Coord;
use memmap2::Mmap;
use ndarray::Array2;
use serde::Serialize;
use std::{fs::File, mem::size_of, path::Path};

/// Base floating point type used for all coordinates and elevations.
pub type C = f64;

/// Bounding rectangle over cell centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub xmin: C,
    pub xmax: C,
    pub ymin: C,
    pub ymax: C,
}

impl Extent {
    /// Returns true when `coord` falls on or inside the rectangle.
    pub fn contains(&self, coord: Coord<C>) -> bool {
        self.xmin <= coord.x && coord.x <= self.xmax && self.ymin <= coord.y && coord.y <= self.ymax
    }

    /// Returns true when `other` lies entirely on or inside `self`.
    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.xmin <= other.xmin
            && other.xmax <= self.xmax
            && self.ymin <= other.ymin
            && other.ymax <= self.ymax
    }
}

pub struct DemGrid {
    /// West edge of the raster.
    x_origin: C,

    /// North edge of the raster.
    y_origin: C,

    /// Cell size in CRS units. Cells are square.
    resolution: C,

    /// CRS label, carried through to outputs but never interpreted.
    crs: String,

    /// Elevation samples, northernmost row first. Voids are NaN.
    values: Array2<C>,
}

impl DemGrid {
    /// Returns a grid assembled from already-loaded samples.
    ///
    /// `x_origin`/`y_origin` locate the raster's northwest corner
    /// (cell edges, not centers).
    pub fn from_parts(
        values: Array2<C>,
        x_origin: C,
        y_origin: C,
        resolution: C,
        crs: impl Into<String>,
    ) -> Result<Self, GridError> {
        if !(resolution > 0.0) {
            return Err(GridError::Resolution(resolution));
        }
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(GridError::Empty);
        }
        Ok(Self {
            x_origin,
            y_origin,
            resolution,
            crs: crs.into(),
            values,
        })
    }

    /// Returns a grid read from an ESRI ASCII (`.asc`) file.
    pub fn from_asc<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let src = std::fs::read_to_string(path)?;
        parse_asc(&src)
    }

    /// Returns a grid read from a memory-mapped ESRI float (`.flt`)
    /// file, described by the sibling `.hdr` file.
    pub fn from_flt<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let hdr_src = std::fs::read_to_string(path.as_ref().with_extension("hdr"))?;
        let hdr = parse_hdr(&hdr_src)?;

        let file = File::open(path)?;
        let raw = unsafe { Mmap::map(&file)? };

        let expected = hdr.nrows * hdr.ncols;
        let actual = raw.len() / size_of::<f32>();
        if actual != expected {
            return Err(GridError::SampleCount { expected, actual });
        }

        let samples = raw
            .chunks_exact(size_of::<f32>())
            .map(|bytes| {
                let sample = C::from(LE::read_f32(bytes));
                match hdr.nodata {
                    Some(nodata) if sample == nodata => C::NAN,
                    _ => sample,
                }
            })
            .collect::<Vec<C>>();

        // chunks_exact already dropped any trailing partial sample, so
        // this cannot fail after the length check above.
        let values = Array2::from_shape_vec((hdr.nrows, hdr.ncols), samples)
            .map_err(|_| GridError::SampleCount { expected, actual })?;

        Self::from_parts(
            values,
            hdr.xllcorner,
            hdr.yllcorner + hdr.nrows as C * hdr.cellsize,
            hdr.cellsize,
            "",
        )
    }

    /// Returns the number of (rows, columns) in this grid.
    pub fn dimensions(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    /// Returns the cell size in CRS units.
    pub fn resolution(&self) -> C {
        self.resolution
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// Returns the raw elevation samples.
    pub fn values(&self) -> &Array2<C> {
        &self.values
    }

    /// Returns the bounding rectangle of this grid's cell centers.
    pub fn extent(&self) -> Extent {
        let half = self.resolution / 2.0;
        Extent {
            xmin: self.x_origin + half,
            xmax: self.x_origin + self.cols() as C * self.resolution - half,
            ymin: self.y_origin - self.rows() as C * self.resolution + half,
            ymax: self.y_origin - half,
        }
    }

    /// Returns the center coordinate of cell (row, col).
    pub fn cell_center(&self, row: usize, col: usize) -> Coord<C> {
        Coord {
            x: self.x_origin + (col as C + 0.5) * self.resolution,
            y: self.y_origin - (row as C + 0.5) * self.resolution,
        }
    }

    /// Returns the (row, col) of the cell containing `coord`.
    ///
    /// Indices may fall outside the raster; callers that need a valid
    /// cell should go through [`DemGrid::elevation`].
    pub fn row_col(&self, coord: Coord<C>) -> (isize, isize) {
        #[allow(clippy::cast_possible_truncation)]
        let col = ((coord.x - self.x_origin) / self.resolution).floor() as isize;
        #[allow(clippy::cast_possible_truncation)]
        let row = ((self.y_origin - coord.y) / self.resolution).floor() as isize;
        (row, col)
    }

    /// Returns the elevation of the cell containing `coord`, if any.
    pub fn elevation(&self, coord: Coord<C>) -> Option<C> {
        let (row, col) = self.row_col(coord);
        #[allow(clippy::cast_possible_wrap)]
        if 0 <= row && row < self.rows() as isize && 0 <= col && col < self.cols() as isize {
            #[allow(clippy::cast_sign_loss)]
            Some(self.values[[row as usize, col as usize]])
        } else {
            None
        }
    }

    /// Returns the elevation of the cell containing `coord`.
    ///
    /// Panics when `coord` lies outside the raster.
    pub fn elevation_unchecked(&self, coord: Coord<C>) -> C {
        let (row, col) = self.row_col(coord);
        #[allow(clippy::cast_sign_loss)]
        self.values[[row as usize, col as usize]]
    }

    /// Returns the number of void (NaN) cells.
    pub fn void_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// Parsed `.hdr`/`.asc` header fields.
struct Header {
    ncols: usize,
    nrows: usize,
    xllcorner: C,
    yllcorner: C,
    cellsize: C,
    nodata: Option<C>,
}

fn parse_asc(src: &str) -> Result<DemGrid, GridError> {
    let mut ncols = None;
    let mut nrows = None;
    let mut xllcorner = None;
    let mut yllcorner = None;
    let mut cellsize = None;
    let mut nodata = None;

    let mut samples: Vec<C> = Vec::new();
    let mut in_header = true;

    for line in src.lines() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else { continue };

        if in_header && first.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            let mk_err = || GridError::HeaderLine(line.to_string());
            let value = tokens.next().ok_or_else(mk_err)?;
            match first.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(value.parse().map_err(|_| mk_err())?),
                "nrows" => nrows = Some(value.parse().map_err(|_| mk_err())?),
                "xllcorner" => xllcorner = Some(value.parse().map_err(|_| mk_err())?),
                "yllcorner" => yllcorner = Some(value.parse().map_err(|_| mk_err())?),
                "cellsize" => cellsize = Some(value.parse().map_err(|_| mk_err())?),
                "nodata_value" => nodata = Some(value.parse().map_err(|_| mk_err())?),
                _ => return Err(mk_err()),
            }
        } else {
            in_header = false;
            let parse = |token: &str| {
                token
                    .parse::<C>()
                    .map_err(|_| GridError::Value(token.to_string()))
            };
            samples.push(parse(first)?);
            for token in tokens {
                samples.push(parse(token)?);
            }
        }
    }

    let header = Header {
        ncols: ncols.ok_or(GridError::MissingField("ncols"))?,
        nrows: nrows.ok_or(GridError::MissingField("nrows"))?,
        xllcorner: xllcorner.ok_or(GridError::MissingField("xllcorner"))?,
        yllcorner: yllcorner.ok_or(GridError::MissingField("yllcorner"))?,
        cellsize: cellsize.ok_or(GridError::MissingField("cellsize"))?,
        nodata,
    };

    let expected = header.nrows * header.ncols;
    if samples.len() != expected {
        return Err(GridError::SampleCount {
            expected,
            actual: samples.len(),
        });
    }

    if let Some(nodata) = header.nodata {
        for sample in &mut samples {
            if *sample == nodata {
                *sample = C::NAN;
            }
        }
    }

    // The length check above makes this reshape infallible.
    let values = Array2::from_shape_vec((header.nrows, header.ncols), samples).map_err(|_| {
        GridError::SampleCount {
            expected,
            actual: expected,
        }
    })?;

    DemGrid::from_parts(
        values,
        header.xllcorner,
        header.yllcorner + header.nrows as C * header.cellsize,
        header.cellsize,
        "",
    )
}

fn parse_hdr(src: &str) -> Result<Header, GridError> {
    let mut ncols = None;
    let mut nrows = None;
    let mut xllcorner = None;
    let mut yllcorner = None;
    let mut cellsize = None;
    let mut nodata = None;

    for line in src.lines() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else { continue };
        let mk_err = || GridError::HeaderLine(line.to_string());
        let value = tokens.next().ok_or_else(mk_err)?;
        match first.to_ascii_lowercase().as_str() {
            "ncols" => ncols = Some(value.parse().map_err(|_| mk_err())?),
            "nrows" => nrows = Some(value.parse().map_err(|_| mk_err())?),
            "xllcorner" => xllcorner = Some(value.parse().map_err(|_| mk_err())?),
            "yllcorner" => yllcorner = Some(value.parse().map_err(|_| mk_err())?),
            "cellsize" => cellsize = Some(value.parse().map_err(|_| mk_err())?),
            "nodata_value" => nodata = Some(value.parse().map_err(|_| mk_err())?),
            "byteorder" => {
                if !value.eq_ignore_ascii_case("lsbfirst") {
                    return Err(GridError::ByteOrder(value.to_string()));
                }
            }
            _ => return Err(mk_err()),
        }
    }

    Ok(Header {
        ncols: ncols.ok_or(GridError::MissingField("ncols"))?,
        nrows: nrows.ok_or(GridError::MissingField("nrows"))?,
        xllcorner: xllcorner.ok_or(GridError::MissingField("xllcorner"))?,
        yllcorner: yllcorner.ok_or(GridError::MissingField("yllcorner"))?,
        cellsize: cellsize.ok_or(GridError::MissingField("cellsize"))?,
        nodata,
    })
}
