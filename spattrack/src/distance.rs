use crate::TrackError;
use demgrid::{DemGrid, Extent};
use geo::geometry::Coord;
use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;
use terrapath::Profile;

#[derive(Debug, Clone)]
pub struct DistanceOptions {
    /// Clip path profiles to the terrain.
    pub topography: bool,

    /// Compute per-station distance maps.
    pub maps: bool,

    /// Compute the station-pair distance matrix.
    pub matrix: bool,

    /// Restrict map computation to this rectangle. Defaults to the
    /// full DEM extent.
    pub aoi: Option<Extent>,
}

impl Default for DistanceOptions {
    fn default() -> Self {
        Self {
            topography: true,
            maps: true,
            matrix: true,
            aoi: None,
        }
    }
}

/// Topography-corrected distance field for one station.
///
/// Values hold the slant length per cell: the planar run combined with
/// the path's total vertical excursion as a single aggregate leg.
/// Cells outside the AOI are NaN.
#[derive(Debug, Clone)]
pub struct DistanceMap {
    pub crs: String,
    pub extent: Extent,
    pub resolution: f64,
    pub values: Array2<f64>,
}

/// Distance fields and the station-pair matrix.
///
/// Matrix entry (i, j) is the stepwise 3-D arc length of the clipped
/// path from station i to station j. Clipping depends on traversal
/// direction, so the matrix is directed and not necessarily symmetric.
/// The two length forms intentionally differ from the maps' slant
/// form.
#[derive(Debug, Clone)]
pub struct DistanceSet {
    pub maps: Vec<DistanceMap>,
    pub matrix: Option<Array2<f64>>,
}

/// Computes topography-corrected distances from every station to every
/// grid cell (maps) and between station pairs (matrix).
///
/// All input validation happens before any distance work: the DEM must
/// be void-free and stations and AOI must fall within its extent.
pub fn spatial_distance(
    stations: &[Coord<f64>],
    dem: &DemGrid,
    options: &DistanceOptions,
) -> Result<DistanceSet, TrackError> {
    let extent = dem.extent();
    info!(
        "DEM extent: {}, {}, {}, {}",
        extent.xmin, extent.xmax, extent.ymin, extent.ymax
    );
    info!("station coordinates: {stations:?}");

    let voids = dem.void_count();
    if voids > 0 {
        return Err(TrackError::DemVoids(voids));
    }

    for (index, station) in stations.iter().enumerate() {
        if !extent.contains(*station) {
            return Err(TrackError::StationOutsideDem {
                index,
                x: station.x,
                y: station.y,
            });
        }
    }

    let aoi = options.aoi.unwrap_or(extent);
    if !extent.contains_extent(&aoi) {
        return Err(TrackError::AoiOutsideDem);
    }

    let maps = if options.maps {
        stations
            .par_iter()
            .enumerate()
            .map(|(index, &station)| station_map(index, station, dem, &aoi, options.topography))
            .collect::<Result<Vec<DistanceMap>, TrackError>>()?
    } else {
        Vec::new()
    };

    let matrix = if options.matrix {
        Some(station_matrix(stations, dem, options.topography)?)
    } else {
        None
    };

    Ok(DistanceSet { maps, matrix })
}

fn station_map(
    index: usize,
    station: Coord<f64>,
    dem: &DemGrid,
    aoi: &Extent,
    topography: bool,
) -> Result<DistanceMap, TrackError> {
    debug!("computing distance map for station {index}");

    let (rows, cols) = dem.dimensions();
    let mut values = Array2::from_elem((rows, cols), f64::NAN);

    for row in 0..rows {
        for col in 0..cols {
            let center = dem.cell_center(row, col);
            if aoi.contains(center) {
                let profile = Profile::builder()
                    .start(station)
                    .end(center)
                    .clip_to_terrain(topography)
                    .build(dem)?;
                values[[row, col]] = profile.slant_length();
            }
        }
    }

    Ok(DistanceMap {
        crs: dem.crs().to_string(),
        extent: dem.extent(),
        resolution: dem.resolution(),
        values,
    })
}

fn station_matrix(
    stations: &[Coord<f64>],
    dem: &DemGrid,
    topography: bool,
) -> Result<Array2<f64>, TrackError> {
    debug!("computing station distance matrix");

    let n = stations.len();
    let rows = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut row = vec![0.0; n];
            for (j, &end) in stations.iter().enumerate() {
                let profile = Profile::builder()
                    .start(stations[i])
                    .end(end)
                    .clip_to_terrain(topography)
                    .build(dem)?;
                row[j] = profile.stepwise_length();
            }
            Ok(row)
        })
        .collect::<Result<Vec<Vec<f64>>, TrackError>>()?;

    let mut matrix = Array2::zeros((n, n));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, value) in row.into_iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::{spatial_distance, Coord, DistanceOptions, Extent};
    use approx::assert_relative_eq;
    use demgrid::DemGrid;
    use ndarray::Array2;

    fn flat_grid() -> DemGrid {
        let values = Array2::from_elem((12, 12), 500.0);
        DemGrid::from_parts(values, 0.0, 120.0, 10.0, "EPSG:32610").unwrap()
    }

    /// Elevated rims with a deep trench between the two stations used
    /// in the tests below.
    fn trenched_grid() -> DemGrid {
        let values = Array2::from_shape_fn((12, 12), |(_, c)| if c == 6 { 0.0 } else { 80.0 });
        DemGrid::from_parts(values, 0.0, 120.0, 10.0, "").unwrap()
    }

    fn stations() -> Vec<Coord<f64>> {
        vec![Coord { x: 15.0, y: 65.0 }, Coord { x: 105.0, y: 65.0 }]
    }

    #[test]
    fn test_flat_terrain_map_is_planar_distance() {
        let dem = flat_grid();
        let result = spatial_distance(&stations(), &dem, &DistanceOptions::default()).unwrap();
        let map = &result.maps[0];
        let station = stations()[0];
        for row in 0..dem.rows() {
            for col in 0..dem.cols() {
                let center = dem.cell_center(row, col);
                let planar = (center.x - station.x).hypot(center.y - station.y);
                assert_relative_eq!(map.values[[row, col]], planar, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_map_metadata_mirrors_dem() {
        let dem = flat_grid();
        let result = spatial_distance(&stations(), &dem, &DistanceOptions::default()).unwrap();
        assert_eq!(result.maps.len(), 2);
        assert_eq!(result.maps[0].crs, "EPSG:32610");
        assert_relative_eq!(result.maps[0].resolution, 10.0);
        assert_eq!(result.maps[0].values.dim(), dem.dimensions());
    }

    #[test]
    fn test_aoi_masks_outside_cells() {
        let dem = flat_grid();
        let aoi = Extent {
            xmin: 25.0,
            xmax: 75.0,
            ymin: 25.0,
            ymax: 75.0,
        };
        let options = DistanceOptions {
            aoi: Some(aoi),
            matrix: false,
            ..DistanceOptions::default()
        };
        let result = spatial_distance(&stations(), &dem, &options).unwrap();
        for row in 0..dem.rows() {
            for col in 0..dem.cols() {
                let value = result.maps[0].values[[row, col]];
                if aoi.contains(dem.cell_center(row, col)) {
                    assert!(value.is_finite());
                } else {
                    assert!(value.is_nan());
                }
            }
        }
    }

    #[test]
    fn test_matrix_diagonal_is_zero() {
        let dem = flat_grid();
        for count in 1..=4 {
            let stations: Vec<Coord<f64>> = (0..count)
                .map(|i| Coord {
                    x: 15.0 + 20.0 * i as f64,
                    y: 65.0,
                })
                .collect();
            let options = DistanceOptions {
                maps: false,
                ..DistanceOptions::default()
            };
            let matrix = spatial_distance(&stations, &dem, &options)
                .unwrap()
                .matrix
                .unwrap();
            for i in 0..count {
                assert_eq!(matrix[[i, i]], 0.0);
            }
        }
    }

    #[test]
    fn test_trench_corrected_distance_exceeds_straight_line() {
        let dem = trenched_grid();
        let options = DistanceOptions {
            maps: false,
            ..DistanceOptions::default()
        };
        let matrix = spatial_distance(&stations(), &dem, &options)
            .unwrap()
            .matrix
            .unwrap();
        // Both stations sit on the rim, so the straight 3-D line is the
        // 90 m planar run; the clipped path dips through the trench.
        assert!(matrix[[0, 1]] > 90.0);
        assert!(matrix[[1, 0]] > 90.0);
    }

    #[test]
    fn test_disabling_topography_drops_the_correction() {
        let dem = trenched_grid();
        let options = DistanceOptions {
            topography: false,
            maps: false,
            ..DistanceOptions::default()
        };
        let matrix = spatial_distance(&stations(), &dem, &options)
            .unwrap()
            .matrix
            .unwrap();
        assert_relative_eq!(matrix[[0, 1]], 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_repeated_runs_are_bit_identical() {
        let dem = trenched_grid();
        let options = DistanceOptions::default();
        let first = spatial_distance(&stations(), &dem, &options).unwrap();
        let second = spatial_distance(&stations(), &dem, &options).unwrap();
        for (a, b) in first.maps.iter().zip(second.maps.iter()) {
            for (va, vb) in a.values.iter().zip(b.values.iter()) {
                assert_eq!(va.to_bits(), vb.to_bits());
            }
        }
        for (va, vb) in first
            .matrix
            .unwrap()
            .iter()
            .zip(second.matrix.unwrap().iter())
        {
            assert_eq!(va.to_bits(), vb.to_bits());
        }
    }

    #[test]
    fn test_station_outside_extent_fails_fast() {
        let dem = flat_grid();
        let stations = vec![Coord { x: 500.0, y: 65.0 }];
        let result = spatial_distance(&stations, &dem, &DistanceOptions::default());
        assert!(matches!(
            result,
            Err(crate::TrackError::StationOutsideDem { index: 0, .. })
        ));
    }

    #[test]
    fn test_void_dem_fails_fast() {
        let mut values = Array2::from_elem((12, 12), 500.0);
        values[[3, 3]] = f64::NAN;
        let dem = DemGrid::from_parts(values, 0.0, 120.0, 10.0, "").unwrap();
        let result = spatial_distance(&stations(), &dem, &DistanceOptions::default());
        assert!(matches!(result, Err(crate::TrackError::DemVoids(1))));
    }

    #[test]
    fn test_aoi_outside_extent_fails_fast() {
        let dem = flat_grid();
        let options = DistanceOptions {
            aoi: Some(Extent {
                xmin: 5.0,
                xmax: 500.0,
                ymin: 5.0,
                ymax: 115.0,
            }),
            ..DistanceOptions::default()
        };
        let result = spatial_distance(&stations(), &dem, &options);
        assert!(matches!(result, Err(crate::TrackError::AoiOutsideDem)));
    }

    #[test]
    fn test_outputs_can_be_skipped() {
        let dem = flat_grid();
        let options = DistanceOptions {
            maps: false,
            matrix: false,
            ..DistanceOptions::default()
        };
        let result = spatial_distance(&stations(), &dem, &options).unwrap();
        assert!(result.maps.is_empty());
        assert!(result.matrix.is_none());
    }
}
