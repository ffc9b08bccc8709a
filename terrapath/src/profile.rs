use crate::{math::linspace, PathError};
use demgrid::DemGrid;
use geo::geometry::Coord;
use log::debug;

/// Elevation profile of one straight segment, sampled at the grid's
/// resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Planar distance from `start` to `end`.
    pub distance: f64,

    /// Sample positions along the segment.
    pub positions: Vec<Coord<f64>>,

    /// Ground elevation at each position.
    pub terrain: Vec<f64>,

    /// Elevation of the direct path at each position. When clipping is
    /// enabled it never rises above the ground.
    pub direct: Vec<f64>,
}

impl Profile {
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder {
            start: None,
            end: None,
            clip_to_terrain: false,
        }
    }

    /// Total vertical travel along the direct path.
    pub fn vertical_excursion(&self) -> f64 {
        self.direct.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
    }

    /// Path length treating the total vertical excursion as a single
    /// aggregate leg perpendicular to the planar run.
    pub fn slant_length(&self) -> f64 {
        self.distance.hypot(self.vertical_excursion())
    }

    /// Path length summed over consecutive 3-D segments between
    /// sampled points.
    pub fn stepwise_length(&self) -> f64 {
        self.positions
            .windows(2)
            .zip(self.direct.windows(2))
            .map(|(p, z)| {
                let dx = p[1].x - p[0].x;
                let dy = p[1].y - p[0].y;
                let dz = z[1] - z[0];
                (dx * dx + dy * dy + dz * dz).sqrt()
            })
            .sum()
    }
}

pub struct ProfileBuilder {
    start: Option<Coord<f64>>,

    end: Option<Coord<f64>>,

    /// Force the direct path down to the ground wherever it would run
    /// above it.
    clip_to_terrain: bool,
}

impl ProfileBuilder {
    #[must_use]
    pub fn start(mut self, coord: Coord<f64>) -> Self {
        self.start = Some(coord);
        self
    }

    #[must_use]
    pub fn end(mut self, coord: Coord<f64>) -> Self {
        self.end = Some(coord);
        self
    }

    #[must_use]
    pub fn clip_to_terrain(mut self, clip: bool) -> Self {
        self.clip_to_terrain = clip;
        self
    }

    pub fn build(&self, dem: &DemGrid) -> Result<Profile, PathError> {
        let start = self.start.ok_or(PathError::Builder("start"))?;
        let end = self.end.ok_or(PathError::Builder("end"))?;

        let distance = (end.x - start.x).hypot(end.y - start.y);

        // One sample per grid cell traversed, never fewer than one.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = ((distance / dem.resolution()).round() as usize).max(1);

        let positions: Vec<Coord<f64>> = linspace(start.x, end.x, n)
            .zip(linspace(start.y, end.y, n))
            .map(|(x, y)| Coord { x, y })
            .collect();

        let terrain = positions
            .iter()
            .map(|&coord| {
                dem.elevation(coord).ok_or(PathError::OffGrid {
                    x: coord.x,
                    y: coord.y,
                })
            })
            .collect::<Result<Vec<f64>, PathError>>()?;

        // Unwraps are fine as n is at least one.
        let mut direct: Vec<f64> =
            linspace(*terrain.first().unwrap(), *terrain.last().unwrap(), n).collect();

        if self.clip_to_terrain {
            for (direct, terrain) in direct.iter_mut().zip(terrain.iter()) {
                if *direct > *terrain {
                    *direct = *terrain;
                }
            }
        }

        debug!("profile; len: {n}, planar distance: {distance}");

        Ok(Profile {
            distance,
            positions,
            terrain,
            direct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, Profile};
    use approx::assert_relative_eq;
    use demgrid::DemGrid;
    use ndarray::Array2;

    fn flat_grid(elevation: f64) -> DemGrid {
        let values = Array2::from_elem((20, 20), elevation);
        DemGrid::from_parts(values, 0.0, 200.0, 10.0, "").unwrap()
    }

    /// A 60 m deep north-south trench through the middle of an
    /// otherwise flat plateau.
    fn trenched_grid() -> DemGrid {
        let values = Array2::from_shape_fn((20, 20), |(_, c)| if c == 10 { 0.0 } else { 60.0 });
        DemGrid::from_parts(values, 0.0, 200.0, 10.0, "").unwrap()
    }

    #[test]
    fn test_sample_count_tracks_planar_length() {
        let dem = flat_grid(0.0);
        let profile = Profile::builder()
            .start(Coord { x: 15.0, y: 105.0 })
            .end(Coord { x: 95.0, y: 105.0 })
            .build(&dem)
            .unwrap();
        // 80 m at 10 m resolution.
        assert_eq!(profile.positions.len(), 8);
        assert_relative_eq!(profile.distance, 80.0);
    }

    #[test]
    fn test_zero_length_segment_degenerates_to_one_sample() {
        let dem = flat_grid(7.0);
        let coord = Coord { x: 55.0, y: 55.0 };
        let profile = Profile::builder().start(coord).end(coord).build(&dem).unwrap();
        assert_eq!(profile.positions.len(), 1);
        assert_relative_eq!(profile.slant_length(), 0.0);
        assert_relative_eq!(profile.stepwise_length(), 0.0);
    }

    #[test]
    fn test_flat_terrain_lengths_equal_planar_distance() {
        let dem = flat_grid(123.0);
        let profile = Profile::builder()
            .start(Coord { x: 15.0, y: 15.0 })
            .end(Coord { x: 155.0, y: 185.0 })
            .clip_to_terrain(true)
            .build(&dem)
            .unwrap();
        assert_relative_eq!(profile.vertical_excursion(), 0.0);
        assert_relative_eq!(profile.slant_length(), profile.distance);
        assert_relative_eq!(profile.stepwise_length(), profile.distance, epsilon = 1e-9);
    }

    #[test]
    fn test_clipping_keeps_direct_path_on_or_below_ground() {
        let dem = trenched_grid();
        let profile = Profile::builder()
            .start(Coord { x: 15.0, y: 105.0 })
            .end(Coord { x: 185.0, y: 105.0 })
            .clip_to_terrain(true)
            .build(&dem)
            .unwrap();
        for (direct, terrain) in profile.direct.iter().zip(profile.terrain.iter()) {
            assert!(direct <= terrain);
        }
    }

    #[test]
    fn test_unclipped_direct_path_ignores_terrain() {
        let dem = trenched_grid();
        let profile = Profile::builder()
            .start(Coord { x: 15.0, y: 105.0 })
            .end(Coord { x: 185.0, y: 105.0 })
            .build(&dem)
            .unwrap();
        // Both endpoints sit on the plateau, so the unclipped direct
        // path crosses the trench at plateau height.
        assert_relative_eq!(profile.vertical_excursion(), 0.0);
    }

    #[test]
    fn test_trench_between_endpoints_lengthens_path() {
        let dem = trenched_grid();
        let build = |clip| {
            Profile::builder()
                .start(Coord { x: 15.0, y: 105.0 })
                .end(Coord { x: 185.0, y: 105.0 })
                .clip_to_terrain(clip)
                .build(&dem)
                .unwrap()
        };
        let clipped = build(true);
        let unclipped = build(false);
        assert!(clipped.stepwise_length() >= unclipped.stepwise_length());
        assert!(clipped.slant_length() > clipped.distance);
    }

    #[test]
    fn test_builder_requires_both_endpoints() {
        let dem = flat_grid(0.0);
        let result = Profile::builder().start(Coord { x: 5.0, y: 5.0 }).build(&dem);
        assert!(result.is_err());
    }

    #[test]
    fn test_off_grid_sample_is_an_error() {
        let dem = flat_grid(0.0);
        let result = Profile::builder()
            .start(Coord { x: 15.0, y: 105.0 })
            .end(Coord { x: 500.0, y: 105.0 })
            .build(&dem);
        assert!(result.is_err());
    }
}
