mod options;

use anyhow::{bail, Context, Error as AnyError};
use clap::Parser;
use ndarray::Array2;
use options::{Cli, Command, Format};
use serde::Serialize;
use spattrack::{
    demgrid::{DemGrid, Extent},
    spatial_distance, spatial_track, DistanceOptions, DistanceSet, TrackOptions, TrackSeries,
};
use std::{io::Write, path::Path};

fn main() -> Result<(), AnyError> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(workers) = cli.workers {
        log::debug!("worker count {workers} accepted for compatibility; the thread pool sizes itself");
    }

    let dem = load_dem(&cli.dem)?;
    let stations: Vec<_> = cli.stations.iter().map(|xy| xy.0).collect();

    match cli.cmd {
        Command::Distance {
            skip_maps,
            skip_matrix,
            format,
        } => {
            let options = DistanceOptions {
                topography: !cli.no_topography,
                maps: !skip_maps,
                matrix: !skip_matrix,
                aoi: cli.aoi.map(|rect| rect.0),
            };
            let result = spatial_distance(&stations, &dem, &options)?;
            match format {
                Format::Json => print_distance_json(&result)?,
                Format::Csv => print_distance_csv(&result)?,
            }
        }
        Command::Track {
            waveform,
            sampling_rate,
            max_lag,
            time_window,
            overlap,
            format,
        } => {
            let data = load_waveform(&waveform)?;
            if data.nrows() != stations.len() {
                bail!(
                    "waveform has {} rows but {} stations were given",
                    data.nrows(),
                    stations.len()
                );
            }

            let distance_options = DistanceOptions {
                topography: !cli.no_topography,
                maps: true,
                matrix: false,
                aoi: cli.aoi.map(|rect| rect.0),
            };
            let distances = spatial_distance(&stations, &dem, &distance_options)?;
            let distance_map = flatten_maps(&distances)?;

            let options = TrackOptions {
                sampling_rate,
                max_lag,
                time_window,
                overlap,
            };
            let series = spatial_track(data.view(), distance_map.view(), &options)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string(&series)?),
                Format::Csv => print_track_csv(&series)?,
            }
        }
    }
    Ok(())
}

fn load_dem(path: &Path) -> Result<DemGrid, AnyError> {
    let ext = path.extension().and_then(std::ffi::OsStr::to_str);
    match ext {
        Some("asc") => DemGrid::from_asc(path).with_context(|| format!("loading {path:?}")),
        Some("flt") => DemGrid::from_flt(path).with_context(|| format!("loading {path:?}")),
        _ => bail!("unsupported DEM format {path:?}; expected .asc or .flt"),
    }
}

/// Reads a waveform matrix from text: one row per station, samples
/// separated by whitespace or commas.
fn load_waveform(path: &Path) -> Result<Array2<f64>, AnyError> {
    let src = std::fs::read_to_string(path).with_context(|| format!("loading {path:?}"))?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (number, line) in src.lines().enumerate() {
        let samples = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<f64>()
                    .with_context(|| format!("bad sample '{token}' on line {}", number + 1))
            })
            .collect::<Result<Vec<f64>, AnyError>>()?;
        if samples.is_empty() {
            continue;
        }
        if let Some(first) = rows.first() {
            if samples.len() != first.len() {
                bail!(
                    "waveform row {} has {} samples, expected {}",
                    number + 1,
                    samples.len(),
                    first.len()
                );
            }
        }
        rows.push(samples);
    }

    if rows.is_empty() {
        bail!("waveform file {path:?} holds no samples");
    }
    let shape = (rows.len(), rows[0].len());
    Ok(Array2::from_shape_vec(shape, rows.concat())?)
}

/// Reshapes per-station distance maps into the cells × stations matrix
/// the tracker consumes, keeping only cells finite in every map (cells
/// inside the AOI).
fn flatten_maps(distances: &DistanceSet) -> Result<Array2<f64>, AnyError> {
    let stations = distances.maps.len();
    let mut samples: Vec<f64> = Vec::new();
    let mut cells = 0;

    if let Some(first) = distances.maps.first() {
        let (rows, cols) = first.values.dim();
        for row in 0..rows {
            for col in 0..cols {
                let entry: Vec<f64> = distances
                    .maps
                    .iter()
                    .map(|map| map.values[[row, col]])
                    .collect();
                if entry.iter().all(|v| v.is_finite()) {
                    samples.extend_from_slice(&entry);
                    cells += 1;
                }
            }
        }
    }

    Ok(Array2::from_shape_vec((cells, stations), samples)?)
}

#[derive(Serialize)]
struct JsonMap<'a> {
    crs: &'a str,
    extent: &'a Extent,
    resolution: f64,
    values: Vec<Vec<f64>>,
}

#[derive(Serialize)]
struct JsonDistance<'a> {
    maps: Vec<JsonMap<'a>>,
    matrix: Option<Vec<Vec<f64>>>,
}

fn print_distance_json(result: &DistanceSet) -> Result<(), AnyError> {
    let reshaped = JsonDistance {
        maps: result
            .maps
            .iter()
            .map(|map| JsonMap {
                crs: &map.crs,
                extent: &map.extent,
                resolution: map.resolution,
                values: map.values.outer_iter().map(|row| row.to_vec()).collect(),
            })
            .collect(),
        matrix: result
            .matrix
            .as_ref()
            .map(|matrix| matrix.outer_iter().map(|row| row.to_vec()).collect()),
    };
    println!("{}", serde_json::to_string(&reshaped)?);
    Ok(())
}

fn print_distance_csv(result: &DistanceSet) -> Result<(), AnyError> {
    let Some(matrix) = result.matrix.as_ref() else {
        bail!("csv output requires the station distance matrix");
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "from,to,distance")?;
    for ((i, j), distance) in matrix.indexed_iter() {
        writeln!(stdout, "{i},{j},{distance}")?;
    }
    Ok(())
}

fn print_track_csv(series: &TrackSeries) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "time,x_mean,y_mean,amplitude_mean,variance_mean,x_sd,y_sd,amplitude_sd,variance_sd,converged"
    )?;
    for (idx, time) in series.time.iter().enumerate() {
        writeln!(
            stdout,
            "{time},{},{},{},{},{},{},{},{},{}",
            series.mean.x[idx],
            series.mean.y[idx],
            series.mean.amplitude[idx],
            series.mean.variance[idx],
            series.sd.x[idx],
            series.sd.y[idx],
            series.sd.amplitude[idx],
            series.sd.variance[idx],
            series.converged[idx],
        )?;
    }
    Ok(())
}
