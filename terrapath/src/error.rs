use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("path sample at ({x}, {y}) lies outside the elevation grid")]
    OffGrid { x: f64, y: f64 },
}
