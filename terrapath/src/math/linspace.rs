use num_traits::{Float, FromPrimitive};

/// Returns `n` evenly spaced values from `y_start` to `y_end`,
/// endpoints included. A single-point span degenerates to `y_start`.
pub fn linspace<T>(y_start: T, y_end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + FromPrimitive,
{
    let dy = if n > 1 {
        (y_end - y_start) / T::from(n - 1).unwrap()
    } else {
        T::zero()
    };
    (0..n).map(move |x| y_start + T::from(x).unwrap() * dy)
}

#[cfg(test)]
mod tests {
    use super::linspace;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let ys: Vec<f64> = linspace(2.0, 10.0, 5).collect();
        assert_eq!(ys.len(), 5);
        assert_relative_eq!(ys[0], 2.0);
        assert_relative_eq!(ys[1], 4.0);
        assert_relative_eq!(ys[4], 10.0);
    }

    #[test]
    fn test_linspace_single_point() {
        let ys: Vec<f64> = linspace(3.5, 9.0, 1).collect();
        assert_eq!(ys, vec![3.5]);
    }

    #[test]
    fn test_linspace_empty() {
        assert_eq!(linspace(0.0_f64, 1.0, 0).count(), 0);
    }

    #[test]
    fn test_linspace_descending() {
        let ys: Vec<f64> = linspace(1.0, -1.0, 3).collect();
        assert_relative_eq!(ys[1], 0.0);
        assert_relative_eq!(ys[2], -1.0);
    }
}
