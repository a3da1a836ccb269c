//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
///
/// If the source range is empty (both ends equal) the start of the target
/// range is returned.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    if source_range.1 == source_range.0 {
        return target_range.0;
    }

    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Produce `num` evenly spaced values over `[start, stop]`, including both
/// ends.
pub fn linspace<T>(start: T, stop: T, num: usize) -> Vec<T>
where
    T: Float
{
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            let last = T::from(num - 1).unwrap_or_else(T::one);
            (0..num)
                .map(|i| {
                    let i = T::from(i).unwrap_or_else(T::zero);
                    lin_map((T::zero(), last), (start, stop), i)
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 10f64), (0f64, 1f64), 5f64), 0.5);
        assert_eq!(lin_map((0f64, 10f64), (1f64, -1f64), 10f64), -1.0);
        assert_eq!(lin_map((3f64, 3f64), (2f64, 4f64), 3f64), 2.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&1.5f64, &0.0, &1.0), 1.0);
        assert_eq!(clamp(&-0.5f64, &0.0, &1.0), 0.0);
        assert_eq!(clamp(&0.25f64, &0.0, &1.0), 0.25);
    }

    #[test]
    fn test_linspace() {
        assert!(linspace(0f64, 1f64, 0).is_empty());
        assert_eq!(linspace(0f64, 1f64, 1), vec![0.0]);
        assert_eq!(linspace(0f64, 1f64, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
