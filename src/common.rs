mod interval;

pub use interval::Interval;

/// Generate a vec of domain values which are linearly spaced between `start` and `end` and which
/// have a count of `count`. The first value will be `start` and the last value will be `end`.
///
/// # Arguments
///
/// * `start`: the starting value of the domain, inclusive
/// * `end`: the ending value of the domain, inclusive
/// * `count`: the total number of discrete, evenly spaced values in the domain
///
/// returns: Vec<f64, Global>
///
/// # Examples
///
/// ```
/// use paramgeom::common::linear_space;
/// let domain = linear_space(0.0, 1.0, 3);
/// assert_eq!(domain, vec![0.0, 0.5, 1.0]);
/// ```
pub fn linear_space(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count < 2 {
        return vec![start; count];
    }
    let mut result = Vec::with_capacity(count);
    let step = (end - start) / (count - 1) as f64;
    for i in 0..count - 1 {
        result.push(start + i as f64 * step);
    }
    // The last value is set exactly rather than accumulated
    result.push(end);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn linear_space_hits_end_exactly() {
        let values = linear_space(0.0, 2.0 * PI, 250);
        assert_eq!(values.len(), 250);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[249], 2.0 * PI);
    }

    #[test]
    fn linear_space_short() {
        assert!(linear_space(0.0, 1.0, 0).is_empty());
        assert_eq!(linear_space(3.0, 1.0, 1), vec![3.0]);
    }
}
