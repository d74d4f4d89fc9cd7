//! The 15-point Kronrod rule with its embedded 7-point Gauss rule.

use crate::Result;

/// Kronrod abscissae on [-1, 1], largest first. The odd entries are the Gauss abscissae.
const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144845693013,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.000000000000000000000000000000000,
];

const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];

const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

pub(crate) const POINTS: usize = 15;

/// The result of applying the rule to one segment
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub a: f64,
    pub b: f64,
    pub value: f64,
    pub error: f64,
}

impl Segment {
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.a + self.b)
    }
}

/// Applies the G7/K15 pair to `f` over [a, b]. The error estimate is the scaled difference
/// between the two rules, floored at the round-off level of the integrand's magnitude.
pub(crate) fn qk15<F>(f: &mut F, a: f64, b: f64) -> Result<Segment>
where
    F: FnMut(f64) -> Result<f64>,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let fc = f(center)?;
    let mut res_g = fc * WG[3];
    let mut res_k = fc * WGK[7];
    let mut res_abs = res_k.abs();

    let mut f1 = [0.0; 7];
    let mut f2 = [0.0; 7];
    for (j, (y1, y2)) in f1.iter_mut().zip(f2.iter_mut()).enumerate() {
        let x = half * XGK[j];
        *y1 = f(center - x)?;
        *y2 = f(center + x)?;
        let sum = *y1 + *y2;
        res_k += WGK[j] * sum;
        res_abs += WGK[j] * (y1.abs() + y2.abs());
        if j % 2 == 1 {
            res_g += WG[j / 2] * sum;
        }
    }

    let mean = 0.5 * res_k;
    let mut res_asc = WGK[7] * (fc - mean).abs();
    for j in 0..7 {
        res_asc += WGK[j] * ((f1[j] - mean).abs() + (f2[j] - mean).abs());
    }

    let scale = half.abs();
    let value = res_k * half;
    res_abs *= scale;
    res_asc *= scale;

    let mut error = ((res_k - res_g) * half).abs();
    if res_asc != 0.0 && error != 0.0 {
        error = res_asc * (200.0 * error / res_asc).powf(1.5).min(1.0);
    }
    if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(50.0 * f64::EPSILON * res_abs);
    }

    Ok(Segment { a, b, value, error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test]
    fn weights_sum_to_two() {
        let k: f64 = WGK[7] + 2.0 * WGK[..7].iter().sum::<f64>();
        let g: f64 = WG[3] + 2.0 * WG[..3].iter().sum::<f64>();
        assert_relative_eq!(k, 2.0, epsilon = 1e-14);
        assert_relative_eq!(g, 2.0, epsilon = 1e-14);
    }

    /// The Gauss rule is exact to degree 13 and the Kronrod rule to degree 22, so both agree on
    /// low order polynomials and the error estimate collapses to the round-off floor
    #[test_case(0)]
    #[test_case(1)]
    #[test_case(5)]
    #[test_case(13)]
    fn exact_for_polynomials(n: i32) {
        let mut f = |x: f64| Ok(x.powi(n));
        let s = qk15(&mut f, 0.0, 2.0).unwrap();
        let expected = 2f64.powi(n + 1) / (n + 1) as f64;
        assert_relative_eq!(s.value, expected, max_relative = 1e-14);
        assert!(s.error < 1e-10 * expected);
    }

    #[test]
    fn reversed_segment_is_negative() {
        let mut f = |x: f64| Ok(x.cos());
        let s = qk15(&mut f, 1.0, 0.0).unwrap();
        assert_relative_eq!(s.value, -1f64.sin(), epsilon = 1e-14);
    }

    #[test]
    fn evaluates_fifteen_points() {
        let mut count = 0;
        let mut f = |x: f64| {
            count += 1;
            Ok(x)
        };
        qk15(&mut f, -1.0, 3.0).unwrap();
        assert_eq!(count, POINTS);
    }

    #[test]
    fn rough_integrand_has_large_error() {
        let mut f = |x: f64| Ok(x.abs().sqrt());
        let s = qk15(&mut f, -1.0, 1.0).unwrap();
        // A single rule is only good to a few percent on the cusp at 0
        assert!(s.error > 1e-6);
        assert_relative_eq!(s.value, 4.0 / 3.0, epsilon = 5e-2);
        assert!((s.value - 4.0 / 3.0).abs() > 1e-3);
    }

    #[test]
    fn integrand_errors_propagate() {
        let mut f = |x: f64| {
            if x > 0.5 {
                Err(crate::CalcError::Evaluation("too far".into()))
            } else {
                Ok(x)
            }
        };
        assert!(qk15(&mut f, 0.0, 1.0).is_err());
    }
}
