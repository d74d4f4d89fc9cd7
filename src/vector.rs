//! Vectors whose components are symbolic expressions, used to build tangent vectors, surface
//! normals, and their norms before anything is evaluated numerically.

use crate::expr::{Expression, Param};
use crate::{CalcError, Result};
use parry3d_f64::na::SVector;

/// An ordered tuple of `D` expressions
#[derive(Debug, Clone, PartialEq)]
pub struct ExprVector<const D: usize> {
    components: [Expression; D],
}

pub type ExprVector2 = ExprVector<2>;
pub type ExprVector3 = ExprVector<3>;

impl<const D: usize> ExprVector<D> {
    pub fn new(components: [Expression; D]) -> Self {
        Self { components }
    }

    /// Parse each component from text. The first component which fails to parse determines the
    /// error.
    ///
    /// # Arguments
    ///
    /// * `texts`: the formula for each component
    /// * `params`: the parameters the formulas may reference
    ///
    /// returns: Result<ExprVector<{ D }>, CalcError>
    ///
    /// # Examples
    ///
    /// ```
    /// use paramgeom::vector::ExprVector3;
    /// use paramgeom::Param;
    ///
    /// let r = ExprVector3::parse(["u", "v", "u*v"], &[Param::U, Param::V]).unwrap();
    /// let n = r.diff(Param::U).cross(&r.diff(Param::V));
    /// assert_eq!(n.evaluate(2.0, 3.0).unwrap(), paramgeom::Vector3::new(-3.0, -2.0, 1.0));
    /// ```
    pub fn parse(texts: [&str; D], params: &[Param]) -> Result<Self> {
        let mut parsed = Vec::with_capacity(D);
        for text in texts {
            parsed.push(Expression::parse(text, params)?);
        }
        let components = parsed
            .try_into()
            .map_err(|_| CalcError::Construction(format!("expected {D} components")))?;
        Ok(Self { components })
    }

    pub fn components(&self) -> &[Expression; D] {
        &self.components
    }

    /// The component-wise partial derivative with respect to `p`, i.e. the tangent vector when
    /// this vector is a position
    pub fn diff(&self, p: Param) -> Self {
        Self::new(std::array::from_fn(|i| self.components[i].diff(p)))
    }

    pub fn dot(&self, other: &Self) -> Expression {
        self.components
            .iter()
            .zip(other.components.iter())
            .fold(Expression::constant(0.0), |acc, (a, b)| &acc + &(a * b))
    }

    /// The Euclidean norm, sqrt of the sum of the squared components
    pub fn norm(&self) -> Expression {
        self.components
            .iter()
            .fold(Expression::constant(0.0), |acc, c| &acc + &c.powi(2))
            .sqrt()
    }

    /// Evaluate every component at the given parameter values
    pub fn evaluate(&self, u: f64, v: f64) -> Result<SVector<f64, D>> {
        let mut values = [0.0; D];
        for (value, c) in values.iter_mut().zip(self.components.iter()) {
            *value = c.evaluate(u, v)?;
        }
        Ok(SVector::from(values))
    }
}

impl ExprVector<3> {
    /// The cross product by the determinant formula
    pub fn cross(&self, other: &Self) -> Self {
        let [a1, a2, a3] = &self.components;
        let [b1, b2, b3] = &other.components;
        Self::new([
            &(a2 * b3) - &(a3 * b2),
            &(a3 * b1) - &(a1 * b3),
            &(a1 * b2) - &(a2 * b1),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector3;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const UV: [Param; 2] = [Param::U, Param::V];

    fn sphere() -> ExprVector3 {
        ExprVector3::parse(["sin(u)*cos(v)", "sin(u)*sin(v)", "cos(u)"], &UV).unwrap()
    }

    #[test]
    fn flat_square_normal_folds() {
        let r = ExprVector3::parse(["u", "v", "0"], &UV).unwrap();
        let n = r.diff(Param::U).cross(&r.diff(Param::V));
        assert_eq!(n.components()[0].as_constant(), Some(0.0));
        assert_eq!(n.components()[1].as_constant(), Some(0.0));
        assert_eq!(n.components()[2].as_constant(), Some(1.0));
        assert_eq!(n.norm().as_constant(), Some(1.0));
    }

    #[test]
    fn tilted_plane_normal() {
        let r = ExprVector3::parse(["u", "v", "u + v"], &UV).unwrap();
        let n = r.diff(Param::U).cross(&r.diff(Param::V));
        assert_relative_eq!(n.norm().as_constant().unwrap(), 3f64.sqrt());
    }

    #[test]
    fn cross_is_anticommutative_and_orthogonal() {
        let r = sphere();
        let a = r.diff(Param::U);
        let b = r.diff(Param::V);
        let ab = a.cross(&b);
        let ba = b.cross(&a);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let u = rng.random_range(0.0..3.0);
            let v = rng.random_range(0.0..6.0);
            let n = ab.evaluate(u, v).unwrap();
            assert_relative_eq!(n, -ba.evaluate(u, v).unwrap(), epsilon = 1e-12);
            assert_relative_eq!(n.dot(&a.evaluate(u, v).unwrap()), 0.0, epsilon = 1e-12);
            assert_relative_eq!(n.dot(&b.evaluate(u, v).unwrap()), 0.0, epsilon = 1e-12);
            assert_relative_eq!(ab.dot(&a).evaluate(u, v).unwrap(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn symbolic_cross_matches_numeric_cross() {
        let r = sphere();
        let a = r.diff(Param::U);
        let b = r.diff(Param::V);
        let n = a.cross(&b);
        let (u, v) = (0.8, 2.1);
        let expected: Vector3 = a.evaluate(u, v).unwrap().cross(&b.evaluate(u, v).unwrap());
        assert_relative_eq!(n.evaluate(u, v).unwrap(), expected, epsilon = 1e-12);
        // The sphere's surface element is |sin(u)|
        assert_relative_eq!(n.norm().evaluate(u, v).unwrap(), u.sin(), epsilon = 1e-12);
    }

    #[test]
    fn norm_of_2d_tangent() {
        let r = ExprVector2::parse(["cos(u)", "sin(u)"], &[Param::U]).unwrap();
        let t = r.diff(Param::U);
        for u in [0.0, 0.3, 2.0, 5.5] {
            assert_relative_eq!(t.norm().evaluate(u, 0.0).unwrap(), 1.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn parse_error_propagates() {
        let e = ExprVector3::parse(["u", "(v", "0"], &UV).unwrap_err();
        assert_eq!(e.kind(), crate::ErrorKind::Parse);
    }
}
