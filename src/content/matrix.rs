//! Transformation matrices and number formatting for content streams

use std::fmt;

/// 2D affine transformation matrix as written by the `cm` operator
///
/// ```text
/// | a  c  e |
/// | b  d  f |
/// | 0  0  1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl TransformMatrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Build from the six operands of a `cm` operator
    pub fn from_operands(operands: &[&str]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut values = [0.0; 6];
        for (value, text) in values.iter_mut().zip(operands) {
            *value = text.parse().ok()?;
        }
        let [a, b, c, d, e, f] = values;
        Some(Self { a, b, c, d, e, f })
    }

    /// The inverse transformation, or `None` for a singular matrix
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-10 {
            return None;
        }

        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    /// Check if this is (approximately) the identity matrix
    pub fn is_identity(&self) -> bool {
        (self.a - 1.0).abs() < 0.001
            && self.b.abs() < 0.001
            && self.c.abs() < 0.001
            && (self.d - 1.0).abs() < 0.001
            && self.e.abs() < 0.001
            && self.f.abs() < 0.001
    }
}

/// Writes the six operands followed by `cm`
impl fmt::Display for TransformMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} cm",
            Number(self.a),
            Number(self.b),
            Number(self.c),
            Number(self.d),
            Number(self.e),
            Number(self.f)
        )
    }
}

/// A coordinate formatted the way content streams expect it
///
/// Whole numbers print without a fractional part and negative zero prints as
/// `0`; everything else uses the shortest representation that reads back to
/// the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number(pub f64);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value == 0.0 {
            f.write_str("0")
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            write!(f, "{}", value as i64)
        } else {
            write!(f, "{}", value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_format() {
        assert_eq!(Number(842.0).to_string(), "842");
        assert_eq!(Number(-842.0).to_string(), "-842");
        assert_eq!(Number(-0.0).to_string(), "0");
        assert_eq!(Number(12.5).to_string(), "12.5");
        assert_eq!(Number(0.24).to_string(), "0.24");
    }

    #[test]
    fn test_from_operands() {
        let m = TransformMatrix::from_operands(&["0", "1", "1", "0", "0", "842"]).unwrap();
        assert_eq!(m, TransformMatrix { a: 0.0, b: 1.0, c: 1.0, d: 0.0, e: 0.0, f: 842.0 });
        assert!(TransformMatrix::from_operands(&["1", "0", "0", "1"]).is_none());
        assert!(TransformMatrix::from_operands(&["1", "0", "0", "1", "x", "0"]).is_none());
    }

    #[test]
    fn test_landscape_inverse() {
        let m = TransformMatrix { a: 0.0, b: 1.0, c: 1.0, d: 0.0, e: 0.0, f: 842.0 };
        let inv = m.inverse().unwrap();
        assert_eq!(inv.to_string(), "0 1 1 0 -842 0 cm");
    }

    #[test]
    fn test_scale_inverse() {
        let m = TransformMatrix { a: 0.5, b: 0.0, c: 0.0, d: 0.25, e: 10.0, f: 20.0 };
        let inv = m.inverse().unwrap();
        assert_eq!(inv.to_string(), "2 0 0 4 -20 -80 cm");
    }

    #[test]
    fn test_singular_matrix() {
        let m = TransformMatrix { a: 1.0, b: 2.0, c: 2.0, d: 4.0, e: 0.0, f: 0.0 };
        assert!(m.inverse().is_none());
    }

    #[test]
    fn test_is_identity() {
        assert!(TransformMatrix::identity().is_identity());
        let m = TransformMatrix::identity();
        assert!(m.inverse().unwrap().is_identity());
    }
}
