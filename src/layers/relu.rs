use crate::math::Matrix;

pub fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Step function: `1` for positive inputs, `0` otherwise (including zero).
pub fn derivative(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

pub(crate) fn forward_matrix(m: &mut Matrix) {
    m.map_inplace(relu);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        let mut m = Matrix::from_vec(1, 3, vec![-1.0, 0.0, 2.5]).unwrap();
        forward_matrix(&mut m);
        assert_eq!(m.as_slice(), &[0.0, 0.0, 2.5]);
    }

    #[test]
    fn derivative_is_zero_at_origin() {
        assert_eq!(derivative(0.0), 0.0);
        assert_eq!(derivative(1e-9), 1.0);
        assert_eq!(derivative(-3.0), 0.0);
    }
}
