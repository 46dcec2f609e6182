use crate::math::Matrix;

/// `1 - tanh(x)^2`.
pub fn derivative(x: f64) -> f64 {
    let t = x.tanh();
    1.0 - t * t
}

pub(crate) fn forward_matrix(m: &mut Matrix) {
    m.map_inplace(f64::tanh);
}
