use crate::math::Matrix;

/// Logistic function `1 / (1 + e^-x)`.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the logistic function evaluated at the pre-activation `x`.
pub fn derivative(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

pub(crate) fn forward_matrix(m: &mut Matrix) {
    m.map_inplace(sigmoid);
}
