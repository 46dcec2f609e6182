//! Binary model files.
//!
//! Layout (little-endian, no header magic or version):
//!
//! ```text
//! input_size:i32 hidden_size:i32 output_size:i32 learning_rate:f64 sequence_length:i32
//! w_output: output_size*hidden_size f64, row-major
//! b_output: output_size f64
//! has_norm_params:i32
//! norm_params: 12 f64 (only when has_norm_params != 0)
//! ```
//!
//! Only the output projection is stored. A loaded network gets a freshly
//! initialised recurrent cell from the caller's RNG.

use std::fs;
use std::path::Path;

use rand::Rng;

use crate::data::{NormalizationParams, NORM_PARAMS_LEN};
use crate::error::{LstmError, Result};
use crate::math::Matrix;
use crate::models::LstmNetwork;

const HEADER_LEN: usize = 4 * 3 + 8 + 4;

/// Largest network a model file may describe, counted as gate weights,
/// gate biases and the output layer together. Headers above this are
/// treated as corrupt.
pub const MAX_PARAMETERS: usize = 1 << 24;

/// Dimensions and hyperparameters stored at the start of a model file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelHeader {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub learning_rate: f64,
    pub sequence_length: usize,
}

impl ModelHeader {
    fn of(network: &LstmNetwork) -> Self {
        Self {
            input_size: network.input_size(),
            hidden_size: network.hidden_size(),
            output_size: network.output_size(),
            learning_rate: network.learning_rate(),
            sequence_length: network.sequence_length(),
        }
    }

    /// Total number of `f64` parameters in a network with these dimensions.
    fn parameter_count(&self) -> Option<usize> {
        let (i, h, o) = (self.input_size, self.hidden_size, self.output_size);
        let per_gate = h.checked_mul(i)?.checked_add(h.checked_mul(h)?)?.checked_add(h)?;
        let output = o.checked_mul(h)?.checked_add(o)?;
        per_gate.checked_mul(4)?.checked_add(output)
    }

    /// Bytes that must follow the header for the output layer and the
    /// normalization flag.
    fn body_len(&self) -> Option<usize> {
        let weights = self.output_size.checked_mul(self.hidden_size)?;
        let values = weights.checked_add(self.output_size)?;
        values.checked_mul(8)?.checked_add(4)
    }
}

fn dim_to_i32(name: &str, v: usize) -> Result<i32> {
    i32::try_from(v).map_err(|_| {
        LstmError::InvalidArgument(format!("{name} {v} does not fit the model file format"))
    })
}

/// Serialize `network` into the model file layout.
pub fn encode_model(network: &LstmNetwork) -> Result<Vec<u8>> {
    let header = ModelHeader::of(network);
    let mut buf = Vec::with_capacity(HEADER_LEN + header.body_len().unwrap_or(0));
    buf.extend_from_slice(&dim_to_i32("input_size", header.input_size)?.to_le_bytes());
    buf.extend_from_slice(&dim_to_i32("hidden_size", header.hidden_size)?.to_le_bytes());
    buf.extend_from_slice(&dim_to_i32("output_size", header.output_size)?.to_le_bytes());
    buf.extend_from_slice(&header.learning_rate.to_le_bytes());
    buf.extend_from_slice(&dim_to_i32("sequence_length", header.sequence_length)?.to_le_bytes());

    for v in network.output_weights().as_slice() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    for v in network.output_bias().as_slice() {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    match network.normalization() {
        Some(params) => {
            buf.extend_from_slice(&1i32.to_le_bytes());
            for v in params.to_array() {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        None => buf.extend_from_slice(&0i32.to_le_bytes()),
    }
    Ok(buf)
}

/// Bounds-checked little-endian reader over a byte slice.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(LstmError::CorruptModelFile(format!(
                "truncated while reading {field} at byte {}",
                self.pos
            )));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    fn read_i32(&mut self, field: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take::<4>(field)?))
    }

    fn read_f64(&mut self, field: &str) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take::<8>(field)?))
    }

    fn read_dim(&mut self, field: &str) -> Result<usize> {
        let v = self.read_i32(field)?;
        if v <= 0 {
            return Err(LstmError::CorruptModelFile(format!(
                "{field} must be positive, found {v}"
            )));
        }
        Ok(v as usize)
    }

    fn read_values(&mut self, n: usize, field: &str) -> Result<Vec<f64>> {
        let mut out = Vec::new();
        out.try_reserve_exact(n)
            .map_err(|_| LstmError::CorruptModelFile(format!("{field} too large")))?;
        for _ in 0..n {
            out.push(self.read_f64(field)?);
        }
        Ok(out)
    }
}

/// Parse and validate the fixed-size header.
pub fn decode_header(bytes: &[u8]) -> Result<ModelHeader> {
    let mut cur = Cursor::new(bytes);
    read_header(&mut cur)
}

fn read_header(cur: &mut Cursor<'_>) -> Result<ModelHeader> {
    let input_size = cur.read_dim("input_size")?;
    let hidden_size = cur.read_dim("hidden_size")?;
    let output_size = cur.read_dim("output_size")?;
    let learning_rate = cur.read_f64("learning_rate")?;
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(LstmError::CorruptModelFile(format!(
            "learning_rate must be positive, found {learning_rate}"
        )));
    }
    let sequence_length = cur.read_dim("sequence_length")?;
    let header = ModelHeader {
        input_size,
        hidden_size,
        output_size,
        learning_rate,
        sequence_length,
    };
    match header.parameter_count() {
        Some(n) if n <= MAX_PARAMETERS => Ok(header),
        _ => Err(LstmError::CorruptModelFile(format!(
            "dimensions {input_size}x{hidden_size}x{output_size} exceed {MAX_PARAMETERS} parameters"
        ))),
    }
}

/// Rebuild a network from model bytes. The recurrent cell is initialised
/// from `rng`; the output layer, hyperparameters and normalization come
/// from the file. Bytes after a complete record are ignored.
pub fn decode_model<R: Rng + ?Sized>(bytes: &[u8], rng: &mut R) -> Result<LstmNetwork> {
    let mut cur = Cursor::new(bytes);
    let header = read_header(&mut cur)?;

    // reject short files before allocating anything sized by the header
    let body = header
        .body_len()
        .ok_or_else(|| LstmError::CorruptModelFile("dimensions overflow".into()))?;
    if cur.remaining() < body {
        return Err(LstmError::CorruptModelFile(format!(
            "expected at least {body} bytes after the header, found {}",
            cur.remaining()
        )));
    }

    let w = cur.read_values(header.output_size * header.hidden_size, "output weights")?;
    let b = cur.read_values(header.output_size, "output bias")?;
    let has_norm = cur.read_i32("has_norm_params")?;
    let norm = if has_norm != 0 {
        let values = cur.read_values(NORM_PARAMS_LEN, "normalization parameters")?;
        let mut arr = [0.0; NORM_PARAMS_LEN];
        arr.copy_from_slice(&values);
        Some(NormalizationParams::from_array(arr))
    } else {
        None
    };

    let mut network = LstmNetwork::new(header.input_size, header.hidden_size, header.output_size, rng)?;
    network.set_output_layer(
        Matrix::from_vec(header.output_size, header.hidden_size, w)?,
        Matrix::from_vec(header.output_size, 1, b)?,
    )?;
    network.set_learning_rate(header.learning_rate)?;
    network.set_sequence_length(header.sequence_length)?;
    network.set_normalization(norm);
    Ok(network)
}

pub fn save_model<P: AsRef<Path>>(path: P, network: &LstmNetwork) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_model(network)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    log::info!("Saved model to {}", path.display());
    Ok(())
}

pub fn load_model<P: AsRef<Path>, R: Rng + ?Sized>(path: P, rng: &mut R) -> Result<LstmNetwork> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let network = decode_model(&bytes, rng)?;
    log::info!(
        "Loaded model from {} (input {}, hidden {}, output {})",
        path.display(),
        network.input_size(),
        network.hidden_size(),
        network.output_size()
    );
    Ok(network)
}

/// Like [`load_model`] but fails with `ShapeMismatch` when the stored
/// dimensions differ from the expected `(input, hidden, output)` sizes.
pub fn load_model_checked<P: AsRef<Path>, R: Rng + ?Sized>(
    path: P,
    expected: (usize, usize, usize),
    rng: &mut R,
) -> Result<LstmNetwork> {
    let bytes = fs::read(path.as_ref())?;
    let header = decode_header(&bytes)?;
    if header.hidden_size != expected.1 {
        return Err(LstmError::shape(
            "load_model",
            (header.output_size, header.hidden_size),
            (expected.2, expected.1),
        ));
    }
    if header.input_size != expected.0 || header.output_size != expected.2 {
        return Err(LstmError::shape(
            "load_model",
            (header.input_size, header.output_size),
            (expected.0, expected.2),
        ));
    }
    decode_model(&bytes, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn encoded_length_matches_layout() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut net = LstmNetwork::new(6, 4, 6, &mut rng).unwrap();
        let plain = encode_model(&net).unwrap();
        assert_eq!(plain.len(), HEADER_LEN + (6 * 4 + 6) * 8 + 4);

        net.set_normalization(Some(NormalizationParams::from_array([1.0; 12])));
        let with_norm = encode_model(&net).unwrap();
        assert_eq!(with_norm.len(), plain.len() + 12 * 8);
    }

    #[test]
    fn header_fields_are_little_endian() {
        let net = LstmNetwork::zeros(6, 4, 2).unwrap();
        let bytes = encode_model(&net).unwrap();
        assert_eq!(&bytes[0..4], &6i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &4i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..20], &0.001f64.to_le_bytes());
        assert_eq!(&bytes[20..24], &10i32.to_le_bytes());
    }

    #[test]
    fn every_truncation_is_reported() {
        let mut rng = StdRng::seed_from_u64(32);
        let mut net = LstmNetwork::new(2, 3, 2, &mut rng).unwrap();
        net.set_normalization(Some(NormalizationParams::from_array([0.5; 12])));
        let bytes = encode_model(&net).unwrap();
        for cut in 0..bytes.len() {
            let res = decode_model(&bytes[..cut], &mut rng);
            assert!(
                matches!(res, Err(LstmError::CorruptModelFile(_))),
                "cut at {cut} was accepted"
            );
        }
        assert!(decode_model(&bytes, &mut rng).is_ok());
    }

    #[test]
    fn non_positive_dimensions_are_corrupt() {
        let net = LstmNetwork::zeros(2, 3, 2).unwrap();
        let mut bytes = encode_model(&net).unwrap();
        bytes[4..8].copy_from_slice(&(-3i32).to_le_bytes());
        let mut rng = StdRng::seed_from_u64(33);
        assert!(matches!(
            decode_model(&bytes, &mut rng),
            Err(LstmError::CorruptModelFile(_))
        ));
    }

    #[test]
    fn oversized_input_width_is_rejected_from_the_header() {
        // a valid output layer for hidden 1, output 6 follows the header
        let mut bytes = Vec::new();
        for v in [20_000_000i32, 1, 6] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&0.001f64.to_le_bytes());
        bytes.extend_from_slice(&10i32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; (6 + 6) * 8 + 4]);
        assert!(matches!(decode_header(&bytes), Err(LstmError::CorruptModelFile(_))));
        let mut rng = StdRng::seed_from_u64(35);
        assert!(matches!(
            decode_model(&bytes, &mut rng),
            Err(LstmError::CorruptModelFile(_))
        ));
    }

    #[test]
    fn default_network_fits_parameter_cap() {
        let header = ModelHeader {
            input_size: 6,
            hidden_size: 64,
            output_size: 6,
            learning_rate: 0.001,
            sequence_length: 10,
        };
        assert!(header.parameter_count().unwrap() <= MAX_PARAMETERS);
    }

    #[test]
    fn huge_dimensions_fail_before_allocating() {
        let mut bytes = Vec::new();
        for v in [6i32, i32::MAX, i32::MAX] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&0.001f64.to_le_bytes());
        bytes.extend_from_slice(&10i32.to_le_bytes());
        let mut rng = StdRng::seed_from_u64(34);
        assert!(matches!(
            decode_model(&bytes, &mut rng),
            Err(LstmError::CorruptModelFile(_))
        ));
    }
}
