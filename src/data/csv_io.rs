use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;
use super::weather::{WeatherDataset, WeatherPoint, FEATURES, FEATURE_NAMES};

/// Read a weather CSV from `path`. See [`read_csv`].
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<WeatherDataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = read_csv(file)?;
    log::info!("Loaded {} weather data points from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Parse weather observations from CSV text.
///
/// The first row is a header. When it mentions `timestamp` the first two
/// columns (timestamp and unix timestamp) are skipped; otherwise the six
/// features start at column zero. Rows that do not yield six numbers are
/// skipped with a warning.
pub fn read_csv<R: Read>(reader: R) -> Result<WeatherDataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let has_timestamps = rdr.headers()?.iter().any(|h| h.contains("timestamp"));
    if has_timestamps {
        log::debug!("Detected CSV format with timestamps");
    } else {
        log::debug!("Detected legacy CSV format without timestamps");
    }
    let offset = if has_timestamps { 2 } else { 0 };

    let mut dataset = WeatherDataset::with_capacity(1000);
    for (idx, record) in rdr.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Invalid data format at line {line}: {e}");
                continue;
            }
        };
        let values: Vec<f64> = record
            .iter()
            .skip(offset)
            .take(FEATURES)
            .map_while(|field| field.parse::<f64>().ok())
            .collect();
        if values.len() != FEATURES {
            log::warn!(
                "Invalid data format at line {line} (parsed {} fields)",
                values.len()
            );
            continue;
        }
        let mut v = [0.0; FEATURES];
        v.copy_from_slice(&values);
        dataset.push(WeatherPoint::from_array(v));
    }
    Ok(dataset)
}

/// Write `dataset` to `path` as CSV. See [`write_csv`].
pub fn save_csv<P: AsRef<Path>>(path: P, dataset: &WeatherDataset) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_csv(file, dataset)?;
    log::info!("Saved {} weather data points to {}", dataset.len(), path.display());
    Ok(())
}

/// Write a header row followed by one row per point. Values use two
/// decimals, precipitation four.
pub fn write_csv<W: Write>(writer: W, dataset: &WeatherDataset) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(FEATURE_NAMES)?;
    for p in dataset {
        wtr.write_record([
            format!("{:.2}", p.temperature),
            format!("{:.2}", p.pressure),
            format!("{:.2}", p.humidity),
            format!("{:.2}", p.wind_speed),
            format!("{:.2}", p.wind_direction),
            format!("{:.4}", p.precipitation),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_legacy_format() {
        let text = "temperature,pressure,humidity,wind_speed,wind_direction,precipitation\n\
                    45.0,30.0,60.0,8.0,180.0,0.0\n\
                    47.0,29.9,65.0,10.0,175.0,0.1\n";
        let ds = read_csv(text.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().precipitation, 0.1);
    }

    #[test]
    fn skips_timestamp_columns() {
        let text = "timestamp,unix_timestamp,temperature,pressure,humidity,wind_speed,wind_direction,precipitation\n\
                    2024-01-01T00:00:00,1704067200,45.0,30.0,60.0,8.0,180.0,0.0\n";
        let ds = read_csv(text.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(0).unwrap().temperature, 45.0);
        assert_eq!(ds.get(0).unwrap().wind_direction, 180.0);
    }

    #[test]
    fn skips_malformed_rows() {
        let text = "temperature,pressure,humidity,wind_speed,wind_direction,precipitation\n\
                    45.0,30.0,60.0\n\
                    abc,30.0,60.0,8.0,180.0,0.0\n\
                    46.0,30.0,60.0,8.0,180.0,0.0\n";
        let ds = read_csv(text.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(0).unwrap().temperature, 46.0);
    }

    #[test]
    fn writes_header_and_fixed_precision() {
        let ds: WeatherDataset = vec![WeatherPoint::from_array([45.0, 30.0, 60.0, 8.0, 180.0, 0.12345])].into();
        let mut out = Vec::new();
        write_csv(&mut out, &ds).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "temperature,pressure,humidity,wind_speed,wind_direction,precipitation\n\
             45.00,30.00,60.00,8.00,180.00,0.1235\n"
        );
    }
}
