//! JSON run configuration.
//!
//! ```json
//! {
//!   "sensor": { "adc_per_mip": 49.3, "pedestal_threshold": 2.0 },
//!   "layers": { "pitch": 1.0, "z": { "1": 0.0, "2": 5.35 } },
//!   "reconstruction": {
//!     "consideration": "seven",
//!     "weighting": "log_50_10",
//!     "fitting": "pol2",
//!     "probe_z": [0.0, 30.0],
//!     "parallel": true
//!   }
//! }
//! ```
//!
//! Every section and key is optional. Method names that are not recognised
//! fall back to the method default with a warning.

use crate::Result;
use hexreco_algorithms::ReconstructionConfig;
use hexreco_core::SensorConfig;
use log::warn;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    sensor: SensorConfig,
    layers: JsonLayers,
    reconstruction: JsonReconstruction,
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonLayers {
    pitch: f64,
    z: BTreeMap<i16, f64>,
}

impl Default for JsonLayers {
    fn default() -> Self {
        let defaults = ReconstructionConfig::default();
        Self {
            pitch: defaults.layer_pitch,
            z: defaults.layer_z,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonReconstruction {
    consideration: Option<String>,
    weighting: Option<String>,
    fitting: Option<String>,
    probe_z: Vec<f64>,
    parallel: bool,
}

impl Default for JsonReconstruction {
    fn default() -> Self {
        let defaults = ReconstructionConfig::default();
        Self {
            consideration: None,
            weighting: None,
            fitting: None,
            probe_z: defaults.probe_z,
            parallel: defaults.parallel,
        }
    }
}

/// Loads a run configuration from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, or holds
/// values rejected by [`ReconstructionConfig::validate`].
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReconstructionConfig> {
    let reader = BufReader::new(File::open(path)?);
    let json: JsonConfig = serde_json::from_reader(reader)?;
    from_json_config(json)
}

/// Parses a run configuration from a JSON string.
///
/// # Errors
/// Returns an error for invalid JSON or values rejected by
/// [`ReconstructionConfig::validate`].
pub fn config_from_json(json: &str) -> Result<ReconstructionConfig> {
    let json: JsonConfig = serde_json::from_str(json)?;
    from_json_config(json)
}

fn from_json_config(json: JsonConfig) -> Result<ReconstructionConfig> {
    let defaults = ReconstructionConfig::default();
    let reconstruction = json.reconstruction;

    let config = ReconstructionConfig {
        sensor: json.sensor,
        layer_z: json.layers.z,
        layer_pitch: json.layers.pitch,
        consideration: parse_method(reconstruction.consideration, defaults.consideration),
        weighting: parse_method(reconstruction.weighting, defaults.weighting),
        fitting: parse_method(reconstruction.fitting, defaults.fitting),
        probe_z: reconstruction.probe_z,
        parallel: reconstruction.parallel,
    };
    config.validate()?;
    Ok(config)
}

/// Absent names keep `fallback`; unknown names use the type's own default.
fn parse_method<M>(name: Option<String>, fallback: M) -> M
where
    M: FromStr + Default + Display,
    M::Err: Display,
{
    let Some(name) = name else {
        return fallback;
    };
    name.parse().unwrap_or_else(|err| {
        let method = M::default();
        warn!("{err}, using {method}");
        method
    })
}
