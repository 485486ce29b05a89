//! Per-model calibration, tiled to the point layout a packet produces, with
//! optional user overrides and single-threaded memoized lookup.

use crate::error::{Error, Result};
use crate::velodyne::consts::{hdl_32e, hdl_64, vlp_16, vlp_32c, vls_128};
use crate::velodyne::model::Model;
use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::rc::Rc;

/// Calibration data for one model, tiled out so that index `i` applies
/// directly to the `i`-th point decoded from a packet's firing rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    model: Model,
    dist_correction_m: Vec<f64>,
    rot_correction_rad: Vec<f64>,
    elevation_sin: Vec<f64>,
    elevation_cos: Vec<f64>,
    dist_scalar: f64,
}

impl Calibration {
    pub fn model(&self) -> Model {
        self.model
    }

    pub fn dist_correction_m(&self) -> &[f64] {
        &self.dist_correction_m
    }

    pub fn rot_correction_rad(&self) -> &[f64] {
        &self.rot_correction_rad
    }

    pub fn elevation_sin(&self) -> &[f64] {
        &self.elevation_sin
    }

    pub fn elevation_cos(&self) -> &[f64] {
        &self.elevation_cos
    }

    pub fn dist_scalar(&self) -> f64 {
        self.dist_scalar
    }

    /// Number of tiled entries, i.e. `channel_count * tile_multiplier`.
    pub fn len(&self) -> usize {
        self.dist_correction_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concatenates `slice` with itself `multiplier` times, i.e. `np.tile`
/// whole-array semantics. A `multiplier` of 1 returns `slice` unchanged.
fn tile(slice: &[f64], multiplier: usize) -> Vec<f64> {
    itertools::repeat_n(slice, multiplier)
        .flatten()
        .copied()
        .collect()
}

fn raw_tables(model: Model) -> (&'static [f64], &'static [f64], &'static [f64], f64) {
    match model {
        Model::Vlp16 => (
            &vlp_16::DIST_CORRECTION_CM,
            &vlp_16::ROT_CORRECTION_DEG,
            &vlp_16::VERT_ANGLE_DEG,
            vlp_16::DIST_SCALAR,
        ),
        Model::Vlp32c => (
            &vlp_32c::DIST_CORRECTION_CM,
            &vlp_32c::ROT_CORRECTION_DEG,
            &vlp_32c::VERT_ANGLE_DEG,
            vlp_32c::DIST_SCALAR,
        ),
        Model::Vls128 => (
            &vls_128::DIST_CORRECTION_CM,
            &vls_128::ROT_CORRECTION_DEG,
            &vls_128::VERT_ANGLE_DEG,
            vls_128::DIST_SCALAR,
        ),
        Model::Hdl64 => (
            &hdl_64::DIST_CORRECTION_CM,
            &hdl_64::ROT_CORRECTION_DEG,
            &hdl_64::VERT_ANGLE_DEG,
            hdl_64::DIST_SCALAR,
        ),
        Model::Hdl32e => (
            &hdl_32e::DIST_CORRECTION_CM,
            &hdl_32e::ROT_CORRECTION_DEG,
            &hdl_32e::VERT_ANGLE_DEG,
            hdl_32e::DIST_SCALAR,
        ),
    }
}

fn build_calibration(model: Model, overrides: Option<&ModelOverride>) -> Result<Calibration> {
    let (dist_cm, rot_deg, vert_deg, dist_scalar) = raw_tables(model);
    let channel_count = model.channel_count();

    let dist_cm: Vec<f64> = match overrides.and_then(|o| o.dist_correction_cm.as_ref()) {
        Some(values) => {
            if values.len() != channel_count {
                return Err(Error::InvalidOverrideLength {
                    model: model.name(),
                    field: "dist_correction_cm",
                    expected: channel_count,
                    found: values.len(),
                });
            }
            values.clone()
        }
        None => dist_cm.to_vec(),
    };
    let rot_deg: Vec<f64> = match overrides.and_then(|o| o.rot_correction_deg.as_ref()) {
        Some(values) => {
            if values.len() != channel_count {
                return Err(Error::InvalidOverrideLength {
                    model: model.name(),
                    field: "rot_correction_deg",
                    expected: channel_count,
                    found: values.len(),
                });
            }
            values.clone()
        }
        None => rot_deg.to_vec(),
    };
    let vert_deg: Vec<f64> = match overrides.and_then(|o| o.vert_angle_deg.as_ref()) {
        Some(values) => {
            if values.len() != channel_count {
                return Err(Error::InvalidOverrideLength {
                    model: model.name(),
                    field: "vert_angle_deg",
                    expected: channel_count,
                    found: values.len(),
                });
            }
            values.clone()
        }
        None => vert_deg.to_vec(),
    };

    let dist_correction_m: Vec<f64> = dist_cm.iter().map(|cm| cm * 0.01).collect();
    let rot_correction_rad: Vec<f64> = rot_deg.iter().map(|deg| deg.to_radians()).collect();
    let elevation_rad: Vec<f64> = vert_deg.iter().map(|deg| deg * PI / 180.0).collect();
    let elevation_sin: Vec<f64> = elevation_rad.iter().map(|rad| rad.sin()).collect();
    let elevation_cos: Vec<f64> = elevation_rad.iter().map(|rad| rad.cos()).collect();

    let multiplier = model.tile_multiplier();
    Ok(Calibration {
        model,
        dist_correction_m: tile(&dist_correction_m, multiplier),
        rot_correction_rad: tile(&rot_correction_rad, multiplier),
        elevation_sin: tile(&elevation_sin, multiplier),
        elevation_cos: tile(&elevation_cos, multiplier),
        dist_scalar,
    })
}

/// Per-model override of one or more calibration arrays, loaded from a
/// [`CalibrationOverrides`] document. Every present array must have exactly
/// `model.channel_count()` entries, in channel order, pre-tiling.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct ModelOverride {
    #[serde(default)]
    pub dist_correction_cm: Option<Vec<f64>>,
    #[serde(default)]
    pub rot_correction_deg: Option<Vec<f64>>,
    #[serde(default)]
    pub vert_angle_deg: Option<Vec<f64>>,
}

/// User-supplied replacement for one or more sensors' factory calibration,
/// loaded from a YAML document.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct CalibrationOverrides {
    #[serde(default)]
    pub vlp16: Option<ModelOverride>,
    #[serde(default)]
    pub vlp32c: Option<ModelOverride>,
    #[serde(default)]
    pub vls128: Option<ModelOverride>,
    #[serde(default)]
    pub hdl64: Option<ModelOverride>,
    #[serde(default)]
    pub hdl32e: Option<ModelOverride>,
}

impl CalibrationOverrides {
    /// Loads overrides from a YAML document.
    pub fn from_str(text: &str) -> Result<Self> {
        let overrides: Self = serde_yaml::from_str(text)
            .map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;
        Ok(overrides)
    }

    fn for_model(&self, model: Model) -> Option<&ModelOverride> {
        match model {
            Model::Vlp16 => self.vlp16.as_ref(),
            Model::Vlp32c => self.vlp32c.as_ref(),
            Model::Vls128 => self.vls128.as_ref(),
            Model::Hdl64 => self.hdl64.as_ref(),
            Model::Hdl32e => self.hdl32e.as_ref(),
        }
    }
}

/// Builds and memoizes [`Calibration`] values, one per model actually
/// requested. `!Sync` by design: a single stream's calibration lookups
/// never need to cross threads, and `Rc` gives pointer-stable sharing
/// without atomic overhead.
#[derive(Debug, Clone, Default)]
pub struct CalibrationProvider {
    overrides: CalibrationOverrides,
    cache: Rc<RefCell<HashMap<Model, Rc<Calibration>>>>,
}

impl CalibrationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: CalibrationOverrides) -> Self {
        Self {
            overrides,
            cache: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Returns the tiled calibration for `model`, building and caching it
    /// on first request. Repeated calls for the same model return the same
    /// `Rc` allocation (`Rc::ptr_eq` holds across calls).
    pub fn calibration_for(&self, model: Model) -> Result<Rc<Calibration>> {
        if let Some(existing) = self.cache.borrow().get(&model) {
            return Ok(Rc::clone(existing));
        }
        let built = Rc::new(build_calibration(model, self.overrides.for_model(model))?);
        self.cache.borrow_mut().insert(model, Rc::clone(&built));
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_concatenates_whole_arrays() {
        let base = [1.0, 2.0, 3.0];
        assert_eq!(tile(&base, 1), vec![1.0, 2.0, 3.0]);
        assert_eq!(
            tile(&base, 3),
            vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn vls_128_tiles_to_384_entries() {
        let provider = CalibrationProvider::new();
        let cal = provider.calibration_for(Model::Vls128).unwrap();
        assert_eq!(cal.len(), 128 * 3);
        // tiled[i] repeats the channel table every 128 entries.
        assert_eq!(cal.dist_scalar(), 1.0 / 250.0);
    }

    #[test]
    fn calibration_for_is_pointer_stable() {
        let provider = CalibrationProvider::new();
        let first = provider.calibration_for(Model::Vlp16).unwrap();
        let second = provider.calibration_for(Model::Vlp16).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn hdl_64_dist_correction_is_scaled_to_meters() {
        let provider = CalibrationProvider::new();
        let cal = provider.calibration_for(Model::Hdl64).unwrap();
        assert!((cal.dist_correction_m()[0] - 1.2433361).abs() < 1e-6);
    }

    #[test]
    fn override_with_wrong_length_errors() {
        let overrides = CalibrationOverrides {
            vlp16: Some(ModelOverride {
                dist_correction_cm: Some(vec![0.0; 3]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let provider = CalibrationProvider::with_overrides(overrides);
        let err = provider.calibration_for(Model::Vlp16).unwrap_err();
        assert!(matches!(err, Error::InvalidOverrideLength { .. }));
    }

    #[test]
    fn override_replaces_factory_table() {
        let overrides = CalibrationOverrides {
            vlp16: Some(ModelOverride {
                dist_correction_cm: Some(vec![1.0; 32]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let provider = CalibrationProvider::with_overrides(overrides);
        let cal = provider.calibration_for(Model::Vlp16).unwrap();
        assert!((cal.dist_correction_m()[0] - 0.01).abs() < 1e-12);
    }
}
