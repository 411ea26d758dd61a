//! Thermophysical profiles absorption datasets are evaluated against.

use std::collections::BTreeMap;

use crate::ckdkit_errors::CkdkitError;
use crate::constants::X_PREFIX;

/// Altitude profile of pressure, temperature and species concentrations.
///
/// * `z`: altitude of each layer (m),
/// * `p`: pressure (Pa),
/// * `t`: temperature (K),
/// * `x`: concentration of each species, keyed by species name (`H2O`, `CO2`,
///   ...) and matched against the `x_<species>` coordinates of datasets. Values
///   are expressed in the units of the dataset coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoProfile {
    z: Vec<f64>,
    p: Vec<f64>,
    t: Vec<f64>,
    x: BTreeMap<String, Vec<f64>>,
}

impl ThermoProfile {
    pub fn new(z: Vec<f64>, p: Vec<f64>, t: Vec<f64>) -> Result<Self, CkdkitError> {
        if z.is_empty() {
            return Err(CkdkitError::InvalidArgument(
                "thermophysical profile has no layer".into(),
            ));
        }
        if p.len() != z.len() || t.len() != z.len() {
            return Err(CkdkitError::InvalidArgument(format!(
                "profile arrays differ in length: z = {}, p = {}, t = {}",
                z.len(),
                p.len(),
                t.len()
            )));
        }
        if let Some(v) = p.iter().chain(&t).find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(CkdkitError::InvalidArgument(format!(
                "pressure and temperature must be finite and non-negative, got {v}"
            )));
        }
        Ok(ThermoProfile {
            z,
            p,
            t,
            x: BTreeMap::new(),
        })
    }

    /// Add (or replace) the concentration profile of `species`.
    pub fn with_concentration(
        mut self,
        species: &str,
        values: Vec<f64>,
    ) -> Result<Self, CkdkitError> {
        if values.len() != self.z.len() {
            return Err(CkdkitError::InvalidArgument(format!(
                "concentration of '{species}' has {} values for {} layers",
                values.len(),
                self.z.len()
            )));
        }
        let species = species.strip_prefix(X_PREFIX).unwrap_or(species);
        self.x.insert(species.to_string(), values);
        Ok(self)
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn p(&self) -> &[f64] {
        &self.p
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn n_layers(&self) -> usize {
        self.z.len()
    }

    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.x.keys().map(String::as_str)
    }

    /// Concentration profile for a species name or an `x_<species>` coordinate name.
    pub fn concentration(&self, name: &str) -> Option<&[f64]> {
        let species = name.strip_prefix(X_PREFIX).unwrap_or(name);
        self.x.get(species).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod test_thermoprops {
    use super::*;

    #[test]
    fn test_profile() {
        let profile =
            ThermoProfile::new(vec![0.0, 1000.0], vec![101325.0, 90000.0], vec![288.0, 281.5])
                .unwrap()
                .with_concentration("H2O", vec![0.01, 0.005])
                .unwrap()
                .with_concentration("x_CO2", vec![4e-4, 4e-4])
                .unwrap();
        assert_eq!(profile.n_layers(), 2);
        assert_eq!(profile.concentration("x_H2O"), Some(&[0.01, 0.005][..]));
        assert_eq!(profile.concentration("CO2"), Some(&[4e-4, 4e-4][..]));
        assert_eq!(profile.species().collect::<Vec<_>>(), vec!["CO2", "H2O"]);
        assert!(profile.concentration("O3").is_none());
    }

    #[test]
    fn test_invalid_profiles() {
        assert!(ThermoProfile::new(vec![], vec![], vec![]).is_err());
        assert!(ThermoProfile::new(vec![0.0], vec![1.0, 2.0], vec![288.0]).is_err());
        assert!(ThermoProfile::new(vec![0.0], vec![-1.0], vec![288.0]).is_err());
        let profile = ThermoProfile::new(vec![0.0], vec![1.0], vec![288.0]).unwrap();
        assert!(profile.with_concentration("H2O", vec![]).is_err());
    }
}
