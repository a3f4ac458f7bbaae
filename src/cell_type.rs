//! Cell type schemas.
//!
//! A [`CellType`] declares the parameter names a model understands together
//! with their defaults. Populations resolve exactly these parameters, and the
//! exchange format stores exactly these columns.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parameters::ParameterSpec;

pub const EXCITATORY: &str = "excitatory";
pub const INHIBITORY: &str = "inhibitory";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellType {
    pub name: String,
    pub parameters: Vec<(String, f64)>,
    pub initial_values: Vec<(String, f64)>,
    pub receptor_types: Vec<String>,
    pub recordables: Vec<String>,
}

impl CellType {
    pub fn new(name: impl Into<String>, parameters: &[(&str, f64)]) -> Self {
        Self {
            name: name.into(),
            parameters: to_owned_pairs(parameters),
            initial_values: Vec::new(),
            receptor_types: vec![EXCITATORY.to_owned(), INHIBITORY.to_owned()],
            recordables: vec!["spikes".to_owned()],
        }
    }

    pub fn with_initial_values(mut self, initial_values: &[(&str, f64)]) -> Self {
        self.initial_values = to_owned_pairs(initial_values);
        self
    }

    pub fn with_recordables(mut self, recordables: &[&str]) -> Self {
        self.recordables = recordables.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(name, _)| name.as_str())
    }

    pub fn default_value(&self, name: &str) -> Option<f64> {
        lookup(&self.parameters, name)
    }

    pub fn default_initial_value(&self, name: &str) -> Option<f64> {
        lookup(&self.initial_values, name)
    }

    pub fn has_receptor_type(&self, receptor_type: &str) -> bool {
        self.receptor_types.iter().any(|r| r == receptor_type)
    }

    pub fn can_record(&self, variable: &str) -> bool {
        self.recordables.iter().any(|r| r == variable)
    }

    /// A cell spec with every parameter at its default.
    pub fn spec(&self) -> CellSpec {
        CellSpec {
            cell_type: self.clone(),
            parameters: Vec::new(),
        }
    }
}

fn to_owned_pairs(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

fn lookup(pairs: &[(String, f64)], name: &str) -> Option<f64> {
    pairs
        .iter()
        .find(|(candidate, _)| candidate == name)
        .map(|(_, value)| *value)
}

/// A cell type plus parameter overrides, not yet resolved to per-cell arrays.
#[derive(Debug, Clone)]
pub struct CellSpec {
    pub cell_type: CellType,
    pub parameters: Vec<(String, ParameterSpec)>,
}

impl CellSpec {
    /// Overrides `name`. Later overrides of the same name win.
    pub fn with(mut self, name: &str, spec: impl Into<ParameterSpec>) -> Result<Self> {
        if self.cell_type.default_value(name).is_none() {
            return Err(Error::InvalidParameterSpec(format!(
                "{} has no parameter {}",
                self.cell_type.name, name
            )));
        }

        self.parameters.retain(|(existing, _)| existing != name);
        self.parameters.push((name.to_owned(), spec.into()));
        Ok(self)
    }

    /// The spec for `name`: the override if present, the default otherwise.
    pub fn get(&self, name: &str) -> Option<ParameterSpec> {
        self.parameters
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, spec)| spec.clone())
            .or_else(|| self.cell_type.default_value(name).map(ParameterSpec::Constant))
    }
}

pub fn if_curr_alpha() -> CellType {
    current_based("IF_curr_alpha", 0.5, 0.5)
}

pub fn if_curr_exp() -> CellType {
    current_based("IF_curr_exp", 5.0, 5.0)
}

pub fn if_cond_alpha() -> CellType {
    conductance_based("IF_cond_alpha", 0.3, 0.5)
}

pub fn if_cond_exp() -> CellType {
    conductance_based("IF_cond_exp", 5.0, 5.0)
}

fn current_based(name: &str, tau_syn_e: f64, tau_syn_i: f64) -> CellType {
    CellType::new(
        name,
        &[
            ("v_rest", -65.0),
            ("cm", 1.0),
            ("tau_m", 20.0),
            ("tau_refrac", 0.1),
            ("tau_syn_E", tau_syn_e),
            ("tau_syn_I", tau_syn_i),
            ("i_offset", 0.0),
            ("v_reset", -65.0),
            ("v_thresh", -50.0),
        ],
    )
    .with_initial_values(&[("v", -65.0)])
    .with_recordables(&["spikes", "v"])
}

fn conductance_based(name: &str, tau_syn_e: f64, tau_syn_i: f64) -> CellType {
    CellType::new(
        name,
        &[
            ("v_rest", -65.0),
            ("cm", 1.0),
            ("tau_m", 20.0),
            ("tau_refrac", 0.1),
            ("tau_syn_E", tau_syn_e),
            ("tau_syn_I", tau_syn_i),
            ("e_rev_E", 0.0),
            ("e_rev_I", -70.0),
            ("v_thresh", -50.0),
            ("v_reset", -65.0),
            ("i_offset", 0.0),
        ],
    )
    .with_initial_values(&[("v", -65.0), ("gsyn_exc", 0.0), ("gsyn_inh", 0.0)])
    .with_recordables(&["spikes", "v", "gsyn_exc", "gsyn_inh"])
}

/// Looks up one of the built-in cell types by name.
pub fn standard(name: &str) -> Option<CellType> {
    match name {
        "IF_curr_alpha" => Some(if_curr_alpha()),
        "IF_curr_exp" => Some(if_curr_exp()),
        "IF_cond_alpha" => Some(if_cond_alpha()),
        "IF_cond_exp" => Some(if_cond_exp()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_lookup() {
        assert_eq!(standard("IF_cond_exp").unwrap().name, "IF_cond_exp");
        assert!(standard("HH_cond_exp").is_none());
    }

    #[test]
    fn conductance_defaults() {
        let cell_type = if_cond_exp();
        assert_eq!(cell_type.default_value("e_rev_I"), Some(-70.0));
        assert_eq!(cell_type.default_value("tau_syn_E"), Some(5.0));
        assert!(cell_type.can_record("gsyn_exc"));
        assert_eq!(cell_type.default_initial_value("v"), Some(-65.0));
    }

    #[test]
    fn current_based_cannot_record_gsyn() {
        assert!(!if_curr_alpha().can_record("gsyn_inh"));
    }

    #[test]
    fn override_known_parameter() {
        let spec = if_curr_alpha().spec().with("v_rest", -64.0).unwrap();
        assert!(matches!(spec.get("v_rest"), Some(ParameterSpec::Constant(v)) if v == -64.0));
        assert!(matches!(spec.get("tau_m"), Some(ParameterSpec::Constant(v)) if v == 20.0));
    }

    #[test]
    fn repeated_override_replaces() {
        let spec = if_curr_exp()
            .spec()
            .with("cm", 0.5)
            .unwrap()
            .with("cm", 0.25)
            .unwrap();
        assert_eq!(spec.parameters.len(), 1);
        assert!(matches!(spec.get("cm"), Some(ParameterSpec::Constant(v)) if v == 0.25));
    }

    #[test]
    fn override_unknown_parameter() {
        let result = if_curr_alpha().spec().with("e_rev_E", 0.0);
        assert!(matches!(result, Err(Error::InvalidParameterSpec(_))));
    }
}
