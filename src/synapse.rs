use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::error::{Error, Result};
use crate::parameters::ParameterSpec;

pub const DEFAULT_MIN_DELAY: f64 = 0.1;

const STATIC: &str = "StaticSynapse";
const TSODYKS_MARKRAM: &str = "TsodyksMarkramSynapse";
const STDP_PREFIX: &str = "STDPMechanism(";

/// Synapse model plus the weight and delay specs used when a connector
/// materializes edges.
#[derive(Debug, Clone)]
pub struct Synapse {
    pub model: SynapseModel,
    pub weight: ParameterSpec,
    pub delay: ParameterSpec,
}

impl Synapse {
    pub fn new(model: SynapseModel, weight: ParameterSpec, delay: ParameterSpec) -> Self {
        Self {
            model,
            weight,
            delay,
        }
    }

    pub fn static_synapse(weight: impl Into<ParameterSpec>, delay: impl Into<ParameterSpec>) -> Self {
        Self::new(SynapseModel::Static, weight.into(), delay.into())
    }
}

impl Default for Synapse {
    fn default() -> Self {
        Self::static_synapse(0.0, DEFAULT_MIN_DELAY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynapseModel {
    Static,
    TsodyksMarkram(TsodyksMarkramParams),
    Stdp {
        timing_dependence: SpikePairRule,
        weight_dependence: WeightDependence,
    },
}

impl Default for SynapseModel {
    fn default() -> Self {
        SynapseModel::Static
    }
}

/// Short-term facilitation and depression after Tsodyks and Markram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsodyksMarkramParams {
    pub u: f64,
    pub tau_rec: f64,
    pub tau_facil: f64,
    pub u0: f64,
    pub x0: f64,
    pub y0: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikePairRule {
    pub tau_plus: f64,
    pub tau_minus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightBoundsParams {
    pub w_min: f64,
    pub w_max: f64,
    pub a_plus: f64,
    pub a_minus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GutigParams {
    pub bounds: WeightBoundsParams,
    pub mu_plus: f64,
    pub mu_minus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WeightDependence {
    Additive(WeightBoundsParams),
    Multiplicative(WeightBoundsParams),
    AdditivePotentiationMultiplicativeDepression(WeightBoundsParams),
    Gutig(GutigParams),
}

impl Default for TsodyksMarkramParams {
    fn default() -> Self {
        Self {
            u: 0.5,
            tau_rec: 100.0,
            tau_facil: 0.0,
            u0: 0.0,
            x0: 1.0,
            y0: 0.0,
        }
    }
}

impl Default for SpikePairRule {
    fn default() -> Self {
        Self {
            tau_plus: 20.0,
            tau_minus: 20.0,
        }
    }
}

impl Default for WeightBoundsParams {
    fn default() -> Self {
        Self {
            w_min: 0.0,
            w_max: 1.0,
            a_plus: 0.01,
            a_minus: 0.01,
        }
    }
}

impl Default for GutigParams {
    fn default() -> Self {
        Self {
            bounds: WeightBoundsParams::default(),
            mu_plus: 0.5,
            mu_minus: 0.5,
        }
    }
}

impl WeightDependence {
    fn name(&self) -> &'static str {
        match self {
            WeightDependence::Additive(_) => "AdditiveWeightDependence",
            WeightDependence::Multiplicative(_) => "MultiplicativeWeightDependence",
            WeightDependence::AdditivePotentiationMultiplicativeDepression(_) => {
                "AdditivePotentiationMultiplicativeDepression"
            }
            WeightDependence::Gutig(_) => "GutigWeightDependence",
        }
    }

    fn bounds(&self) -> &WeightBoundsParams {
        match self {
            WeightDependence::Additive(bounds)
            | WeightDependence::Multiplicative(bounds)
            | WeightDependence::AdditivePotentiationMultiplicativeDepression(bounds) => bounds,
            WeightDependence::Gutig(params) => &params.bounds,
        }
    }

    fn from_name(name: &str, fields: &mut Fields) -> Option<Self> {
        let result = match name {
            "AdditiveWeightDependence" => WeightDependence::Additive(fields.take_bounds()),
            "MultiplicativeWeightDependence" => {
                WeightDependence::Multiplicative(fields.take_bounds())
            }
            "AdditivePotentiationMultiplicativeDepression" => {
                WeightDependence::AdditivePotentiationMultiplicativeDepression(fields.take_bounds())
            }
            "GutigWeightDependence" => {
                let defaults = GutigParams::default();
                WeightDependence::Gutig(GutigParams {
                    bounds: fields.take_bounds(),
                    mu_plus: fields.take("mu_plus", defaults.mu_plus),
                    mu_minus: fields.take("mu_minus", defaults.mu_minus),
                })
            }
            _ => return None,
        };

        Some(result)
    }
}

/// Named parameters not yet consumed while rebuilding a model.
struct Fields(BTreeMap<String, f64>);

impl Fields {
    fn take(&mut self, name: &str, default: f64) -> f64 {
        self.0.remove(name).unwrap_or(default)
    }

    fn take_bounds(&mut self) -> WeightBoundsParams {
        let defaults = WeightBoundsParams::default();
        WeightBoundsParams {
            w_min: self.take("w_min", defaults.w_min),
            w_max: self.take("w_max", defaults.w_max),
            a_plus: self.take("A_plus", defaults.a_plus),
            a_minus: self.take("A_minus", defaults.a_minus),
        }
    }
}

impl SynapseModel {
    pub fn model_name(&self) -> String {
        match self {
            SynapseModel::Static => STATIC.to_owned(),
            SynapseModel::TsodyksMarkram(_) => TSODYKS_MARKRAM.to_owned(),
            SynapseModel::Stdp {
                weight_dependence, ..
            } => format!("{}{})", STDP_PREFIX, weight_dependence.name()),
        }
    }

    /// Flattens the model into named parameters.
    pub fn parameters(&self) -> BTreeMap<String, f64> {
        let mut result = BTreeMap::new();

        match self {
            SynapseModel::Static => {}
            SynapseModel::TsodyksMarkram(params) => {
                result.insert("U".to_owned(), params.u);
                result.insert("tau_rec".to_owned(), params.tau_rec);
                result.insert("tau_facil".to_owned(), params.tau_facil);
                result.insert("u0".to_owned(), params.u0);
                result.insert("x0".to_owned(), params.x0);
                result.insert("y0".to_owned(), params.y0);
            }
            SynapseModel::Stdp {
                timing_dependence,
                weight_dependence,
            } => {
                result.insert("tau_plus".to_owned(), timing_dependence.tau_plus);
                result.insert("tau_minus".to_owned(), timing_dependence.tau_minus);

                let bounds = weight_dependence.bounds();
                result.insert("w_min".to_owned(), bounds.w_min);
                result.insert("w_max".to_owned(), bounds.w_max);
                result.insert("A_plus".to_owned(), bounds.a_plus);
                result.insert("A_minus".to_owned(), bounds.a_minus);

                if let WeightDependence::Gutig(params) = weight_dependence {
                    result.insert("mu_plus".to_owned(), params.mu_plus);
                    result.insert("mu_minus".to_owned(), params.mu_minus);
                }
            }
        }

        result
    }

    /// Rebuilds a model from its name and named parameters. Missing parameters
    /// take their defaults.
    pub fn from_parameters(name: &str, parameters: &BTreeMap<String, f64>) -> Result<Self> {
        let mut fields = Fields(parameters.clone());

        let model = if name == STATIC {
            SynapseModel::Static
        } else if name == TSODYKS_MARKRAM {
            let defaults = TsodyksMarkramParams::default();
            SynapseModel::TsodyksMarkram(TsodyksMarkramParams {
                u: fields.take("U", defaults.u),
                tau_rec: fields.take("tau_rec", defaults.tau_rec),
                tau_facil: fields.take("tau_facil", defaults.tau_facil),
                u0: fields.take("u0", defaults.u0),
                x0: fields.take("x0", defaults.x0),
                y0: fields.take("y0", defaults.y0),
            })
        } else if let Some(dependence_name) = name
            .strip_prefix(STDP_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let defaults = SpikePairRule::default();
            let timing_dependence = SpikePairRule {
                tau_plus: fields.take("tau_plus", defaults.tau_plus),
                tau_minus: fields.take("tau_minus", defaults.tau_minus),
            };
            let weight_dependence = WeightDependence::from_name(dependence_name, &mut fields)
                .ok_or_else(|| unknown_model(name))?;
            SynapseModel::Stdp {
                timing_dependence,
                weight_dependence,
            }
        } else {
            return Err(unknown_model(name));
        };

        if let Some(unknown) = fields.0.keys().next() {
            return Err(Error::SchemaMismatch(format!(
                "{} has no parameter {}",
                name, unknown
            )));
        }

        validate_synapse_model(&model)?;

        Ok(model)
    }
}

fn unknown_model(name: &str) -> Error {
    Error::SchemaMismatch(format!("unknown synapse model {}", name))
}

pub fn validate_synapse_model(model: &SynapseModel) -> std::result::Result<(), SimpleError> {
    match model {
        SynapseModel::Static => Ok(()),
        SynapseModel::TsodyksMarkram(params) => validate_tsodyks_markram_params(params),
        SynapseModel::Stdp {
            timing_dependence,
            weight_dependence,
        } => {
            validate_spike_pair_rule(timing_dependence)?;
            validate_weight_dependence(weight_dependence)
        }
    }
}

fn validate_tsodyks_markram_params(
    params: &TsodyksMarkramParams,
) -> std::result::Result<(), SimpleError> {
    if params.u < 0.0 || params.u > 1.0 {
        return Err(SimpleError::new("tsodyks_markram: U must be in [0, 1]"));
    }

    if params.tau_rec <= 0.0 {
        return Err(SimpleError::new(
            "tsodyks_markram: tau_rec must be strictly positive",
        ));
    }

    if params.tau_facil < 0.0 {
        return Err(SimpleError::new(
            "tsodyks_markram: tau_facil must not be negative",
        ));
    }

    for (name, value) in [("u0", params.u0), ("x0", params.x0), ("y0", params.y0)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(SimpleError::new(format!(
                "tsodyks_markram: {} must be in [0, 1]",
                name
            )));
        }
    }

    Ok(())
}

fn validate_spike_pair_rule(rule: &SpikePairRule) -> std::result::Result<(), SimpleError> {
    if rule.tau_plus <= 0.0 {
        return Err(SimpleError::new("tau_plus must be strictly positive"));
    }

    if rule.tau_minus <= 0.0 {
        return Err(SimpleError::new("tau_minus must be strictly positive"));
    }

    Ok(())
}

fn validate_weight_dependence(
    weight_dependence: &WeightDependence,
) -> std::result::Result<(), SimpleError> {
    let bounds = weight_dependence.bounds();

    if bounds.w_min > bounds.w_max {
        return Err(SimpleError::new("w_min must not be greater than w_max"));
    }

    if bounds.a_plus < 0.0 || bounds.a_minus < 0.0 {
        return Err(SimpleError::new("A_plus and A_minus must not be negative"));
    }

    if let WeightDependence::Gutig(params) = weight_dependence {
        if !(0.0..=1.0).contains(&params.mu_plus) || !(0.0..=1.0).contains(&params.mu_minus) {
            return Err(SimpleError::new("mu_plus and mu_minus must be in [0, 1]"));
        }
    }

    Ok(())
}
