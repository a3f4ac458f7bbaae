use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::connector::Connector;
use crate::error::{Error, Result};
use crate::exchange::Environment;
use crate::network::Network;
use crate::parameters::ParameterSpec;
use crate::population::Population;
use crate::random::{DistributionKind, RandomDistribution};
use crate::synapse::{Synapse, SynapseModel, DEFAULT_MIN_DELAY};
use crate::types::HashSet;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct NetworkParams {
    pub seed: u64,
    pub populations: Vec<PopulationParams>,
    #[serde(default)]
    pub projections: Vec<ProjectionParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationParams {
    pub label: String,
    pub size: usize,
    pub cell_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionParams {
    pub source: String,
    pub target: String,
    pub connector: Connector,
    pub weight: ParameterValue,
    #[serde(default = "default_delay")]
    pub delay: ParameterValue,
    pub receptor_type: String,
    #[serde(default)]
    pub synapse_model: SynapseModel,
}

fn default_delay() -> ParameterValue {
    ParameterValue::Constant(DEFAULT_MIN_DELAY)
}

/// Serializable counterpart of [`ParameterSpec`]. Arbitrary functions can't be
/// written down, so per-index values are limited to `offset + slope * i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Constant(f64),
    Array(Vec<f64>),
    Random {
        kind: DistributionKind,
        params: Vec<f64>,
    },
    Linear {
        offset: f64,
        slope: f64,
    },
}

impl ParameterValue {
    pub fn to_spec(&self) -> Result<ParameterSpec> {
        let spec = match self {
            ParameterValue::Constant(value) => ParameterSpec::Constant(*value),
            ParameterValue::Array(values) => ParameterSpec::Array(values.clone()),
            ParameterValue::Random { kind, params } => {
                ParameterSpec::Random(RandomDistribution::new(*kind, params.clone())?)
            }
            ParameterValue::Linear { offset, slope } => {
                let (offset, slope) = (*offset, *slope);
                ParameterSpec::from_fn(move |i| offset + slope * i as f64)
            }
        };

        Ok(spec)
    }
}

pub fn from_yaml(yaml: &str) -> Result<NetworkParams> {
    Ok(serde_yaml::from_str(yaml)?)
}

pub fn load(path: impl AsRef<Path>) -> Result<NetworkParams> {
    from_yaml(&fs::read_to_string(path)?)
}

pub fn validate_network_params(params: &NetworkParams, env: &impl Environment) -> Result<()> {
    let mut labels = HashSet::default();

    for population in &params.populations {
        if !labels.insert(population.label.as_str()) {
            return Err(Error::DuplicateLabel(population.label.clone()));
        }

        if population.size == 0 {
            return Err(Error::EmptyPopulation(population.label.clone()));
        }

        if env.cell_type(&population.cell_type).is_none() {
            return Err(Error::UnsupportedCellType(population.cell_type.clone()));
        }
    }

    for projection in &params.projections {
        for label in [&projection.source, &projection.target] {
            if !labels.contains(label.as_str()) {
                return Err(Error::PopulationNotFound(label.clone()));
            }
        }
    }

    Ok(())
}

/// Builds the described network. All randomness comes from one generator
/// seeded with `params.seed`, so equal params give equal networks.
pub fn build_network(params: &NetworkParams, env: &impl Environment) -> Result<Network> {
    validate_network_params(params, env)?;

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut network = Network::new();

    for population_params in &params.populations {
        let cell_type = env
            .cell_type(&population_params.cell_type)
            .ok_or_else(|| Error::UnsupportedCellType(population_params.cell_type.clone()))?;

        let mut cell = cell_type.spec();
        for (name, value) in &population_params.parameters {
            cell = cell.with(name, value.to_spec()?)?;
        }

        let population = Population::new(
            population_params.size,
            cell,
            population_params.label.as_str(),
            Some(&mut rng),
        )?;
        network.add_population(population)?;
    }

    for projection_params in &params.projections {
        let source = network.all_cells(network.population_id(&projection_params.source)?)?;
        let target = network.all_cells(network.population_id(&projection_params.target)?)?;
        let synapse = Synapse::new(
            projection_params.synapse_model.clone(),
            projection_params.weight.to_spec()?,
            projection_params.delay.to_spec()?,
        );

        network.connect(
            &source,
            &target,
            &projection_params.connector,
            &synapse,
            &projection_params.receptor_type,
            Some(&mut rng),
        )?;
    }

    info!(
        "built network with {} populations and {} projections (seed {})",
        network.populations().len(),
        network.projections().len(),
        params.seed
    );

    Ok(network)
}
