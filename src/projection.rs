use log::debug;
use rand::rngs::StdRng;

use crate::connector::{Connection, Connector};
use crate::error::{Error, Result};
use crate::network::Network;
use crate::population::PopulationView;
use crate::synapse::{self, Synapse, SynapseModel};
use crate::types::PopulationId;

/// Directed, weighted, delayed connectivity from one population to another.
/// Connection indices refer to cells of the source and target populations.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    label: String,
    source: PopulationId,
    target: PopulationId,
    connections: Vec<Connection>,
    receptor_type: String,
    synapse_model: SynapseModel,
}

impl Projection {
    pub fn new(
        label: impl Into<String>,
        source: PopulationId,
        target: PopulationId,
        connections: Vec<Connection>,
        receptor_type: impl Into<String>,
        synapse_model: SynapseModel,
    ) -> Self {
        Self {
            label: label.into(),
            source,
            target,
            connections,
            receptor_type: receptor_type.into(),
            synapse_model,
        }
    }

    /// Applies `connector` to the two views of populations in `network`.
    pub fn build(
        network: &Network,
        source: &PopulationView,
        target: &PopulationView,
        connector: &Connector,
        synapse: &Synapse,
        receptor_type: &str,
        rng: Option<&mut StdRng>,
    ) -> Result<Self> {
        network.check_view(source)?;
        network.check_view(target)?;

        let source_population = network.population(source.population);
        let target_population = network.population(target.population);

        let target_cell_type = target_population.cell_type();
        if !target_cell_type.has_receptor_type(receptor_type) {
            return Err(Error::UnknownReceptorType {
                cell_type: target_cell_type.name.clone(),
                receptor_type: receptor_type.to_owned(),
            });
        }

        synapse::validate_synapse_model(&synapse.model)?;

        let connections = connector.connect(source, target, synapse, rng)?;

        debug!(
            "projection {} -> {} ({}): {} connections",
            source_population.label(),
            target_population.label(),
            receptor_type,
            connections.len()
        );

        Ok(Self::new(
            format!(
                "{}-{}",
                source_population.label(),
                target_population.label()
            ),
            source.population,
            target.population,
            connections,
            receptor_type,
            synapse.model.clone(),
        ))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> PopulationId {
        self.source
    }

    pub fn target(&self) -> PopulationId {
        self.target
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn receptor_type(&self) -> &str {
        &self.receptor_type
    }

    pub fn synapse_model(&self) -> &SynapseModel {
        &self.synapse_model
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.connections.iter().map(|c| c.weight).collect()
    }

    pub fn delays(&self) -> Vec<f64> {
        self.connections.iter().map(|c| c.delay).collect()
    }
}
