use std::collections::BTreeMap;

use crate::cell_type::{self, CellSpec, CellType};
use crate::connector::Connector;
use crate::error::Result;
use crate::network::Network;
use crate::population::Population;
use crate::synapse::{Synapse, SynapseModel};
use crate::types::{PopulationId, ProjectionId};

/// The simulator-side factory an imported circuit is rebuilt through.
///
/// Only cell type lookup is mandatory. The remaining hooks default to building
/// plain [`Population`]s and projections in the given network.
pub trait Environment {
    fn cell_type(&self, name: &str) -> Option<CellType>;

    fn synapse_model(&self, name: &str, parameters: &BTreeMap<String, f64>) -> Result<SynapseModel> {
        SynapseModel::from_parameters(name, parameters)
    }

    fn create_population(&self, size: usize, cell: CellSpec, label: &str) -> Result<Population> {
        Population::new(size, cell, label, None)
    }

    fn create_projection(
        &self,
        network: &mut Network,
        source: PopulationId,
        target: PopulationId,
        connector: &Connector,
        synapse: &Synapse,
        receptor_type: &str,
    ) -> Result<ProjectionId> {
        let source = network.all_cells(source)?;
        let target = network.all_cells(target)?;
        network.connect(&source, &target, connector, synapse, receptor_type, None)
    }
}

/// Knows the built-in integrate-and-fire cell types.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEnvironment;

impl Environment for StandardEnvironment {
    fn cell_type(&self, name: &str) -> Option<CellType> {
        cell_type::standard(name)
    }
}
