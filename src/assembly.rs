use crate::error::{Error, Result};
use crate::network::Network;
use crate::population::Population;
use crate::types::PopulationId;

/// A non-owning grouping of populations of one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub label: String,
    pub members: Vec<PopulationId>,
}

/// An assembly resolved against the network that holds its populations.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyView<'a> {
    assembly: &'a Assembly,
    network: &'a Network,
}

impl<'a> AssemblyView<'a> {
    pub(crate) fn new(assembly: &'a Assembly, network: &'a Network) -> Self {
        Self { assembly, network }
    }

    pub fn label(&self) -> &'a str {
        &self.assembly.label
    }

    pub fn members(&self) -> &'a [PopulationId] {
        &self.assembly.members
    }

    pub fn populations(&self) -> impl Iterator<Item = &'a Population> + 'a {
        let network = self.network;
        self.assembly
            .members
            .iter()
            .map(move |id| network.population(*id))
    }

    /// Total number of cells.
    pub fn size(&self) -> usize {
        self.populations().map(Population::size).sum()
    }

    pub fn get_population(&self, label: &str) -> Result<&'a Population> {
        self.populations()
            .find(|population| population.label() == label)
            .ok_or_else(|| {
                Error::PopulationNotFound(format!("{} in assembly {}", label, self.label()))
            })
    }
}
