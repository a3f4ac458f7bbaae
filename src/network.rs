use log::debug;
use rand::rngs::StdRng;

use crate::assembly::{Assembly, AssemblyView};
use crate::connector::Connector;
use crate::error::{Error, Result};
use crate::population::{Population, PopulationView};
use crate::projection::Projection;
use crate::synapse::Synapse;
use crate::types::{AssemblyId, HashMap, HashSet, PopulationId, ProjectionId};

/// Populations, projections and assemblies forming one model. The network
/// owns all of them; projections and assemblies refer to populations by id.
#[derive(Debug, Clone, Default)]
pub struct Network {
    populations: Vec<Population>,
    label_to_id: HashMap<String, PopulationId>,
    projections: Vec<Projection>,
    assemblies: Vec<Assembly>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_population(&mut self, population: Population) -> Result<PopulationId> {
        if self.label_to_id.contains_key(population.label()) {
            return Err(Error::DuplicateLabel(population.label().to_owned()));
        }

        let id = PopulationId(self.populations.len());
        self.label_to_id.insert(population.label().to_owned(), id);
        self.populations.push(population);
        Ok(id)
    }

    /// # Panics
    /// If `id` was not issued by this network.
    pub fn population(&self, id: PopulationId) -> &Population {
        &self.populations[id.0]
    }

    pub fn try_population(&self, id: PopulationId) -> Result<&Population> {
        self.populations
            .get(id.0)
            .ok_or_else(|| Error::PopulationNotFound(format!("#{}", id.0)))
    }

    pub fn population_mut(&mut self, id: PopulationId) -> Result<&mut Population> {
        self.populations
            .get_mut(id.0)
            .ok_or_else(|| Error::PopulationNotFound(format!("#{}", id.0)))
    }

    pub fn population_id(&self, label: &str) -> Result<PopulationId> {
        self.label_to_id
            .get(label)
            .copied()
            .ok_or_else(|| Error::PopulationNotFound(label.to_owned()))
    }

    pub fn get_population(&self, label: &str) -> Result<&Population> {
        Ok(self.population(self.population_id(label)?))
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn population_ids(&self) -> impl Iterator<Item = PopulationId> {
        (0..self.populations.len()).map(PopulationId)
    }

    pub fn all_cells(&self, id: PopulationId) -> Result<PopulationView> {
        Ok(PopulationView::all(id, self.try_population(id)?.size()))
    }

    pub fn check_view(&self, view: &PopulationView) -> Result<()> {
        let population = self.try_population(view.population)?;
        check_index_bounds(population, view.indices.iter().copied())
    }

    pub fn add_projection(&mut self, projection: Projection) -> Result<ProjectionId> {
        let source = self.try_population(projection.source())?;
        let target = self.try_population(projection.target())?;

        check_index_bounds(source, projection.connections().iter().map(|c| c.source_index))?;
        check_index_bounds(target, projection.connections().iter().map(|c| c.target_index))?;

        let id = ProjectionId(self.projections.len());
        self.projections.push(projection);
        Ok(id)
    }

    /// Builds a projection with `connector` and adds it.
    pub fn connect(
        &mut self,
        source: &PopulationView,
        target: &PopulationView,
        connector: &Connector,
        synapse: &Synapse,
        receptor_type: &str,
        rng: Option<&mut StdRng>,
    ) -> Result<ProjectionId> {
        let projection =
            Projection::build(self, source, target, connector, synapse, receptor_type, rng)?;
        self.add_projection(projection)
    }

    pub fn projection(&self, id: ProjectionId) -> &Projection {
        &self.projections[id.0]
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn add_assembly(
        &mut self,
        label: impl Into<String>,
        members: Vec<PopulationId>,
    ) -> Result<AssemblyId> {
        let label = label.into();

        if self.assemblies.iter().any(|assembly| assembly.label == label) {
            return Err(Error::DuplicateLabel(label));
        }

        let mut seen = HashSet::default();
        for id in &members {
            let population = self.try_population(*id)?;
            if !seen.insert(*id) {
                return Err(Error::DuplicateLabel(format!(
                    "{} appears twice in assembly {}",
                    population.label(),
                    label
                )));
            }
        }

        debug!("assembly {} groups {} populations", label, members.len());

        let id = AssemblyId(self.assemblies.len());
        self.assemblies.push(Assembly { label, members });
        Ok(id)
    }

    pub fn assembly(&self, id: AssemblyId) -> Result<AssemblyView<'_>> {
        self.assemblies
            .get(id.0)
            .map(|assembly| AssemblyView::new(assembly, self))
            .ok_or_else(|| Error::PopulationNotFound(format!("assembly #{}", id.0)))
    }

    pub fn assemblies(&self) -> impl Iterator<Item = AssemblyView<'_>> {
        self.assemblies
            .iter()
            .map(move |assembly| AssemblyView::new(assembly, self))
    }
}

fn check_index_bounds(
    population: &Population,
    mut indices: impl Iterator<Item = usize>,
) -> Result<()> {
    match indices.find(|index| *index >= population.size()) {
        Some(index) => Err(Error::IndexOutOfBounds {
            label: population.label().to_owned(),
            index,
            size: population.size(),
        }),
        None => Ok(()),
    }
}
