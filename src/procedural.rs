//! Procedural shortcuts for building a network cell group by cell group.
//!
//! Anything that can be connected or recorded from is a [`Selection`]: a
//! single cell, a view of a population, a whole population or an assembly.
//! Each of them normalizes to population views through [`AsView`].

use std::path::PathBuf;

use log::{debug, info};
use rand::rngs::StdRng;

use crate::cell_type::{CellSpec, EXCITATORY};
use crate::connector::Connector;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::parameters::ParameterSpec;
use crate::population::{CellId, Population, PopulationView};
use crate::synapse::{Synapse, DEFAULT_MIN_DELAY};
use crate::types::{AssemblyId, PopulationId, ProjectionId};

pub trait AsView {
    fn as_view(&self, network: &Network) -> Result<Vec<PopulationView>>;
}

impl AsView for CellId {
    fn as_view(&self, network: &Network) -> Result<Vec<PopulationView>> {
        let view = self.to_view();
        network.check_view(&view)?;
        Ok(vec![view])
    }
}

impl AsView for PopulationView {
    fn as_view(&self, network: &Network) -> Result<Vec<PopulationView>> {
        network.check_view(self)?;
        Ok(vec![self.clone()])
    }
}

impl AsView for PopulationId {
    fn as_view(&self, network: &Network) -> Result<Vec<PopulationView>> {
        Ok(vec![network.all_cells(*self)?])
    }
}

impl AsView for AssemblyId {
    fn as_view(&self, network: &Network) -> Result<Vec<PopulationView>> {
        network
            .assembly(*self)?
            .members()
            .iter()
            .map(|id| network.all_cells(*id))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Cell(CellId),
    View(PopulationView),
    Population(PopulationId),
    Assembly(AssemblyId),
}

impl AsView for Selection {
    fn as_view(&self, network: &Network) -> Result<Vec<PopulationView>> {
        match self {
            Selection::Cell(cell) => cell.as_view(network),
            Selection::View(view) => view.as_view(network),
            Selection::Population(id) => id.as_view(network),
            Selection::Assembly(id) => id.as_view(network),
        }
    }
}

impl Selection {
    /// The populations a bulk operation applies to. Only whole populations
    /// and assemblies qualify.
    fn populations(&self, network: &Network, operation: &str) -> Result<Vec<PopulationId>> {
        match self {
            Selection::Population(id) => Ok(vec![*id]),
            Selection::Assembly(id) => Ok(network.assembly(*id)?.members().to_vec()),
            other => Err(Error::TypeMismatch(format!(
                "{} requires a population or an assembly, got {:?}",
                operation, other
            ))),
        }
    }

    /// Like `populations`, but cells and views stand for their parent population.
    fn parents(&self, network: &Network) -> Result<Vec<PopulationId>> {
        match self {
            Selection::Cell(cell) => {
                network.try_population(cell.population)?;
                Ok(vec![cell.population])
            }
            Selection::View(view) => {
                network.try_population(view.population)?;
                Ok(vec![view.population])
            }
            other => other.populations(network, "record"),
        }
    }
}

impl From<CellId> for Selection {
    fn from(cell: CellId) -> Self {
        Selection::Cell(cell)
    }
}

impl From<PopulationView> for Selection {
    fn from(view: PopulationView) -> Self {
        Selection::View(view)
    }
}

impl From<PopulationId> for Selection {
    fn from(id: PopulationId) -> Self {
        Selection::Population(id)
    }
}

impl From<AssemblyId> for Selection {
    fn from(id: AssemblyId) -> Self {
        Selection::Assembly(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRequest {
    pub population: PopulationId,
    pub label: String,
    pub variables: Vec<String>,
    pub filename: PathBuf,
}

/// State scoped to one simulation run: record requests to be written out when
/// the run ends.
#[derive(Debug, Default)]
pub struct RunContext {
    write_on_end: Vec<RecordRequest>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[RecordRequest] {
        &self.write_on_end
    }

    /// Drains the record requests for writing. The context is empty afterwards.
    pub fn end(&mut self) -> Vec<RecordRequest> {
        let requests: Vec<_> = self.write_on_end.drain(..).collect();
        info!("run ended with {} pending record requests", requests.len());
        requests
    }
}

/// Creates `n` cells of one type and adds them as a new population.
pub fn create(
    network: &mut Network,
    cell: CellSpec,
    n: usize,
    rng: Option<&mut StdRng>,
) -> Result<PopulationId> {
    let label = format!("population{}", network.populations().len());
    network.add_population(Population::new(n, cell, label, rng)?)
}

/// Connects every cell of `source` to every cell of `target` with probability
/// `p`. Returns one projection per pair of source and target populations.
#[allow(clippy::too_many_arguments)]
pub fn connect(
    network: &mut Network,
    source: &Selection,
    target: &Selection,
    weight: impl Into<ParameterSpec>,
    delay: Option<ParameterSpec>,
    receptor_type: Option<&str>,
    p: f64,
    mut rng: Option<&mut StdRng>,
) -> Result<Vec<ProjectionId>> {
    let source_views = source.as_view(network)?;
    let target_views = target.as_view(network)?;

    let connector = Connector::fixed_probability(p)?;
    let synapse = Synapse::static_synapse(
        weight,
        delay.unwrap_or(ParameterSpec::Constant(DEFAULT_MIN_DELAY)),
    );
    let receptor_type = receptor_type.unwrap_or(EXCITATORY);

    let mut result = Vec::new();
    for source_view in &source_views {
        for target_view in &target_views {
            result.push(network.connect(
                source_view,
                target_view,
                &connector,
                &synapse,
                receptor_type,
                rng.as_deref_mut(),
            )?);
        }
    }

    Ok(result)
}

/// Sets `param` on every population behind `cells`. Values are resolved for
/// all populations before any of them is changed.
pub fn set(
    network: &mut Network,
    cells: &Selection,
    param: &str,
    value: &ParameterSpec,
    mut rng: Option<&mut StdRng>,
) -> Result<()> {
    let mut resolved = Vec::new();
    for id in cells.populations(network, "set")? {
        let values = network
            .try_population(id)?
            .resolve_parameter(param, value, rng.as_deref_mut())?;
        resolved.push((id, values));
    }

    for (id, values) in resolved {
        network.population_mut(id)?.store_parameter(param, values);
    }
    Ok(())
}

pub fn initialize(
    network: &mut Network,
    cells: &Selection,
    variable: &str,
    value: &ParameterSpec,
    mut rng: Option<&mut StdRng>,
) -> Result<()> {
    let mut resolved = Vec::new();
    for id in cells.populations(network, "initialize")? {
        let values = network
            .try_population(id)?
            .resolve_initial_value(variable, value, rng.as_deref_mut())?;
        resolved.push((id, values));
    }

    for (id, values) in resolved {
        network.population_mut(id)?.store_initial_value(variable, values);
    }
    Ok(())
}

/// Variable names a record request stands for. `gsyn` is shorthand for both
/// synaptic conductances.
pub fn expand_variable(variable: &str) -> Vec<String> {
    if variable == "gsyn" {
        vec!["gsyn_exc".to_owned(), "gsyn_inh".to_owned()]
    } else {
        vec![variable.to_owned()]
    }
}

/// Marks `variable` as recorded on every population behind `source` and
/// schedules a write to `filename` at the end of the run.
pub fn record(
    ctx: &mut RunContext,
    network: &mut Network,
    variable: &str,
    source: &Selection,
    filename: impl Into<PathBuf>,
) -> Result<()> {
    let variables = expand_variable(variable);
    let filename = filename.into();
    let ids = source.parents(network)?;

    for id in &ids {
        network.try_population(*id)?.check_recordable(&variables)?;
    }

    for id in &ids {
        network.population_mut(*id)?.record(&variables)?;
    }

    for id in ids {
        let label = network.population(id).label().to_owned();
        debug!("recording {:?} from {} to {}", variables, label, filename.display());
        ctx.write_on_end.push(RecordRequest {
            population: id,
            label,
            variables: variables.clone(),
            filename: filename.clone(),
        });
    }

    Ok(())
}
