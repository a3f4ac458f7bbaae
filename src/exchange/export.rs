use std::fs;
use std::path::Path;

use log::{debug, info};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::exchange::manifest::{
    self, CellTypeEntry, CircuitConfig, Column, EdgeGroupEntry, EdgeTable, NodeGroupEntry,
    NodeTable, EDGES_DIR, FORMAT_VERSION, MANIFEST_FILE, NODES_DIR,
};
use crate::network::Network;
use crate::population::Population;
use crate::synapse::SynapseModel;
use crate::types::{HashMap, PopulationId};
use crate::util;

const STAGING_PREFIX: &str = ".circuitry-staging-";
const BACKUP_PREFIX: &str = ".circuitry-previous-";

/// Writes `network` to the directory `destination`.
///
/// Fails with `DestinationExists` if the destination exists and `overwrite` is
/// false. The circuit is written to a staging directory first and moved into
/// place once complete, so on failure the destination is left as it was.
pub fn export(network: &Network, destination: impl AsRef<Path>, overwrite: bool) -> Result<()> {
    let destination = destination.as_ref();

    if destination.symlink_metadata().is_ok() && !overwrite {
        return Err(Error::DestinationExists(destination.to_path_buf()));
    }

    let circuit = build_circuit(network)?;

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)?;
    circuit.write_to(staging.path())?;
    commit(staging, destination, parent)?;

    info!(
        "exported {} populations and {} edge groups to {}",
        circuit.config.node_groups.len(),
        circuit.config.edge_groups.len(),
        destination.display()
    );

    Ok(())
}

struct Circuit {
    config: CircuitConfig,
    node_tables: Vec<NodeTable>,
    edge_tables: Vec<EdgeTable>,
}

impl Circuit {
    fn write_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir(dir.join(NODES_DIR))?;
        fs::create_dir(dir.join(EDGES_DIR))?;

        for (entry, table) in self.config.node_groups.iter().zip(&self.node_tables) {
            manifest::write_json(&dir.join(&entry.path), table, false)?;
        }

        for (entry, table) in self.config.edge_groups.iter().zip(&self.edge_tables) {
            manifest::write_json(&dir.join(&entry.path), table, false)?;
        }

        manifest::write_json(&dir.join(MANIFEST_FILE), &self.config, true)
    }
}

fn build_circuit(network: &Network) -> Result<Circuit> {
    let mut cell_types: Vec<CellTypeEntry> = Vec::new();
    let mut node_groups = Vec::new();
    let mut node_tables = Vec::new();

    for (k, population) in network.populations().iter().enumerate() {
        let cell_type = population.cell_type();

        if cell_type.parameters.is_empty() {
            return Err(Error::UnsupportedCellType(cell_type.name.clone()));
        }

        if !cell_types.iter().any(|entry| entry.name == cell_type.name) {
            cell_types.push(CellTypeEntry {
                name: cell_type.name.clone(),
                parameters: cell_type.parameters.clone(),
                initial_values: cell_type
                    .initial_values
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect(),
            });
        }

        node_groups.push(NodeGroupEntry {
            population: population.label().to_owned(),
            cell_type: cell_type.name.clone(),
            size: population.size(),
            path: format!("{}/{}_{}.json", NODES_DIR, k, util::file_stem(population.label())),
        });
        node_tables.push(node_table(population));
    }

    let (edge_groups, edge_tables) = build_edge_groups(network)?;

    Ok(Circuit {
        config: CircuitConfig {
            format_version: FORMAT_VERSION,
            cell_types,
            node_groups,
            edge_groups,
        },
        node_tables,
        edge_tables,
    })
}

fn node_table(population: &Population) -> NodeTable {
    let cell_type = population.cell_type();

    let parameters = cell_type
        .parameter_names()
        .filter_map(|name| population.get(name).map(|values| column(name, values)))
        .collect();

    let initial_values = cell_type
        .initial_values
        .iter()
        .filter_map(|(name, _)| {
            population
                .get_initial_value(name)
                .map(|values| column(name, values))
        })
        .collect();

    NodeTable {
        population: population.label().to_owned(),
        cell_type: cell_type.name.clone(),
        size: population.size(),
        parameters,
        initial_values,
    }
}

fn column(name: &str, values: &[f64]) -> Column {
    Column {
        name: name.to_owned(),
        values: values.to_vec(),
    }
}

/// Groups projections by (source, target, receptor type). Projections in one
/// group are concatenated in network order.
fn build_edge_groups(network: &Network) -> Result<(Vec<EdgeGroupEntry>, Vec<EdgeTable>)> {
    let mut group_ids: HashMap<(PopulationId, PopulationId, &str), usize> = HashMap::default();
    let mut models: Vec<&SynapseModel> = Vec::new();
    let mut entries: Vec<EdgeGroupEntry> = Vec::new();
    let mut tables: Vec<EdgeTable> = Vec::new();

    for projection in network.projections() {
        let key = (
            projection.source(),
            projection.target(),
            projection.receptor_type(),
        );

        let group_id = match group_ids.get(&key) {
            Some(group_id) => *group_id,
            None => {
                let source = network.population(projection.source()).label();
                let target = network.population(projection.target()).label();
                let name = util::edge_group_name(source, target, projection.receptor_type());
                let k = entries.len();

                entries.push(EdgeGroupEntry {
                    path: format!("{}/{}_{}.json", EDGES_DIR, k, util::file_stem(&name)),
                    name,
                    source: source.to_owned(),
                    target: target.to_owned(),
                    receptor_type: projection.receptor_type().to_owned(),
                    synapse_model: projection.synapse_model().model_name(),
                    synapse_parameters: projection.synapse_model().parameters(),
                    num_edges: 0,
                });
                models.push(projection.synapse_model());
                tables.push(EdgeTable::default());
                group_ids.insert(key, k);
                k
            }
        };

        if models[group_id] != projection.synapse_model() {
            return Err(Error::ConflictingEdgeGroup(entries[group_id].name.clone()));
        }

        let table = &mut tables[group_id];
        for connection in projection.connections() {
            table.source_index.push(connection.source_index);
            table.target_index.push(connection.target_index);
            table.weight.push(connection.weight);
            table.delay.push(connection.delay);
        }
        entries[group_id].num_edges = table.len();

        debug!(
            "edge group {} now holds {} edges",
            entries[group_id].name,
            table.len()
        );
    }

    Ok((entries, tables))
}

/// Moves the staged circuit to `destination`. An existing destination is moved
/// aside first and put back if the final rename fails.
fn commit(staging: TempDir, destination: &Path, parent: &Path) -> Result<()> {
    if destination.symlink_metadata().is_err() {
        fs::rename(staging.path(), destination)?;
        return Ok(());
    }

    let backup = tempfile::Builder::new()
        .prefix(BACKUP_PREFIX)
        .tempdir_in(parent)?;
    let previous = backup.path().join("previous");

    fs::rename(destination, &previous)?;

    if let Err(err) = fs::rename(staging.path(), destination) {
        fs::rename(&previous, destination)?;
        return Err(err.into());
    }

    debug!("replaced previous contents of {}", destination.display());
    Ok(())
}
