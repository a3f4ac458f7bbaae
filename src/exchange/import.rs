use std::path::{Component, Path, PathBuf};

use itertools::izip;
use log::{debug, info};

use crate::connector::{Connection, Connector};
use crate::error::{Error, Result};
use crate::exchange::environment::Environment;
use crate::exchange::manifest::{
    self, CircuitConfig, Column, EdgeGroupEntry, EdgeTable, NodeGroupEntry, NodeTable,
    FORMAT_VERSION,
};
use crate::network::Network;
use crate::parameters::ParameterSpec;
use crate::synapse::{Synapse, DEFAULT_MIN_DELAY};
use crate::types::PopulationId;

const DEFAULT_ASSEMBLY_LABEL: &str = "circuit";

/// Rebuilds the network described by the manifest at `manifest_path`.
///
/// Populations and projections are created through `env`. Stored arrays are
/// taken over as they are, nothing is resampled. All populations end up in a
/// single assembly named after the directory holding the manifest.
pub fn import(manifest_path: impl AsRef<Path>, env: &impl Environment) -> Result<Network> {
    let manifest_path = manifest_path.as_ref();

    if !manifest_path.is_file() {
        return Err(Error::ManifestNotFound(manifest_path.to_path_buf()));
    }

    let config: CircuitConfig = manifest::read_json(manifest_path)?;

    if config.format_version != FORMAT_VERSION {
        return Err(Error::SchemaMismatch(format!(
            "unsupported format version {}, expected {}",
            config.format_version, FORMAT_VERSION
        )));
    }

    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let mut network = Network::new();

    let mut members = Vec::with_capacity(config.node_groups.len());
    for group in &config.node_groups {
        if !config
            .cell_types
            .iter()
            .any(|entry| entry.name == group.cell_type)
        {
            return Err(Error::CorruptData(format!(
                "node group {} refers to undeclared cell type {}",
                group.population, group.cell_type
            )));
        }

        members.push(import_node_group(&mut network, base, group, env)?);
    }

    for group in &config.edge_groups {
        import_edge_group(&mut network, base, group, env)?;
    }

    let label = base
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_ASSEMBLY_LABEL.to_owned());
    network.add_assembly(label, members)?;

    info!(
        "imported {} populations and {} projections from {}",
        network.populations().len(),
        network.projections().len(),
        manifest_path.display()
    );

    Ok(network)
}

fn import_node_group(
    network: &mut Network,
    base: &Path,
    group: &NodeGroupEntry,
    env: &impl Environment,
) -> Result<PopulationId> {
    let cell_type = env.cell_type(&group.cell_type).ok_or_else(|| {
        Error::SchemaMismatch(format!("unknown cell type {}", group.cell_type))
    })?;

    if network.population_id(&group.population).is_ok() {
        return Err(Error::CorruptData(format!(
            "population {} is declared twice",
            group.population
        )));
    }

    let table: NodeTable = manifest::read_json(&table_path(base, &group.path)?)?;

    if table.size != group.size || table.population != group.population {
        return Err(Error::CorruptData(format!(
            "node table {} does not match its manifest entry",
            group.path
        )));
    }

    let mut cell = cell_type.spec();
    for column in &table.parameters {
        if cell_type.default_value(&column.name).is_none() {
            return Err(Error::SchemaMismatch(format!(
                "{} has no parameter {}",
                cell_type.name, column.name
            )));
        }
        check_column_length(column, group)?;
        cell = cell.with(&column.name, column.values.clone())?;
    }

    if let Some(missing) = cell_type
        .parameter_names()
        .find(|name| !table.parameters.iter().any(|column| column.name == *name))
    {
        return Err(Error::CorruptData(format!(
            "node table {} lacks column {}",
            group.path, missing
        )));
    }

    let mut population = env.create_population(group.size, cell, &group.population)?;

    for column in &table.initial_values {
        if cell_type.default_initial_value(&column.name).is_none() {
            return Err(Error::SchemaMismatch(format!(
                "{} has no state variable {}",
                cell_type.name, column.name
            )));
        }
        check_column_length(column, group)?;
        population.initialize(&column.name, &ParameterSpec::Array(column.values.clone()), None)?;
    }

    debug!("restored population {} ({} cells)", group.population, group.size);

    network.add_population(population)
}

fn check_column_length(column: &Column, group: &NodeGroupEntry) -> Result<()> {
    if column.values.len() != group.size {
        return Err(Error::CorruptData(format!(
            "column {} of {} holds {} values for {} cells",
            column.name,
            group.path,
            column.values.len(),
            group.size
        )));
    }
    Ok(())
}

fn import_edge_group(
    network: &mut Network,
    base: &Path,
    group: &EdgeGroupEntry,
    env: &impl Environment,
) -> Result<()> {
    let source = lookup_population(network, &group.source, &group.name)?;
    let target = lookup_population(network, &group.target, &group.name)?;

    let model = env.synapse_model(&group.synapse_model, &group.synapse_parameters)?;
    let table: EdgeTable = manifest::read_json(&table_path(base, &group.path)?)?;

    if !table.has_consistent_columns() || table.len() != group.num_edges {
        return Err(Error::CorruptData(format!(
            "edge table {} has inconsistent columns",
            group.path
        )));
    }

    check_indices(network, source, &table.source_index, &group.path)?;
    check_indices(network, target, &table.target_index, &group.path)?;

    if let Some(weight) = table.weight.iter().find(|w| !w.is_finite()) {
        return Err(Error::CorruptData(format!("{}: weight {}", group.path, weight)));
    }

    if let Some(delay) = table.delay.iter().find(|d| !d.is_finite() || **d < 0.0) {
        return Err(Error::CorruptData(format!("{}: delay {}", group.path, delay)));
    }

    let connections = izip!(
        &table.source_index,
        &table.target_index,
        &table.weight,
        &table.delay
    )
    .map(|(&source_index, &target_index, &weight, &delay)| Connection {
        source_index,
        target_index,
        weight,
        delay,
    })
    .collect();

    let synapse = Synapse::new(
        model,
        ParameterSpec::Constant(0.0),
        ParameterSpec::Constant(DEFAULT_MIN_DELAY),
    );

    env.create_projection(
        network,
        source,
        target,
        &Connector::FromList(connections),
        &synapse,
        &group.receptor_type,
    )?;

    debug!("restored edge group {} ({} edges)", group.name, table.len());

    Ok(())
}

/// Resolves a table path from the manifest. Only plain relative paths below
/// the manifest directory are accepted.
fn table_path(base: &Path, relative: &str) -> Result<PathBuf> {
    let path = Path::new(relative);
    let is_plain = path
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

    if relative.is_empty() || !is_plain {
        return Err(Error::CorruptData(format!(
            "table path {} leaves the circuit directory",
            relative
        )));
    }

    Ok(base.join(path))
}

fn lookup_population(network: &Network, label: &str, group: &str) -> Result<PopulationId> {
    network.population_id(label).map_err(|_| {
        Error::CorruptData(format!(
            "edge group {} refers to unknown population {}",
            group, label
        ))
    })
}

fn check_indices(network: &Network, id: PopulationId, indices: &[usize], path: &str) -> Result<()> {
    let population = network.population(id);

    match indices.iter().find(|index| **index >= population.size()) {
        Some(index) => Err(Error::CorruptData(format!(
            "{}: index {} out of bounds for population {} of size {}",
            path,
            index,
            population.label(),
            population.size()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::environment::StandardEnvironment;
    use crate::exchange::manifest::MANIFEST_FILE;
    use serde_json::Value;
    use std::fs;

    fn write_manifest(dir: &Path, manifest: &Value) -> std::path::PathBuf {
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, manifest.to_string()).unwrap();
        path
    }

    #[test]
    fn missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let result = import(dir.path().join(MANIFEST_FILE), &StandardEnvironment);
        assert!(matches!(result, Err(Error::ManifestNotFound(_))));
    }

    #[test]
    fn unsupported_format_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            &serde_json::json!({
                "format_version": 99,
                "cell_types": [],
                "node_groups": [],
                "edge_groups": []
            }),
        );

        let result = import(path, &StandardEnvironment);
        assert!(matches!(result, Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn empty_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            &serde_json::json!({
                "format_version": FORMAT_VERSION,
                "cell_types": [],
                "node_groups": [],
                "edge_groups": []
            }),
        );

        let network = import(path, &StandardEnvironment).unwrap();
        assert!(network.populations().is_empty());
        assert_eq!(network.assemblies().count(), 1);
    }

    #[test]
    fn undeclared_cell_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            &serde_json::json!({
                "format_version": FORMAT_VERSION,
                "cell_types": [],
                "node_groups": [
                    {"population": "p", "cell_type": "IF_curr_exp", "size": 1, "path": "nodes/0_p.json"}
                ],
                "edge_groups": []
            }),
        );

        let result = import(path, &StandardEnvironment);
        assert!(matches!(result, Err(Error::CorruptData(_))));
    }

    #[test]
    fn table_paths_stay_inside() {
        let base = Path::new("circuit");
        assert_eq!(
            table_path(base, "nodes/0_a.json").unwrap(),
            base.join("nodes/0_a.json")
        );
        assert!(matches!(table_path(base, "../a.json"), Err(Error::CorruptData(_))));
        assert!(matches!(table_path(base, "nodes/../../a.json"), Err(Error::CorruptData(_))));
        assert!(matches!(table_path(base, "/etc/passwd"), Err(Error::CorruptData(_))));
        assert!(matches!(table_path(base, ""), Err(Error::CorruptData(_))));
    }
}
