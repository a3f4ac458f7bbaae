use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use circuitry::cell_type::{self, CellSpec, CellType};
use circuitry::connector::Connector;
use circuitry::exchange::{self, Environment, StandardEnvironment, MANIFEST_FILE};
use circuitry::population::Population;
use circuitry::procedural::{self, RunContext, Selection};
use circuitry::random::RandomDistribution;
use circuitry::synapse::Synapse;
use circuitry::{Error, Network, ParameterSpec};
use float_cmp::approx_eq;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::Value;

const NODES_ONE: &str = "nodes/0_population_one.json";
const EDGES_ONE_TWO: &str = "edges/0_population_one__population_two__excitatory.json";

fn make_network() -> Network {
    let mut rng = StdRng::seed_from_u64(42);
    let mut network = Network::new();

    let cell_one = cell_type::if_cond_exp()
        .spec()
        .with("v_rest", -65.0)
        .unwrap()
        .with("tau_m", ParameterSpec::from_fn(|i| 10.0 + 0.1 * i as f64))
        .unwrap()
        .with("cm", RandomDistribution::normal(0.5, 0.05).unwrap())
        .unwrap();
    let one = network
        .add_population(Population::new(10, cell_one, "population_one", Some(&mut rng)).unwrap())
        .unwrap();

    let cell_two = cell_type::if_curr_alpha()
        .spec()
        .with("v_rest", -64.0)
        .unwrap()
        .with("tau_m", ParameterSpec::from_fn(|i| 11.0 + 0.1 * i as f64))
        .unwrap();
    let two = network
        .add_population(Population::new(20, cell_two, "population_two", Some(&mut rng)).unwrap())
        .unwrap();

    let synapse = Synapse::static_synapse(RandomDistribution::uniform(0.0, 0.1).unwrap(), 0.5);
    network
        .connect(
            &network.all_cells(one).unwrap(),
            &network.all_cells(two).unwrap(),
            &Connector::fixed_probability(0.5).unwrap(),
            &synapse,
            cell_type::EXCITATORY,
            Some(&mut rng),
        )
        .unwrap();

    network.add_assembly("all", vec![one, two]).unwrap();
    network
}

fn export_to(dir: &Path, network: &Network) -> PathBuf {
    let destination = dir.join("tmp_serialization_test");
    exchange::export(network, &destination, true).unwrap();
    destination
}

fn edit_json(path: &Path, edit: impl FnOnce(&mut Value)) {
    let mut value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    edit(&mut value);
    fs::write(path, value.to_string()).unwrap();
}

#[test]
fn serialization_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let network = make_network();
    let destination = export_to(dir.path(), &network);

    let imported = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment).unwrap();

    assert_eq!(imported.populations().len(), network.populations().len());

    for (original, restored) in network.populations().iter().zip(imported.populations()) {
        assert_eq!(original.label(), restored.label());
        assert_eq!(original.size(), restored.size());
        assert_eq!(original.cell_type().name, restored.cell_type().name);

        for name in original.cell_type().parameter_names() {
            let expected = original.get(name).unwrap();
            let actual = restored.get(name).unwrap();
            assert_eq!(expected.len(), actual.len());
            for (e, a) in expected.iter().zip(actual) {
                assert!(approx_eq!(f64, *e, *a, epsilon = 1e-12), "{}: {} != {}", name, e, a);
            }
        }
    }

    assert_eq!(imported.projections().len(), 1);
    let original = &network.projections()[0];
    let restored = &imported.projections()[0];
    assert_eq!(original.connections(), restored.connections());
    assert_eq!(original.receptor_type(), restored.receptor_type());
    assert_eq!(original.synapse_model(), restored.synapse_model());
}

#[test]
fn imported_assembly_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    let imported = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment).unwrap();
    let assembly = imported.assemblies().next().unwrap();

    assert_eq!(assembly.label(), "tmp_serialization_test");
    assert_eq!(assembly.size(), 30);
    assert_eq!(assembly.get_population("population_one").unwrap().size(), 10);
    assert_eq!(assembly.get_population("population_two").unwrap().size(), 20);
    assert!(matches!(
        assembly.get_population("population_three"),
        Err(Error::PopulationNotFound(_))
    ));
}

#[test]
fn export_refuses_existing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let network = make_network();
    let destination = export_to(dir.path(), &network);
    let manifest_before = fs::read(destination.join(MANIFEST_FILE)).unwrap();
    let nodes_before = fs::read(destination.join(NODES_ONE)).unwrap();

    let mut other = Network::new();
    other
        .add_population(
            Population::new(3, cell_type::if_curr_exp().spec(), "other", None).unwrap(),
        )
        .unwrap();
    let result = exchange::export(&other, &destination, false);

    assert!(matches!(result, Err(Error::DestinationExists(_))));
    assert_eq!(fs::read(destination.join(MANIFEST_FILE)).unwrap(), manifest_before);
    assert_eq!(fs::read(destination.join(NODES_ONE)).unwrap(), nodes_before);
}

#[test]
fn export_overwrites_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    let mut other = Network::new();
    other
        .add_population(
            Population::new(3, cell_type::if_curr_exp().spec(), "other", None).unwrap(),
        )
        .unwrap();
    exchange::export(&other, &destination, true).unwrap();

    assert!(!destination.join(NODES_ONE).exists());
    let imported = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment).unwrap();
    assert_eq!(imported.populations().len(), 1);
    assert_eq!(imported.get_population("other").unwrap().size(), 3);
    assert!(imported.projections().is_empty());
}

#[test]
fn missing_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let result = exchange::import(dir.path().join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::ManifestNotFound(_))));
}

#[test]
fn unknown_cell_type_in_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(MANIFEST_FILE), |manifest| {
        manifest["cell_types"][0]["name"] = Value::from("HH_cond_exp");
        manifest["node_groups"][0]["cell_type"] = Value::from("HH_cond_exp");
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::SchemaMismatch(_))));
}

#[test]
fn undeclared_column() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(NODES_ONE), |table| {
        table["parameters"][0]["name"] = Value::from("not_a_parameter");
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::SchemaMismatch(_))));
}

#[test]
fn truncated_column() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(NODES_ONE), |table| {
        if let Value::Array(values) = &mut table["parameters"][0]["values"] {
            values.pop();
        }
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::CorruptData(_))));
}

#[test]
fn unreadable_table() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());
    fs::write(destination.join(NODES_ONE), "not json").unwrap();

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::CorruptData(_))));
}

#[test]
fn edge_index_out_of_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(EDGES_ONE_TWO), |table| {
        table["target_index"][0] = Value::from(20);
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::CorruptData(_))));
}

#[test]
fn edge_group_with_unknown_population() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(MANIFEST_FILE), |manifest| {
        manifest["edge_groups"][0]["target"] = Value::from("population_three");
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::CorruptData(_))));
}

#[test]
fn unknown_synapse_model() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(MANIFEST_FILE), |manifest| {
        manifest["edge_groups"][0]["synapse_model"] = Value::from("GapJunction");
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::SchemaMismatch(_))));
}

#[derive(Default)]
struct CountingEnvironment {
    populations_created: Cell<usize>,
}

impl Environment for CountingEnvironment {
    fn cell_type(&self, name: &str) -> Option<CellType> {
        cell_type::standard(name)
    }

    fn create_population(&self, size: usize, cell: CellSpec, label: &str) -> circuitry::Result<Population> {
        self.populations_created.set(self.populations_created.get() + 1);
        Population::new(size, cell, label, None)
    }
}

#[test]
fn import_goes_through_environment() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());
    let env = CountingEnvironment::default();

    let imported = exchange::import(destination.join(MANIFEST_FILE), &env).unwrap();

    assert_eq!(env.populations_created.get(), 2);
    assert_eq!(imported.populations().len(), 2);
}

#[test]
fn procedural_network_round_trip() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut network = Network::new();
    let mut ctx = RunContext::new();

    let exc = procedural::create(&mut network, cell_type::if_cond_exp().spec(), 8, Some(&mut rng))
        .unwrap();
    let inh = procedural::create(&mut network, cell_type::if_cond_exp().spec(), 2, Some(&mut rng))
        .unwrap();

    procedural::connect(
        &mut network,
        &Selection::Population(exc),
        &Selection::Population(inh),
        0.05,
        None,
        None,
        1.0,
        Some(&mut rng),
    )
    .unwrap();
    procedural::connect(
        &mut network,
        &Selection::Population(inh),
        &Selection::Population(exc),
        RandomDistribution::uniform(0.1, 0.2).unwrap(),
        Some(ParameterSpec::Constant(1.0)),
        Some(cell_type::INHIBITORY),
        0.5,
        Some(&mut rng),
    )
    .unwrap();
    procedural::initialize(
        &mut network,
        &Selection::Population(exc),
        "v",
        &ParameterSpec::Constant(-70.0),
        None,
    )
    .unwrap();
    procedural::record(&mut ctx, &mut network, "gsyn", &Selection::Population(inh), "inh.dat")
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &network);
    let imported = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment).unwrap();

    assert_eq!(imported.get_population("population0").unwrap().size(), 8);
    assert_eq!(
        imported
            .get_population("population0")
            .unwrap()
            .get_initial_value("v")
            .unwrap(),
        &[-70.0; 8][..]
    );
    assert_eq!(imported.projections()[0].len(), 16);
    assert_eq!(
        imported.projections()[1].connections(),
        network.projections()[1].connections()
    );

    let requests = ctx.end();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].variables, vec!["gsyn_exc", "gsyn_inh"]);
}

fn staging_leftovers(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with(".circuitry-")
        })
        .count()
}

#[test]
fn failed_overwrite_keeps_previous_export() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());
    let manifest_before = fs::read(destination.join(MANIFEST_FILE)).unwrap();
    let nodes_before = fs::read(destination.join(NODES_ONE)).unwrap();
    let edges_before = fs::read(destination.join(EDGES_ONE_TWO)).unwrap();

    let mut opaque = Network::new();
    opaque
        .add_population(
            Population::new(2, CellType::new("Opaque", &[]).spec(), "opaque", None).unwrap(),
        )
        .unwrap();
    let result = exchange::export(&opaque, &destination, true);
    assert!(matches!(result, Err(Error::UnsupportedCellType(_))));

    let mut conflicting = make_network();
    let one = conflicting.population_id("population_one").unwrap();
    let two = conflicting.population_id("population_two").unwrap();
    let depressing = Synapse::new(
        circuitry::synapse::SynapseModel::TsodyksMarkram(Default::default()),
        ParameterSpec::Constant(0.1),
        ParameterSpec::Constant(1.0),
    );
    conflicting
        .connect(
            &conflicting.all_cells(one).unwrap(),
            &conflicting.all_cells(two).unwrap(),
            &Connector::fixed_probability(1.0).unwrap(),
            &depressing,
            cell_type::EXCITATORY,
            None,
        )
        .unwrap();
    let result = exchange::export(&conflicting, &destination, true);
    assert!(matches!(result, Err(Error::ConflictingEdgeGroup(_))));

    assert_eq!(fs::read(destination.join(MANIFEST_FILE)).unwrap(), manifest_before);
    assert_eq!(fs::read(destination.join(NODES_ONE)).unwrap(), nodes_before);
    assert_eq!(fs::read(destination.join(EDGES_ONE_TWO)).unwrap(), edges_before);
    assert_eq!(staging_leftovers(dir.path()), 0);
}

#[test]
fn negative_delay_on_disk_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(EDGES_ONE_TWO), |table| {
        table["delay"][0] = Value::from(-1.0);
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::CorruptData(_))));
}

#[test]
fn population_declared_twice() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());

    edit_json(&destination.join(MANIFEST_FILE), |manifest| {
        let first = manifest["node_groups"][0].clone();
        if let Value::Array(groups) = &mut manifest["node_groups"] {
            groups.push(first);
        }
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::CorruptData(_))));
}

#[test]
fn table_path_outside_circuit() {
    let dir = tempfile::tempdir().unwrap();
    let destination = export_to(dir.path(), &make_network());
    fs::copy(destination.join(NODES_ONE), dir.path().join("outside.json")).unwrap();

    edit_json(&destination.join(MANIFEST_FILE), |manifest| {
        manifest["node_groups"][0]["path"] = Value::from("../outside.json");
    });

    let result = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment);
    assert!(matches!(result, Err(Error::CorruptData(_))));
}
