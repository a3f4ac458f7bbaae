use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use circuitry::exchange::{self, StandardEnvironment, MANIFEST_FILE};
use circuitry::{config, Network};

#[path = "../scenario_params.rs"]
mod scenario_params;

struct Checksums {
    parameter_sum: f64,
    num_connections: usize,
    weight_sum: f64,
    delay_sum: f64,
}

fn checksums(network: &Network) -> Checksums {
    let parameter_sum = network
        .populations()
        .iter()
        .flat_map(|population| {
            population
                .cell_type()
                .parameter_names()
                .filter_map(|name| population.get(name))
                .flatten()
                .copied()
                .collect::<Vec<f64>>()
        })
        .sum();

    let connections = network
        .projections()
        .iter()
        .flat_map(|projection| projection.connections());

    Checksums {
        parameter_sum,
        num_connections: connections.clone().count(),
        weight_sum: connections.clone().map(|c| c.weight).sum(),
        delay_sum: connections.map(|c| c.delay).sum(),
    }
}

fn print_checksums(title: &str, checksums: &Checksums) {
    println!("{}:", title);
    println!("...parameter checksum: {}", checksums.parameter_sum);
    println!("...connection count: {}", checksums.num_connections);
    println!("...weight checksum: {}", checksums.weight_sum);
    println!("...delay checksum: {}", checksums.delay_sum);
}

fn main() -> ExitCode {
    env_logger::init();

    let destination = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("roundtrip_circuit"));

    let network =
        config::build_network(&scenario_params::get_scenario_params(), &StandardEnvironment)
            .unwrap();
    exchange::export(&network, &destination, true).unwrap();
    let imported = exchange::import(destination.join(MANIFEST_FILE), &StandardEnvironment).unwrap();

    let before = checksums(&network);
    let after = checksums(&imported);

    print_checksums("built", &before);
    print_checksums("imported", &after);

    let matches = before.parameter_sum == after.parameter_sum
        && before.num_connections == after.num_connections
        && before.weight_sum == after.weight_sum
        && before.delay_sum == after.delay_sum;

    if matches {
        println!("round trip ok");
        ExitCode::SUCCESS
    } else {
        println!("round trip mismatch");
        ExitCode::FAILURE
    }
}
