use circuitry::config::{self, NetworkParams};

pub fn get_scenario_params() -> NetworkParams {
    let params_yaml_str = r#"
seed: 0
populations:
- label: population_one
  size: 10
  cell_type: IF_cond_exp
  parameters:
    v_rest: !Constant -65.0
    tau_m: !Linear
      offset: 10.0
      slope: 0.1
    cm: !Random
      kind: normal
      params: [0.5, 0.05]
- label: population_two
  size: 20
  cell_type: IF_curr_alpha
  parameters:
    v_rest: !Constant -64.0
    tau_m: !Linear
      offset: 11.0
      slope: 0.1
projections:
- source: population_one
  target: population_two
  connector: !FixedProbability
    p_connect: 0.5
    allow_self_connections: false
  weight: !Random
    kind: uniform
    params: [0.0, 0.1]
  delay: !Constant 0.5
  receptor_type: excitatory
- source: population_two
  target: population_two
  connector: !FixedProbability
    p_connect: 0.1
    allow_self_connections: false
  weight: !Constant 0.02
  delay: !Random
    kind: uniform
    params: [0.5, 2.0]
  receptor_type: inhibitory
  synapse_model: !TsodyksMarkram
    u: 0.5
    tau_rec: 100.0
    tau_facil: 0.0
    u0: 0.0
    x0: 1.0
    y0: 0.0
"#;

    config::from_yaml(params_yaml_str).unwrap()
}
