use clap::{ArgGroup, Parser};

extern crate ecodrive_core;
use ecodrive_core::params::MPH_PER_MPS;
use ecodrive_core::scenario::{ScenarioResults, TransitionScenario};
use ecodrive_core::traits::SerdeAPI;
use ecodrive_core::transition::SlotOutcome;

/// Evaluates every candidate next speed of one DP state.
/// After running `cargo build --release`, run with
/// ```bash
/// ./target/release/ecodrive-cli --scenario-file ecodrive-core/tests/assets/uphill_mid_sweep.yaml
/// ```
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(group(
    ArgGroup::new("input")
    .required(true)
    .args(&["scenario", "scenario-file"])
))]
struct EcodriveApi {
    /// Scenario as json string
    #[clap(long, value_parser)]
    scenario: Option<String>,
    /// Path to scenario file (yaml or json)
    #[clap(long, value_parser)]
    scenario_file: Option<String>,
    /// How to return results: `summary` (default), `json` or `yaml`
    #[clap(long, value_parser)]
    res_fmt: Option<String>,
}

/// One line of the summary table
#[derive(Debug)]
struct SlotSummary {
    next_speed_mps: f64,
    status: String,
    pwr_w: Option<f64>,
    subtotal_energy_j: Option<f64>,
}

impl SlotSummary {
    fn new(next_speed_mps: f64, outcome: &SlotOutcome) -> Self {
        match outcome {
            SlotOutcome::Feasible(res) => Self {
                next_speed_mps,
                status: format!("{:?}", res.regen_mode),
                pwr_w: Some(res.pwr_w),
                subtotal_energy_j: res.subtotal_energy_j,
            },
            SlotOutcome::Infeasible(rejection) => Self {
                next_speed_mps,
                status: rejection.to_string(),
                pwr_w: None,
                subtotal_energy_j: None,
            },
        }
    }
}

fn print_summary(scenario: &TransitionScenario, res: &ScenarioResults) {
    println!(
        "current speed: {} m/s ({:.1} mph)",
        scenario.cur_speed_mps,
        scenario.cur_speed_mps * MPH_PER_MPS
    );
    for (speed, outcome) in scenario.target_speeds_mps.iter().zip(&res.outcomes) {
        let line = SlotSummary::new(*speed, &outcome.outcome);
        let fmt_opt = |val: Option<f64>| val.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
        println!(
            "{:>8.3} m/s  {:>12} W  {:>14} J  {}",
            line.next_speed_mps,
            fmt_opt(line.pwr_w),
            fmt_opt(line.subtotal_energy_j),
            line.status
        );
    }
    match &res.best {
        Some(best) => println!(
            "best next speed: {} m/s (slot {})",
            best.result.next_speed_mps, best.slot_idx
        ),
        None => println!("best next speed: none"),
    }
}

pub fn main() -> anyhow::Result<()> {
    let api = EcodriveApi::parse();

    let scenario = if let Some(scenario_json) = api.scenario {
        TransitionScenario::from_json(scenario_json)?
    } else if let Some(scenario_file) = api.scenario_file {
        TransitionScenario::from_file(scenario_file)?
    } else {
        anyhow::bail!("Need to provide `--scenario` or `--scenario-file`")
    };

    let res = scenario.solve()?;

    match api.res_fmt.as_deref().unwrap_or("summary") {
        "summary" => print_summary(&scenario, &res),
        "json" => println!("{}", res.to_json()?),
        "yaml" => print!("{}", res.to_yaml()?),
        other => anyhow::bail!(
            "Unsupported result format {other:?}, must be one of `summary`, `json` or `yaml`"
        ),
    }
    Ok(())
}
