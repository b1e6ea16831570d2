//! Self-contained description of one DP state and its candidate next speeds,
//! loadable from YAML or JSON.

use crate::dp_table::{DpSlice, StageContext, SweepPosition};
use crate::edge::{Slope, StepSize};
use crate::imports::*;
use crate::transition::{best_slot, SlotResult, TransitionEvaluator, TransitionOutcome};
use crate::vehicle::DualMotorVehicle;

fn default_n_front_torque_candidates() -> usize {
    21
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionScenario {
    pub vehicle: DualMotorVehicle,
    #[serde(default)]
    pub dp_params: DpParams,
    #[serde(default)]
    pub slope: Slope,
    pub step: StepSize,
    pub cur_speed_mps: f64,
    /// Candidate next speeds, one output slot each
    pub target_speeds_mps: Vec<f64>,
    /// Explicit front torque candidates; when absent, `n_front_torque_candidates`
    /// values spaced evenly over the vehicle's front torque range are used
    #[serde(default)]
    pub front_torque_candidates_nm: Option<Vec<f64>>,
    #[serde(default = "default_n_front_torque_candidates")]
    pub n_front_torque_candidates: usize,
    pub position: SweepPosition,
    pub current_slice: DpSlice,
    /// Required unless `position` is the last time-step
    #[serde(default)]
    pub next_slice: Option<DpSlice>,
}

impl SerdeAPI for TransitionScenario {
    fn init(&mut self) -> anyhow::Result<()> {
        self.vehicle.init().with_context(|| "invalid `vehicle`")?;
        self.dp_params.init().with_context(|| "invalid `dp_params`")?;
        self.slope.validate()?;
        self.step.validate()?;
        self.current_slice
            .init()
            .with_context(|| "invalid `current_slice`")?;
        if let Some(next) = self.next_slice.as_mut() {
            next.init().with_context(|| "invalid `next_slice`")?;
        }
        match &self.front_torque_candidates_nm {
            Some(cands) => ensure!(
                !cands.is_empty(),
                "`front_torque_candidates_nm` must not be empty"
            ),
            None => ensure!(
                self.n_front_torque_candidates >= 1,
                "{}\nat least one front torque candidate is required",
                format_dbg!(self.n_front_torque_candidates)
            ),
        }
        // checks sweep position and successor availability
        self.stage_context()?;
        Ok(())
    }
}

impl TransitionScenario {
    pub fn stage_context(&self) -> anyhow::Result<StageContext<'_>> {
        StageContext::new(self.position, &self.current_slice, self.next_slice.as_ref())
    }

    pub fn front_torque_candidates(&self) -> Array1<f64> {
        match &self.front_torque_candidates_nm {
            Some(cands) => Array1::from_vec(cands.clone()),
            None => self
                .vehicle
                .front_torque_candidates(self.n_front_torque_candidates),
        }
    }

    /// Evaluates every target speed, index-aligned with `target_speeds_mps`
    pub fn evaluate(&self) -> anyhow::Result<Vec<TransitionOutcome>> {
        let ctx = self.stage_context()?;
        let front_torques_nm = self.front_torque_candidates();
        log::debug!(
            "evaluating {} target speeds from {} m/s at time step {}",
            self.target_speeds_mps.len(),
            self.cur_speed_mps,
            self.position.time_step_idx
        );
        TransitionEvaluator::new(&self.vehicle, &self.dp_params).evaluate_targets(
            self.cur_speed_mps,
            &self.target_speeds_mps,
            self.step,
            &self.slope,
            front_torques_nm.view(),
            &ctx,
        )
    }

    /// Evaluates every target speed and returns the outcomes along with the
    /// best slot, if any slot has a known subtotal energy
    pub fn solve(&self) -> anyhow::Result<ScenarioResults> {
        let outcomes = self.evaluate()?;
        let best = best_slot(&outcomes).map(|(idx, res)| BestSlot {
            slot_idx: idx,
            result: res.clone(),
        });
        Ok(ScenarioResults { outcomes, best })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestSlot {
    pub slot_idx: usize,
    pub result: SlotResult,
}

/// Per-slot outcomes of a [TransitionScenario]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResults {
    pub outcomes: Vec<TransitionOutcome>,
    pub best: Option<BestSlot>,
}

impl SerdeAPI for ScenarioResults {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Rejection;

    fn scenario() -> TransitionScenario {
        TransitionScenario {
            vehicle: DualMotorVehicle::mock_vehicle(),
            dp_params: DpParams::default(),
            slope: Slope::level(),
            step: StepSize::Time(2.0),
            cur_speed_mps: 10.0,
            target_speeds_mps: vec![8.0, 10.0, 12.0, 30.0],
            front_torque_candidates_nm: None,
            n_front_torque_candidates: 21,
            position: SweepPosition {
                time_step_idx: 0,
                n_time_steps: 2,
                cur_speed_idx: 0,
            },
            current_slice: DpSlice::new(vec![10.0], vec![f64::NAN], vec![0.5], vec![0.5])
                .unwrap(),
            next_slice: Some(
                DpSlice::new(
                    vec![8.0, 10.0, 12.0],
                    vec![2.0e5, 1.0e5, 1.5e5],
                    vec![0.5; 3],
                    vec![0.5; 3],
                )
                .unwrap(),
            ),
        }
    }

    #[test]
    fn test_scenario_yaml_round_trip() {
        let scenario = scenario();
        let yaml = scenario.to_yaml().unwrap();
        let scenario_rt = TransitionScenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario_rt.vehicle, scenario.vehicle);
        assert_eq!(scenario_rt.position, scenario.position);
        assert!(scenario_rt
            .next_slice
            .approx_eq(&scenario.next_slice, 1e-12));
    }

    #[test]
    fn test_scenario_requires_successor() {
        let mut scenario = scenario();
        scenario.next_slice = None;
        assert!(scenario.init().is_err());
        scenario.position.time_step_idx = 1;
        assert!(scenario.init().is_ok());
    }

    #[test]
    fn test_scenario_solve() {
        let res = scenario().solve().unwrap();
        assert_eq!(res.outcomes.len(), 4);
        assert_eq!(
            res.outcomes[3].outcome.rejection(),
            Some(Rejection::AccelLimit)
        );
        let best = res.best.unwrap();
        let subtotal = best.result.subtotal_energy_j.unwrap();
        for outcome in &res.outcomes {
            if let Some(Some(other)) = outcome.outcome.feasible().map(|r| r.subtotal_energy_j) {
                assert!(subtotal <= other);
            }
        }
    }

    #[test]
    fn test_level_slope_with_angle_rejected() {
        let mut scenario = scenario();
        scenario.slope.angle_rad = 0.3;
        assert!(scenario.init().is_err());
    }

    #[test]
    fn test_explicit_front_candidates() {
        let mut scenario = scenario();
        scenario.front_torque_candidates_nm = Some(vec![0.0]);
        assert_eq!(scenario.front_torque_candidates(), array![0.0]);
        scenario.front_torque_candidates_nm = Some(vec![]);
        assert!(scenario.init().is_err());
    }
}
