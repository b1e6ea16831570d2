//! Per-transition evaluation: the minimum-power control moving the vehicle
//! from a current speed to one candidate next speed, and the resulting
//! subtotal energy to the destination.
//!
//! Stages run in a fixed order and stop at the first one leaving no
//! candidate:
//! 1. feasibility pre-filter on acceleration and next speed
//! 2. force and required power model
//! 3. torque range, rear traction and front traction limits
//! 4. motor and drivetrain efficiency
//! 5. SOC window
//! 6. minimum electrical power
//! 7. energy accumulation against the successor DP slice

use crate::candidates::{
    apply_soc_constraint, select_min_power, ConstraintRecord, RegenMode, SocWindow, TorquePairs,
};
use crate::dp_table::StageContext;
use crate::edge::{CandidateEdge, Rejection, Slope, StepSize};
use crate::forces::ForceBundle;
use crate::imports::*;
use crate::vehicle::DualMotorVehicle;

/// Selected control and energy of one feasible next-speed slot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ApproxEq)]
pub struct SlotResult {
    pub next_speed_mps: f64,
    /// Battery power of the selected control
    pub pwr_w: f64,
    pub front_torque_nm: f64,
    pub rear_torque_nm: f64,
    pub regen_mode: RegenMode,
    pub dt_s: f64,
    /// Energy of this edge alone
    pub energy_j: f64,
    /// Energy from the current state to the destination through this slot.
    /// `None` when the next speed has no known path to the destination.
    pub subtotal_energy_j: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOutcome {
    Feasible(SlotResult),
    Infeasible(Rejection),
}

impl SlotOutcome {
    pub fn feasible(&self) -> Option<&SlotResult> {
        match self {
            Self::Feasible(res) => Some(res),
            Self::Infeasible(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Feasible(_) => None,
            Self::Infeasible(rej) => Some(*rej),
        }
    }
}

/// Outcome of one transition together with its diagnostic constraint record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub outcome: SlotOutcome,
    pub constraints: ConstraintRecord,
}

impl TransitionOutcome {
    fn infeasible(rejection: Rejection, constraints: ConstraintRecord) -> Self {
        Self {
            outcome: SlotOutcome::Infeasible(rejection),
            constraints,
        }
    }
}

/// Evaluates transitions for one vehicle under one set of sweep bounds
#[derive(Clone, Copy, Debug)]
pub struct TransitionEvaluator<'a> {
    pub veh: &'a DualMotorVehicle,
    pub params: &'a DpParams,
}

impl<'a> TransitionEvaluator<'a> {
    pub fn new(veh: &'a DualMotorVehicle, params: &'a DpParams) -> Self {
        Self { veh, params }
    }

    /// Evaluates the transition from `speed_cur_mps` to `speed_next_mps`.
    ///
    /// Infeasible transitions are `Ok` with [SlotOutcome::Infeasible];
    /// `Err` is reserved for inconsistent inputs such as a missing successor
    /// slice, an invalid slope or an efficiency lookup failure.
    ///
    /// # Arguments
    /// - `front_torques_nm`: front torque candidates; the rear torque of each
    ///   candidate is derived from the required power
    /// - `ctx`: read-only view of the DP table around the current state
    pub fn evaluate(
        &self,
        speed_cur_mps: f64,
        speed_next_mps: f64,
        step: StepSize,
        slope: &Slope,
        front_torques_nm: ArrayView1<f64>,
        ctx: &StageContext,
    ) -> anyhow::Result<TransitionOutcome> {
        slope.validate()?;
        let mut constraints = ConstraintRecord::default();

        let edge = match CandidateEdge::new(speed_cur_mps, speed_next_mps, step, self.veh)? {
            Ok(edge) => edge,
            Err(rejection) => {
                log::debug!("{speed_cur_mps} -> {speed_next_mps} m/s rejected: {rejection}");
                return Ok(TransitionOutcome::infeasible(rejection, constraints));
            }
        };
        if let Some(rejection) = edge.prefilter(self.params) {
            log::debug!(
                "{speed_cur_mps} -> {speed_next_mps} m/s rejected: {rejection} (accel {} m/s2)",
                edge.accel_mps2
            );
            return Ok(TransitionOutcome::infeasible(rejection, constraints));
        }

        let forces = ForceBundle::new(&edge, slope, self.veh);
        let mut pairs = TorquePairs::from_front_candidates(front_torques_nm, &edge, &forces);
        pairs.apply_torque_constraints(&forces, self.veh, &mut constraints);
        if pairs.is_empty() {
            log::debug!(
                "{speed_cur_mps} -> {speed_next_mps} m/s rejected: {}",
                Rejection::TorqueLimits
            );
            return Ok(TransitionOutcome::infeasible(
                Rejection::TorqueLimits,
                constraints,
            ));
        }

        let mut powered = pairs.power(&edge, self.veh)?;
        let window = self.soc_window(ctx)?;
        apply_soc_constraint(&mut powered, &window, &mut constraints);

        let best = match select_min_power(&powered) {
            Some(best) => best,
            None => {
                log::debug!(
                    "{speed_cur_mps} -> {speed_next_mps} m/s rejected: {}",
                    Rejection::SocWindow
                );
                return Ok(TransitionOutcome::infeasible(
                    Rejection::SocWindow,
                    constraints,
                ));
            }
        };

        let energy_j = best.pwr_elec_w * edge.dt_s;
        let subtotal_energy_j = self.subtotal_energy(energy_j, speed_next_mps, ctx)?;

        Ok(TransitionOutcome {
            outcome: SlotOutcome::Feasible(SlotResult {
                next_speed_mps: speed_next_mps,
                pwr_w: best.pwr_elec_w,
                front_torque_nm: best.pair.front_torque_nm,
                rear_torque_nm: best.pair.rear_torque_nm,
                regen_mode: best.regen_mode,
                dt_s: edge.dt_s,
                energy_j,
                subtotal_energy_j,
            }),
            constraints,
        })
    }

    /// Evaluates every target speed from one DP state.  The returned vector
    /// is index-aligned with `targets_mps`.
    pub fn evaluate_targets(
        &self,
        speed_cur_mps: f64,
        targets_mps: &[f64],
        step: StepSize,
        slope: &Slope,
        front_torques_nm: ArrayView1<f64>,
        ctx: &StageContext,
    ) -> anyhow::Result<Vec<TransitionOutcome>> {
        targets_mps
            .iter()
            .map(|&speed_next_mps| {
                self.evaluate(
                    speed_cur_mps,
                    speed_next_mps,
                    step,
                    slope,
                    front_torques_nm,
                    ctx,
                )
                .with_context(|| format_dbg!((speed_cur_mps, speed_next_mps)))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    }

    fn soc_window(&self, ctx: &StageContext) -> anyhow::Result<SocWindow> {
        if ctx.position.is_final() {
            return Ok(SocWindow::Budget {
                soc_span: self.params.soc_span(),
            });
        }
        let (cell_soc_min, cell_soc_max) = ctx.current_soc_band()?;
        if cell_soc_min > cell_soc_max {
            log::warn!(
                "inverted SOC band in DP cell {:?}: min {cell_soc_min} > max {cell_soc_max}",
                ctx.position
            );
        }
        Ok(SocWindow::Cell {
            cell_soc_min,
            cell_soc_max,
            soc_min: self.params.soc_min,
            soc_max: self.params.soc_max,
        })
    }

    fn subtotal_energy(
        &self,
        energy_j: f64,
        speed_next_mps: f64,
        ctx: &StageContext,
    ) -> anyhow::Result<Option<f64>> {
        if ctx.position.is_final() {
            return Ok(Some(energy_j + self.params.terminal_energy_j));
        }
        let successor = ctx.successor()?;
        let subtotal = successor
            .subtotal_at_speed(speed_next_mps, self.params.speed_match_tol_mps)
            .map(|downstream_j| energy_j + downstream_j);
        if subtotal.is_none() {
            log::debug!(
                "no successor row at {speed_next_mps} m/s for time step {}",
                ctx.position.time_step_idx + 1
            );
        }
        Ok(subtotal)
    }
}

/// Index and result of the feasible slot with the smallest known subtotal
/// energy; the earliest slot wins ties.
pub fn best_slot(outcomes: &[TransitionOutcome]) -> Option<(usize, &SlotResult)> {
    outcomes
        .iter()
        .enumerate()
        .filter_map(|(i, o)| {
            let res = o.outcome.feasible()?;
            res.subtotal_energy_j.map(|subtotal| (i, res, subtotal))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(i, res, _)| (i, res))
}
