//! Front/rear torque candidates and the constraint stages that narrow them.
//!
//! Each candidate is a single record holding both torques, so filtering can
//! never break the pairing between a front torque and its rear torque.  Every
//! record keeps the index it had in the raw candidate vector, which is what
//! [ConstraintRecord] reports.

use crate::edge::CandidateEdge;
use crate::forces::ForceBundle;
use crate::imports::*;
use crate::vehicle::{Axle, DualMotorVehicle};

/// Which axles are regenerating, from the signs of the two torques
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenMode {
    /// Both torques negative
    Both,
    /// Front negative, rear non-negative
    Front,
    /// Rear negative, front non-negative
    Rear,
    /// Both torques non-negative
    Neither,
}

impl RegenMode {
    pub fn from_torques(front_torque_nm: f64, rear_torque_nm: f64) -> Self {
        match (front_torque_nm < 0.0, rear_torque_nm < 0.0) {
            (true, true) => Self::Both,
            (true, false) => Self::Front,
            (false, true) => Self::Rear,
            (false, false) => Self::Neither,
        }
    }
}

impl ApproxEq for RegenMode {
    fn approx_eq(&self, other: &RegenMode, _tol: f64) -> bool {
        self == other
    }
}

/// One (front torque, rear torque) control candidate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TorquePair {
    /// Position in the raw candidate vector
    pub idx: usize,
    pub front_torque_nm: f64,
    pub rear_torque_nm: f64,
}

/// A [TorquePair] with its electrical power and SOC effect evaluated
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoweredPair {
    pub pair: TorquePair,
    /// Mechanical to electrical power factor of the front axle
    pub front_eff_factor: f64,
    /// Mechanical to electrical power factor of the rear axle
    pub rear_eff_factor: f64,
    /// Battery power, negative when charging
    pub pwr_elec_w: f64,
    pub soc_delta: f64,
    pub regen_mode: RegenMode,
}

/// Indices (into the raw candidate vector) surviving each constraint stage
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRecord {
    pub torque_range: Vec<usize>,
    pub rear_traction: Vec<usize>,
    pub front_traction: Vec<usize>,
    pub soc: Vec<usize>,
}

/// Ordered, index-aligned front/rear torque candidates
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TorquePairs(Vec<TorquePair>);

impl TorquePairs {
    /// Derives the rear torque for each front torque candidate so that front
    /// and rear axle power together supply the required power.
    pub fn from_front_candidates(
        front_torques_nm: ArrayView1<f64>,
        edge: &CandidateEdge,
        forces: &ForceBundle,
    ) -> Self {
        Self(
            front_torques_nm
                .iter()
                .enumerate()
                .map(|(idx, &front_torque_nm)| {
                    let pwr_front_w = edge.wheel_speed_front_rad_per_s * front_torque_nm;
                    let pwr_rear_w = forces.pwr_req_w - pwr_front_w;
                    // at standstill no power is exchanged and the rear motor holds no torque
                    let rear_torque_nm = if edge.wheel_speed_rear_rad_per_s.abs() > f64::EPSILON {
                        pwr_rear_w / edge.wheel_speed_rear_rad_per_s
                    } else {
                        0.0
                    };
                    TorquePair {
                        idx,
                        front_torque_nm,
                        rear_torque_nm,
                    }
                })
                .collect(),
        )
    }

    /// Pairs up externally supplied front and rear torque vectors.
    /// Vectors of different lengths cannot be aligned and are rejected.
    pub fn from_arrays(
        front_torques_nm: ArrayView1<f64>,
        rear_torques_nm: ArrayView1<f64>,
    ) -> anyhow::Result<Self> {
        ensure!(
            front_torques_nm.len() == rear_torques_nm.len(),
            "{}\nfront and rear torque candidate vectors must have identical length",
            format_dbg!((front_torques_nm.len(), rear_torques_nm.len()))
        );
        Ok(Self(
            front_torques_nm
                .iter()
                .zip(rear_torques_nm.iter())
                .enumerate()
                .map(|(idx, (&front_torque_nm, &rear_torque_nm))| TorquePair {
                    idx,
                    front_torque_nm,
                    rear_torque_nm,
                })
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[TorquePair] {
        &self.0
    }

    /// Raw candidate indices of the surviving pairs
    pub fn indices(&self) -> Vec<usize> {
        self.0.iter().map(|p| p.idx).collect()
    }

    /// Keeps only the pairs satisfying `pred`
    pub fn retain<F: FnMut(&TorquePair) -> bool>(&mut self, pred: F) -> &mut Self {
        self.0.retain(pred);
        self
    }

    /// Front and rear torque vectors, index-aligned
    pub fn to_arrays(&self) -> (Array1<f64>, Array1<f64>) {
        (
            self.0.iter().map(|p| p.front_torque_nm).collect(),
            self.0.iter().map(|p| p.rear_torque_nm).collect(),
        )
    }

    /// Applies the torque range, rear traction and front traction stages in
    /// order, recording the survivors of each in `record`.
    pub fn apply_torque_constraints(
        &mut self,
        forces: &ForceBundle,
        veh: &DualMotorVehicle,
        record: &mut ConstraintRecord,
    ) {
        self.retain(|p| veh.rear_torque_in_range(p.rear_torque_nm));
        record.torque_range = self.indices();

        let rear_limit_nm = forces.traction_limit_rear_nm(veh);
        self.retain(|p| p.rear_torque_nm <= rear_limit_nm);
        record.rear_traction = self.indices();

        let front_limit_nm = forces.traction_limit_front_nm(veh);
        self.retain(|p| p.front_torque_nm <= front_limit_nm);
        record.front_traction = self.indices();

        log::trace!(
            "torque stages: range {}, rear traction {}, front traction {}",
            record.torque_range.len(),
            record.rear_traction.len(),
            record.front_traction.len()
        );
    }

    /// Evaluates electrical power and SOC change of every surviving pair
    pub fn power(
        &self,
        edge: &CandidateEdge,
        veh: &DualMotorVehicle,
    ) -> anyhow::Result<Vec<PoweredPair>> {
        self.0
            .iter()
            .map(|&pair| {
                let front_eff_factor =
                    veh.elec_pwr_factor(Axle::Front, edge.speed_avg_mps, pair.front_torque_nm)?;
                let rear_eff_factor =
                    veh.elec_pwr_factor(Axle::Rear, edge.speed_avg_mps, pair.rear_torque_nm)?;
                let pwr_front_mech_w = edge.wheel_speed_front_rad_per_s * pair.front_torque_nm;
                let pwr_rear_mech_w = edge.wheel_speed_rear_rad_per_s * pair.rear_torque_nm;
                let pwr_elec_w =
                    pwr_front_mech_w * front_eff_factor + pwr_rear_mech_w * rear_eff_factor;
                Ok(PoweredPair {
                    pair,
                    front_eff_factor,
                    rear_eff_factor,
                    pwr_elec_w,
                    soc_delta: veh.soc_delta(pwr_elec_w, edge.dt_s),
                    regen_mode: RegenMode::from_torques(pair.front_torque_nm, pair.rear_torque_nm),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format_dbg!(edge))
    }
}

/// Admissible SOC test for one candidate
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SocWindow {
    /// Last stage: the SOC change alone must fit inside the SOC span
    Budget { soc_span: f64 },
    /// Earlier stages: projected from the current DP cell's SOC extrema
    Cell {
        cell_soc_min: f64,
        cell_soc_max: f64,
        soc_min: f64,
        soc_max: f64,
    },
}

impl SocWindow {
    /// Whether a candidate with SOC change `soc_delta` is admissible.
    ///
    /// For [SocWindow::Cell] either projection staying in bounds admits the
    /// candidate, even if the other one leaves the band.
    pub fn admits(&self, soc_delta: f64) -> bool {
        match *self {
            Self::Budget { soc_span } => soc_delta.abs() <= soc_span,
            Self::Cell {
                cell_soc_min,
                cell_soc_max,
                soc_min,
                soc_max,
            } => cell_soc_min + soc_delta <= soc_max || cell_soc_max + soc_delta >= soc_min,
        }
    }
}

/// Keeps the candidates admitted by `window`, recording the survivors
pub fn apply_soc_constraint(
    powered: &mut Vec<PoweredPair>,
    window: &SocWindow,
    record: &mut ConstraintRecord,
) {
    powered.retain(|p| window.admits(p.soc_delta));
    record.soc = powered.iter().map(|p| p.pair.idx).collect();
    log::trace!("SOC stage: {} survivors", record.soc.len());
}

/// Candidate with minimum electrical power; the earliest one wins ties.
pub fn select_min_power(powered: &[PoweredPair]) -> Option<&PoweredPair> {
    powered
        .iter()
        .min_by(|a, b| a.pwr_elec_w.total_cmp(&b.pwr_elec_w))
}
