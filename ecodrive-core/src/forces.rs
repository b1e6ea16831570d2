//! Longitudinal force and power model for a candidate edge.

use crate::edge::{CandidateEdge, Slope, SlopeKind};
use crate::imports::*;
use crate::vehicle::DualMotorVehicle;

/// Forces acting on the vehicle over one edge, and the propulsive power they require
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ApproxEq)]
pub struct ForceBundle {
    /// Normal force on the front axle
    pub normal_front_n: f64,
    /// Normal force on the rear axle
    pub normal_rear_n: f64,
    /// Gravity component along the road, positive when resisting motion
    pub grade_n: f64,
    /// Aerodynamic drag at mean speed
    pub drag_n: f64,
    /// Mass times acceleration
    pub inertial_n: f64,
    /// Mean speed times the sum of grade, drag and inertial forces
    pub pwr_req_w: f64,
}

impl ForceBundle {
    pub fn new(edge: &CandidateEdge, slope: &Slope, veh: &DualMotorVehicle) -> Self {
        let weight_n = veh.veh_kg * veh.props.a_grav_mps2;
        let inertial_n = veh.veh_kg * edge.accel_mps2;
        // load transferred to the rear axle by acceleration
        let accel_transfer_n = inertial_n * veh.cg_factor();
        let (sin, cos) = slope.angle_rad.sin_cos();

        let (normal_front_n, normal_rear_n, grade_n) = match slope.kind {
            SlopeKind::Level => (
                weight_n / 2.0 - accel_transfer_n,
                weight_n / 2.0 + accel_transfer_n,
                0.0,
            ),
            SlopeKind::Uphill => (
                weight_n * (cos / 2.0 - veh.cg_factor() * sin) - accel_transfer_n,
                weight_n * (cos / 2.0 + veh.cg_factor() * sin) + accel_transfer_n,
                weight_n * sin,
            ),
            SlopeKind::Downhill => (
                weight_n * (cos / 2.0 + veh.cg_factor() * sin) - accel_transfer_n,
                weight_n * (cos / 2.0 - veh.cg_factor() * sin) + accel_transfer_n,
                -weight_n * sin,
            ),
        };

        let drag_n = veh.drag_force_coef() * edge.speed_avg_mps.powi(2);
        let pwr_req_w = edge.speed_avg_mps * (grade_n + drag_n + inertial_n);

        Self {
            normal_front_n,
            normal_rear_n,
            grade_n,
            drag_n,
            inertial_n,
            pwr_req_w,
        }
    }

    pub fn traction_limit_front_nm(&self, veh: &DualMotorVehicle) -> f64 {
        veh.traction_limit_nm(self.normal_front_n)
    }

    pub fn traction_limit_rear_nm(&self, veh: &DualMotorVehicle) -> f64 {
        veh.traction_limit_nm(self.normal_rear_n)
    }
}
