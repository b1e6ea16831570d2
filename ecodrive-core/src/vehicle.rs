//! Module containing the dual-motor vehicle struct and related functions.

use crate::imports::*;
use crate::motor_eff::{MotorEffModel, MotorEfficiency};

/// Drive axle of a dual-motor vehicle
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axle {
    Front,
    Rear,
}

/// Struct containing dual-motor (front/rear) electric vehicle attributes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Validate)]
pub struct DualMotorVehicle {
    /// Vehicle name
    #[serde(default)]
    pub scenario_name: String,
    /// Physical properties, see [PhysicalProperties]
    #[serde(default)]
    #[validate]
    pub props: PhysicalProperties,
    /// Total vehicle mass including cargo
    #[validate(range(min = 0))]
    pub veh_kg: f64,
    /// Distance between front and rear axles
    #[validate(range(min = 0))]
    pub wheel_base_m: f64,
    /// Height of the center of gravity above the road
    #[validate(range(min = 0))]
    pub cg_height_m: f64,
    /// Aerodynamic drag coefficient
    #[validate(range(min = 0))]
    pub drag_coef: f64,
    /// Projected frontal area for drag calculations
    #[validate(range(min = 0))]
    pub frontal_area_m2: f64,
    #[validate(range(min = 0))]
    pub wheel_radius_m: f64,
    /// Tire/road coefficient of friction
    #[validate(range(min = 0))]
    pub wheel_coef_of_fric: f64,
    /// Lower electrical torque limit of the rear motor, at the wheel
    pub rear_torque_min_nm: f64,
    /// Upper electrical torque limit of the rear motor, at the wheel
    pub rear_torque_max_nm: f64,
    /// Lower end of the front torque candidate range, at the wheel
    pub front_torque_min_nm: f64,
    /// Upper end of the front torque candidate range, at the wheel
    pub front_torque_max_nm: f64,
    /// Battery charge capacity
    #[validate(range(min = 0))]
    pub ess_capacity_ah: f64,
    /// Battery nominal voltage
    #[validate(range(min = 0))]
    pub ess_voltage_v: f64,
    /// Front drivetrain efficiency when driving
    #[validate(range(min = 0, max = 1))]
    pub drive_eff_front: f64,
    /// Rear drivetrain efficiency when driving
    #[validate(range(min = 0, max = 1))]
    pub drive_eff_rear: f64,
    /// Front drivetrain efficiency when regenerating
    #[validate(range(min = 0, max = 1))]
    pub brake_eff_front: f64,
    /// Rear drivetrain efficiency when regenerating
    #[validate(range(min = 0, max = 1))]
    pub brake_eff_rear: f64,
    #[serde(default)]
    pub front_motor_eff: MotorEffModel,
    #[serde(default)]
    pub rear_motor_eff: MotorEffModel,
}

impl DualMotorVehicle {
    /// Representative mid-size dual-motor EV
    pub fn mock_vehicle() -> Self {
        let mut veh = Self {
            scenario_name: String::from("Mid-size dual-motor AWD EV"),
            props: PhysicalProperties::default(),
            veh_kg: 1_850.0,
            wheel_base_m: 2.875,
            cg_height_m: 0.55,
            drag_coef: 0.29,
            frontal_area_m2: 2.3,
            wheel_radius_m: 0.33,
            wheel_coef_of_fric: 0.8,
            rear_torque_min_nm: -2_500.0,
            rear_torque_max_nm: 2_500.0,
            front_torque_min_nm: -1_500.0,
            front_torque_max_nm: 1_500.0,
            ess_capacity_ah: 200.0,
            ess_voltage_v: 360.0,
            drive_eff_front: 0.95,
            drive_eff_rear: 0.95,
            brake_eff_front: 0.9,
            brake_eff_rear: 0.9,
            front_motor_eff: MotorEffModel::Constant(0.92),
            rear_motor_eff: MotorEffModel::Constant(0.92),
        };
        veh.init().unwrap();
        veh
    }

    /// Ratio of CG height to wheelbase, scaling longitudinal load transfer
    pub fn cg_factor(&self) -> f64 {
        self.cg_height_m / self.wheel_base_m
    }

    /// Lumped aerodynamic coefficient such that drag force = coefficient * speed^2
    pub fn drag_force_coef(&self) -> f64 {
        0.5 * self.props.air_density_kg_per_m3 * self.drag_coef * self.frontal_area_m2
    }

    /// Wheel angular speed at vehicle speed `speed_mps`
    pub fn wheel_speed_rad_per_s(&self, speed_mps: f64) -> f64 {
        speed_mps / self.wheel_radius_m
    }

    /// Maximum wheel torque an axle carrying `normal_force_n` can transmit
    pub fn traction_limit_nm(&self, normal_force_n: f64) -> f64 {
        normal_force_n * self.wheel_coef_of_fric * self.wheel_radius_m
    }

    /// Usable battery energy for a full 0..1 SOC swing
    pub fn ess_energy_capacity_j(&self) -> f64 {
        self.ess_capacity_ah * self.ess_voltage_v * SECS_PER_HOUR
    }

    /// SOC change caused by drawing `pwr_elec_w` from the battery for `dt_s`.
    /// Positive values are discharge.
    pub fn soc_delta(&self, pwr_elec_w: f64, dt_s: f64) -> f64 {
        pwr_elec_w * dt_s / self.ess_energy_capacity_j()
    }

    /// Whether the rear torque lies within the rear motor's electrical limits
    pub fn rear_torque_in_range(&self, torque_nm: f64) -> bool {
        self.rear_torque_min_nm <= torque_nm && torque_nm <= self.rear_torque_max_nm
    }

    /// Linearly spaced front torque candidates covering the front torque range
    pub fn front_torque_candidates(&self, n: usize) -> Array1<f64> {
        Array1::linspace(self.front_torque_min_nm, self.front_torque_max_nm, n)
    }

    pub fn motor_eff(&self, axle: Axle) -> &MotorEffModel {
        match axle {
            Axle::Front => &self.front_motor_eff,
            Axle::Rear => &self.rear_motor_eff,
        }
    }

    /// Drivetrain efficiency of `axle` in drive or regeneration direction
    pub fn drivetrain_eff(&self, axle: Axle, regen: bool) -> f64 {
        match (axle, regen) {
            (Axle::Front, false) => self.drive_eff_front,
            (Axle::Front, true) => self.brake_eff_front,
            (Axle::Rear, false) => self.drive_eff_rear,
            (Axle::Rear, true) => self.brake_eff_rear,
        }
    }

    /// Factor converting mechanical axle power into battery power.
    /// Driving inflates mechanical power (factor >= 1), regeneration discounts it (factor <= 1).
    pub fn elec_pwr_factor(
        &self,
        axle: Axle,
        speed_mps: f64,
        torque_nm: f64,
    ) -> anyhow::Result<f64> {
        let motor_eff = self
            .motor_eff(axle)
            .efficiency(speed_mps, torque_nm, self.wheel_radius_m)?;
        elec_pwr_factor(motor_eff, self.drivetrain_eff(axle, torque_nm < 0.0), torque_nm)
            .with_context(|| format!("{axle:?} axle"))
    }
}

/// Factor converting mechanical power into electrical power given motor and
/// drivetrain efficiencies and the torque sign.
pub fn elec_pwr_factor(motor_eff: f64, drivetrain_eff: f64, torque_nm: f64) -> anyhow::Result<f64> {
    ensure!(
        motor_eff > 0.0 && motor_eff <= 1.0,
        "{}\nmotor efficiency lookup must return a value in (0, 1]",
        format_dbg!(motor_eff)
    );
    Ok(if torque_nm < 0.0 {
        drivetrain_eff * motor_eff
    } else {
        1.0 / (drivetrain_eff * motor_eff)
    })
}

impl SerdeAPI for DualMotorVehicle {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        ensure!(
            self.rear_torque_min_nm <= self.rear_torque_max_nm,
            "{}\nrear torque limits are inverted",
            format_dbg!((self.rear_torque_min_nm, self.rear_torque_max_nm))
        );
        ensure!(
            self.front_torque_min_nm <= self.front_torque_max_nm,
            "{}\nfront torque range is inverted",
            format_dbg!((self.front_torque_min_nm, self.front_torque_max_nm))
        );
        ensure!(
            self.wheel_base_m > 0.0 && self.wheel_radius_m > 0.0,
            "{}\nwheel base and wheel radius must be positive",
            format_dbg!((self.wheel_base_m, self.wheel_radius_m))
        );
        ensure!(
            self.ess_energy_capacity_j() > 0.0,
            "{}\nbattery capacity and voltage must be positive",
            format_dbg!((self.ess_capacity_ah, self.ess_voltage_v))
        );
        ensure!(
            self.drive_eff_front > 0.0 && self.drive_eff_rear > 0.0,
            "{}\ndrive efficiencies must be positive",
            format_dbg!((self.drive_eff_front, self.drive_eff_rear))
        );
        self.front_motor_eff
            .validate()
            .with_context(|| "invalid `front_motor_eff`")?;
        self.rear_motor_eff
            .validate()
            .with_context(|| "invalid `rear_motor_eff`")?;
        Ok(())
    }
}
