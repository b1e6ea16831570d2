//! Candidate edge state: one transition from a current speed to a next speed.

use crate::imports::*;
use crate::vehicle::DualMotorVehicle;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeKind {
    Downhill,
    Level,
    Uphill,
}

/// Road slope over the edge.  `angle_rad` is the magnitude of the road angle;
/// its direction is given by `kind`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Slope {
    pub kind: SlopeKind,
    #[serde(default)]
    pub angle_rad: f64,
}

impl Slope {
    pub fn level() -> Self {
        Self {
            kind: SlopeKind::Level,
            angle_rad: 0.0,
        }
    }

    /// Builds a slope from road grade (rise over run), positive uphill
    pub fn from_grade(grade: f64) -> Self {
        let kind = if grade > 0.0 {
            SlopeKind::Uphill
        } else if grade < 0.0 {
            SlopeKind::Downhill
        } else {
            SlopeKind::Level
        };
        Self {
            kind,
            angle_rad: grade.abs().atan(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.angle_rad >= 0.0 && self.angle_rad < std::f64::consts::FRAC_PI_2,
            "{}\nslope angle magnitude must be in [0, pi/2)",
            format_dbg!(self.angle_rad)
        );
        ensure!(
            self.kind != SlopeKind::Level || self.angle_rad == 0.0,
            "{}\nlevel slope must have zero angle; use `uphill` or `downhill` for a graded road",
            format_dbg!(self)
        );
        Ok(())
    }
}

impl Default for Slope {
    fn default() -> Self {
        Self::level()
    }
}

/// How far apart consecutive DP stages are
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSize {
    /// Fixed time between stages
    Time(f64),
    /// Fixed distance between stages; time follows from the mean speed
    Distance(f64),
}

impl StepSize {
    pub fn validate(&self) -> anyhow::Result<()> {
        let val = match self {
            Self::Time(dt_s) => dt_s,
            Self::Distance(ds_m) => ds_m,
        };
        ensure!(
            *val > 0.0 && val.is_finite(),
            "{}\nstep size must be positive and finite",
            format_dbg!(self)
        );
        Ok(())
    }
}

/// Reasons a candidate edge has no feasible control
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// |acceleration| exceeds the configured maximum
    AccelLimit,
    /// Next speed is outside the speed limit window
    SpeedLimit,
    /// Zero mean speed cannot cover a distance step
    StandstillDistanceStep,
    /// No torque pair satisfies the torque range and traction limits
    TorqueLimits,
    /// No torque pair keeps the battery within its SOC window
    SocWindow,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            Self::AccelLimit => "acceleration limit exceeded",
            Self::SpeedLimit => "next speed outside speed limits",
            Self::StandstillDistanceStep => "distance step at standstill",
            Self::TorqueLimits => "no torque pair within torque and traction limits",
            Self::SocWindow => "no torque pair within SOC window",
        };
        write!(f, "{desc}")
    }
}

/// Kinematic state of one candidate edge
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ApproxEq)]
pub struct CandidateEdge {
    pub speed_cur_mps: f64,
    pub speed_next_mps: f64,
    /// Mean of current and next speed
    pub speed_avg_mps: f64,
    pub accel_mps2: f64,
    pub dt_s: f64,
    pub wheel_speed_front_rad_per_s: f64,
    pub wheel_speed_rear_rad_per_s: f64,
}

impl CandidateEdge {
    /// Derives the edge state, or the reason the edge cannot exist.
    pub fn new(
        speed_cur_mps: f64,
        speed_next_mps: f64,
        step: StepSize,
        veh: &DualMotorVehicle,
    ) -> anyhow::Result<Result<Self, Rejection>> {
        step.validate()?;
        let speed_avg_mps = (speed_cur_mps + speed_next_mps) / 2.0;
        let dt_s = match step {
            StepSize::Time(dt_s) => dt_s,
            StepSize::Distance(ds_m) => {
                if speed_avg_mps <= 0.0 {
                    return Ok(Err(Rejection::StandstillDistanceStep));
                }
                ds_m / speed_avg_mps
            }
        };
        let wheel_speed = veh.wheel_speed_rad_per_s(speed_avg_mps);
        Ok(Ok(Self {
            speed_cur_mps,
            speed_next_mps,
            speed_avg_mps,
            accel_mps2: (speed_next_mps - speed_cur_mps) / dt_s,
            dt_s,
            wheel_speed_front_rad_per_s: wheel_speed,
            wheel_speed_rear_rad_per_s: wheel_speed,
        }))
    }

    /// Cheap guard run before any force, torque or SOC evaluation.
    /// Acceleration exactly at the limit is allowed.
    pub fn prefilter(&self, params: &DpParams) -> Option<Rejection> {
        prefilter(self.accel_mps2, self.speed_next_mps, params)
    }
}

/// Rejects an edge if |`accel_mps2`| exceeds the maximum acceleration, or
/// `speed_next_mps` is at/above the upper or below the lower speed limit.
/// Non-finite values are rejected as well.
pub fn prefilter(accel_mps2: f64, speed_next_mps: f64, params: &DpParams) -> Option<Rejection> {
    if !accel_mps2.is_finite() || accel_mps2.abs() > params.accel_max_mps2 {
        Some(Rejection::AccelLimit)
    } else if !speed_next_mps.is_finite()
        || speed_next_mps >= params.speed_limit_upper_mps
        || speed_next_mps < params.speed_limit_lower_mps
    {
        Some(Rejection::SpeedLimit)
    } else {
        None
    }
}
