//! Motor efficiency lookups.
//!
//! The transition evaluator only relies on [MotorEfficiency]; the models here
//! are the ones a vehicle file can carry.  [EfficiencyMap] is a rectilinear
//! motor-speed by torque-magnitude map evaluated with bilinear interpolation.

use crate::imports::*;

/// Efficiency of a traction motor (including its power electronics) at a
/// given operating point.  Implementations must return a value in (0, 1].
pub trait MotorEfficiency {
    /// # Arguments
    /// - `speed_mps`: vehicle speed
    /// - `torque_nm`: wheel torque, negative when regenerating
    /// - `wheel_radius_m`: wheel radius used to convert speed to shaft speed
    fn efficiency(&self, speed_mps: f64, torque_nm: f64, wheel_radius_m: f64)
        -> anyhow::Result<f64>;
}

/// Extrapolation strategy.
///
/// Controls what happens if the requested operating point is outside the
/// bounds of the map grid.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub enum Extrapolate {
    /// Restrict the operating point to the limits of the grid, using [`f64::clamp`].
    #[default]
    Clamp,
    /// Return an error when the operating point is beyond the limits of the grid.
    Error,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorEffModel {
    /// Same efficiency at every operating point
    Constant(f64),
    /// Speed/torque efficiency map
    Map(EfficiencyMap),
}

impl Default for MotorEffModel {
    fn default() -> Self {
        Self::Constant(0.92)
    }
}

impl MotorEffModel {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::Constant(eff) => {
                ensure!(
                    *eff > 0.0 && *eff <= 1.0,
                    "{}\nconstant motor efficiency must be in (0, 1]",
                    format_dbg!(eff)
                );
                Ok(())
            }
            Self::Map(map) => map.validate(),
        }
    }
}

impl MotorEfficiency for MotorEffModel {
    fn efficiency(
        &self,
        speed_mps: f64,
        torque_nm: f64,
        wheel_radius_m: f64,
    ) -> anyhow::Result<f64> {
        match self {
            Self::Constant(eff) => Ok(*eff),
            Self::Map(map) => map.efficiency(speed_mps, torque_nm, wheel_radius_m),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EfficiencyMap {
    /// Motor shaft speed grid, monotonically increasing
    pub speed_rpm: Vec<f64>,
    /// Motor torque magnitude grid, monotonically increasing
    pub torque_nm: Vec<f64>,
    /// Efficiency at each (speed, torque) grid point, indexed `[speed][torque]`
    pub eff: Vec<Vec<f64>>,
    /// Wheel to motor speed ratio
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,
    #[serde(default)]
    pub extrapolate: Extrapolate,
}

fn default_gear_ratio() -> f64 {
    1.0
}

impl EfficiencyMap {
    /// Create and validate efficiency map
    pub fn new(
        speed_rpm: Vec<f64>,
        torque_nm: Vec<f64>,
        eff: Vec<Vec<f64>>,
        gear_ratio: f64,
        extrapolate: Extrapolate,
    ) -> anyhow::Result<Self> {
        let map = Self {
            speed_rpm,
            torque_nm,
            eff,
            gear_ratio,
            extrapolate,
        };
        map.validate()?;
        Ok(map)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.speed_rpm.len() >= 2 && self.torque_nm.len() >= 2,
            "Efficiency map grids need at least two points per dimension"
        );
        ensure!(
            utils::is_strictly_increasing(&self.speed_rpm)
                && utils::is_strictly_increasing(&self.torque_nm),
            "{}\nEfficiency map grid coordinates must be sorted and non-repeating",
            format_dbg!((&self.speed_rpm, &self.torque_nm))
        );
        let speed_dim_ok = self.speed_rpm.len() == self.eff.len();
        let torque_dim_ok = self
            .eff
            .iter()
            .all(|row| row.len() == self.torque_nm.len());
        ensure!(
            speed_dim_ok && torque_dim_ok,
            "Efficiency map grid and values are not compatible shapes"
        );
        ensure!(
            self.eff.iter().flatten().all(|&e| e > 0.0 && e <= 1.0),
            "Efficiency map values must be in (0, 1]"
        );
        ensure!(
            self.gear_ratio > 0.0,
            "{}\ngear ratio must be positive",
            format_dbg!(self.gear_ratio)
        );
        Ok(())
    }

    /// Bilinear interpolation at (`speed_rpm`, `torque_nm`) on the motor side
    pub fn interpolate(&self, speed_rpm: f64, torque_nm: f64) -> anyhow::Result<f64> {
        let (x, y) = match self.extrapolate {
            Extrapolate::Clamp => (
                clamp_to_grid(speed_rpm, &self.speed_rpm),
                clamp_to_grid(torque_nm, &self.torque_nm),
            ),
            Extrapolate::Error => {
                ensure!(
                    in_grid(speed_rpm, &self.speed_rpm) && in_grid(torque_nm, &self.torque_nm),
                    "Attempted to interpolate at point beyond grid data: point = {:?}, speed grid = {:?}, torque grid = {:?}",
                    (speed_rpm, torque_nm),
                    self.speed_rpm,
                    self.torque_nm,
                );
                (speed_rpm, torque_nm)
            }
        };

        let x_l = find_lower_index(&self.speed_rpm, x);
        let x_u = x_l + 1;
        let x_diff = (x - self.speed_rpm[x_l]) / (self.speed_rpm[x_u] - self.speed_rpm[x_l]);

        let y_l = find_lower_index(&self.torque_nm, y);
        let y_u = y_l + 1;
        let y_diff = (y - self.torque_nm[y_l]) / (self.torque_nm[y_u] - self.torque_nm[y_l]);

        // interpolate in the speed direction
        let c0 = self.eff[x_l][y_l] * (1.0 - x_diff) + self.eff[x_u][y_l] * x_diff;
        let c1 = self.eff[x_l][y_u] * (1.0 - x_diff) + self.eff[x_u][y_u] * x_diff;

        // interpolate in the torque direction
        Ok(c0 * (1.0 - y_diff) + c1 * y_diff)
    }
}

impl MotorEfficiency for EfficiencyMap {
    fn efficiency(
        &self,
        speed_mps: f64,
        torque_nm: f64,
        wheel_radius_m: f64,
    ) -> anyhow::Result<f64> {
        ensure!(
            wheel_radius_m > 0.0,
            "{}\nwheel radius must be positive",
            format_dbg!(wheel_radius_m)
        );
        let motor_speed_rpm = speed_mps.abs() / wheel_radius_m * self.gear_ratio / RAD_PER_S_PER_RPM;
        let motor_torque_nm = torque_nm.abs() / self.gear_ratio;
        self.interpolate(motor_speed_rpm, motor_torque_nm)
            .with_context(|| format_dbg!((speed_mps, torque_nm)))
    }
}

fn clamp_to_grid(val: f64, grid: &[f64]) -> f64 {
    val.clamp(grid[0], grid[grid.len() - 1])
}

fn in_grid(val: f64, grid: &[f64]) -> bool {
    grid[0] <= val && val <= grid[grid.len() - 1]
}

/// Index of the lower bracketing grid point for `target`, which must lie within the grid.
/// The upper end of the grid maps onto the last interval.
fn find_lower_index(arr: &[f64], target: f64) -> usize {
    let last_interval = arr.len() - 2;
    if target >= arr[arr.len() - 1] {
        return last_interval;
    }

    let mut low = 0;
    let mut high = arr.len() - 1;

    while low < high {
        let mid = low + (high - low) / 2;

        if arr[mid] >= target {
            high = mid;
        } else {
            low = mid + 1;
        }
    }

    if low > 0 && arr[low] >= target {
        (low - 1).min(last_interval)
    } else {
        low.min(last_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_map(extrapolate: Extrapolate) -> EfficiencyMap {
        EfficiencyMap::new(
            vec![0.0, 1_000.0],
            vec![0.0, 100.0],
            vec![vec![0.5, 0.7], vec![0.9, 0.8]],
            1.0,
            extrapolate,
        )
        .unwrap()
    }

    #[test]
    fn test_grid_points() {
        let map = mock_map(Extrapolate::Error);
        assert_eq!(map.interpolate(0.0, 0.0).unwrap(), 0.5);
        assert_eq!(map.interpolate(1_000.0, 100.0).unwrap(), 0.8);
        assert_eq!(map.interpolate(0.0, 100.0).unwrap(), 0.7);
    }

    #[test]
    fn test_linear_offset() {
        let map = mock_map(Extrapolate::Error);
        // c0 = 0.5 * 0.5 + 0.9 * 0.5 = 0.7, c1 = 0.7 * 0.5 + 0.8 * 0.5 = 0.75
        assert!(map.interpolate(500.0, 50.0).unwrap().approx_eq(&0.725, 1e-12));
    }

    #[test]
    fn test_extrapolate_clamp() {
        let map = mock_map(Extrapolate::Clamp);
        assert_eq!(map.interpolate(-10.0, -10.0).unwrap(), 0.5);
        assert_eq!(map.interpolate(5_000.0, 500.0).unwrap(), 0.8);
    }

    #[test]
    fn test_extrapolate_error() {
        let map = mock_map(Extrapolate::Error);
        assert!(map.interpolate(5_000.0, 50.0).is_err());
        assert!(map.interpolate(500.0, -1.0).is_err());
    }

    #[test]
    fn test_regen_uses_torque_magnitude() {
        let map = mock_map(Extrapolate::Clamp);
        let drive = map.efficiency(10.0, 40.0, 0.33).unwrap();
        let regen = map.efficiency(10.0, -40.0, 0.33).unwrap();
        assert_eq!(drive, regen);
    }

    #[test]
    fn test_invalid_maps() {
        // values out of (0, 1]
        assert!(EfficiencyMap::new(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![vec![0.0, 0.5], vec![0.5, 0.5]],
            1.0,
            Extrapolate::Clamp,
        )
        .is_err());
        // shape mismatch
        assert!(EfficiencyMap::new(
            vec![0.0, 1.0],
            vec![0.0, 1.0, 2.0],
            vec![vec![0.5, 0.5], vec![0.5, 0.5]],
            1.0,
            Extrapolate::Clamp,
        )
        .is_err());
        // unsorted grid
        assert!(EfficiencyMap::new(
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![vec![0.5, 0.5], vec![0.5, 0.5]],
            1.0,
            Extrapolate::Clamp,
        )
        .is_err());
        // repeated grid point would give a zero-width interval
        assert!(EfficiencyMap::new(
            vec![0.0, 5_000.0, 5_000.0],
            vec![0.0, 100.0],
            vec![vec![0.8, 0.9], vec![0.85, 0.93], vec![0.85, 0.93]],
            1.0,
            Extrapolate::Clamp,
        )
        .is_err());
        assert!(EfficiencyMap::new(
            vec![0.0, 5_000.0],
            vec![100.0, 100.0],
            vec![vec![0.8, 0.9], vec![0.85, 0.93]],
            1.0,
            Extrapolate::Clamp,
        )
        .is_err());
        assert!(MotorEffModel::Constant(1.2).validate().is_err());
        assert!(MotorEffModel::Constant(0.9).validate().is_ok());
    }

    #[test]
    fn test_find_lower_index() {
        let grid = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_lower_index(&grid, 0.0), 0);
        assert_eq!(find_lower_index(&grid, 0.5), 0);
        assert_eq!(find_lower_index(&grid, 1.0), 0);
        assert_eq!(find_lower_index(&grid, 1.5), 1);
        assert_eq!(find_lower_index(&grid, 3.0), 2);
    }
}
