//! Module containing physical constants, unit conversions, and DP sweep parameters.

use crate::imports::*;

/// Unit conversions that should NEVER change
pub const SECS_PER_HOUR: f64 = 3_600.0;
pub const MPH_PER_MPS: f64 = 2.2369;
pub const RAD_PER_S_PER_RPM: f64 = std::f64::consts::PI / 30.0;

/// Default tolerance for matching a next speed against a successor table row
pub const SPEED_MATCH_TOL_MPS: f64 = 1e-3;

/// Struct containing physical properties of the environment the vehicle operates in
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ApproxEq, Validate)]
pub struct PhysicalProperties {
    /// Sea level air density at approximately 20C
    #[validate(range(min = 0))]
    pub air_density_kg_per_m3: f64,
    /// Gravitational acceleration
    #[validate(range(min = 0))]
    pub a_grav_mps2: f64,
}

impl Default for PhysicalProperties {
    fn default() -> Self {
        Self {
            air_density_kg_per_m3: 1.2,
            a_grav_mps2: 9.81,
        }
    }
}

impl SerdeAPI for PhysicalProperties {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        Ok(())
    }
}

/// Bounds and constants of the enclosing DP sweep that a single transition
/// evaluation reads but never modifies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ApproxEq, Validate)]
pub struct DpParams {
    /// Maximum allowed acceleration magnitude
    #[validate(range(min = 0))]
    pub accel_max_mps2: f64,
    /// Next speeds at or above this are rejected
    pub speed_limit_upper_mps: f64,
    /// Next speeds below this are rejected
    pub speed_limit_lower_mps: f64,
    /// Global lower SOC bound
    #[validate(range(min = 0, max = 1))]
    pub soc_min: f64,
    /// Global upper SOC bound
    #[validate(range(min = 0, max = 1))]
    pub soc_max: f64,
    /// Energy added to the last edge of the route when computing its subtotal
    #[serde(default)]
    pub terminal_energy_j: f64,
    /// Tolerance for matching a next speed against the successor table
    #[serde(default = "default_speed_match_tol_mps")]
    #[validate(range(min = 0))]
    pub speed_match_tol_mps: f64,
}

fn default_speed_match_tol_mps() -> f64 {
    SPEED_MATCH_TOL_MPS
}

impl Default for DpParams {
    fn default() -> Self {
        Self {
            accel_max_mps2: 2.5,
            speed_limit_upper_mps: 35.0,
            speed_limit_lower_mps: 0.0,
            soc_min: 0.2,
            soc_max: 0.9,
            terminal_energy_j: 0.0,
            speed_match_tol_mps: SPEED_MATCH_TOL_MPS,
        }
    }
}

impl DpParams {
    /// Width of the admissible SOC band
    pub fn soc_span(&self) -> f64 {
        self.soc_max - self.soc_min
    }
}

impl SerdeAPI for DpParams {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        ensure!(
            self.soc_min <= self.soc_max,
            "{}\n`soc_min` must not exceed `soc_max`",
            format_dbg!((self.soc_min, self.soc_max))
        );
        ensure!(
            self.speed_limit_lower_mps < self.speed_limit_upper_mps,
            "{}\nlower speed limit must be below upper speed limit",
            format_dbg!((self.speed_limit_lower_mps, self.speed_limit_upper_mps))
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationErrors;

    #[test]
    fn test_default_params_are_valid() {
        let mut params = DpParams::default();
        params.init().unwrap();
        assert!(params.soc_span().approx_eq(&0.7, 1e-12));
    }

    #[test]
    fn test_rpm_conversion() {
        assert!((30.0 * RAD_PER_S_PER_RPM).approx_eq(&std::f64::consts::PI, 1e-12));
    }

    #[test]
    fn test_input_validation() {
        let mut params = DpParams {
            soc_min: -0.1, // bad input
            soc_max: 1.5,  // bad input
            ..Default::default()
        };
        let validation_errs = params
            .init()
            .unwrap_err()
            .downcast::<ValidationErrors>()
            .unwrap();
        let bad_fields = ["soc_min", "soc_max"];
        let errs = validation_errs.errors();
        assert!(errs.keys().all(|key| bad_fields.contains(key)));
        assert_eq!(errs.len(), bad_fields.len());
    }

    #[test]
    fn test_inverted_soc_band_rejected() {
        let mut params = DpParams {
            soc_min: 0.8,
            soc_max: 0.3,
            ..Default::default()
        };
        assert!(params.init().is_err());
    }

    #[test]
    fn test_missing_tolerance_uses_default() {
        let params = DpParams::from_yaml(
            "accel_max_mps2: 2.0\nspeed_limit_upper_mps: 30.0\nspeed_limit_lower_mps: 0.0\nsoc_min: 0.2\nsoc_max: 0.9\n",
        )
        .unwrap();
        assert_eq!(params.speed_match_tol_mps, SPEED_MATCH_TOL_MPS);
        assert_eq!(params.terminal_energy_j, 0.0);
    }
}
