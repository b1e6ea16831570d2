//! Read-only views into the DP table owned by the enclosing backward sweep.

use crate::imports::*;

/// One time-step column of the DP table.  NaN marks a cell from which no
/// feasible path to the destination is known.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ApproxEq)]
pub struct DpSlice {
    /// Speed of each row
    pub speed_mps: Vec<f64>,
    /// Minimum energy from each row to the destination
    pub subtotal_energy_j: Vec<f64>,
    /// Minimum SOC over the successor states reachable from each row
    pub soc_min: Vec<f64>,
    /// Maximum SOC over the successor states reachable from each row
    pub soc_max: Vec<f64>,
}

impl DpSlice {
    pub fn new(
        speed_mps: Vec<f64>,
        subtotal_energy_j: Vec<f64>,
        soc_min: Vec<f64>,
        soc_max: Vec<f64>,
    ) -> anyhow::Result<Self> {
        let mut slice = Self {
            speed_mps,
            subtotal_energy_j,
            soc_min,
            soc_max,
        };
        slice.init()?;
        Ok(slice)
    }

    /// Slice with every cell unreached
    pub fn unreached(speed_mps: Vec<f64>) -> Self {
        let n = speed_mps.len();
        Self {
            speed_mps,
            subtotal_energy_j: vec![f64::NAN; n],
            soc_min: vec![f64::NAN; n],
            soc_max: vec![f64::NAN; n],
        }
    }

    pub fn len(&self) -> usize {
        self.speed_mps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speed_mps.is_empty()
    }

    /// Subtotal energy of the first row whose speed is within `tol` of
    /// `speed_mps` and whose subtotal is known
    pub fn subtotal_at_speed(&self, speed_mps: f64, tol: f64) -> Option<f64> {
        self.speed_mps
            .iter()
            .zip(self.subtotal_energy_j.iter())
            .find(|&(&row_speed, &subtotal)| {
                (row_speed - speed_mps).abs() <= tol && subtotal.is_finite()
            })
            .map(|(_, &subtotal)| subtotal)
    }

    /// SOC extrema `(min, max)` of row `idx`
    pub fn soc_band(&self, idx: usize) -> anyhow::Result<(f64, f64)> {
        ensure!(
            idx < self.len(),
            "{}\nspeed index out of range for DP slice",
            format_dbg!((idx, self.len()))
        );
        Ok((self.soc_min[idx], self.soc_max[idx]))
    }
}

impl SerdeAPI for DpSlice {
    fn init(&mut self) -> anyhow::Result<()> {
        utils::check_same_len(&[
            ("speed_mps", self.speed_mps.len()),
            ("subtotal_energy_j", self.subtotal_energy_j.len()),
            ("soc_min", self.soc_min.len()),
            ("soc_max", self.soc_max.len()),
        ])
    }
}

/// Where the enclosing sweep currently is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPosition {
    pub time_step_idx: usize,
    pub n_time_steps: usize,
    /// Row of the current speed in the current slice
    pub cur_speed_idx: usize,
}

impl SweepPosition {
    /// True for the last time-step of the sweep
    pub fn is_final(&self) -> bool {
        self.time_step_idx + 1 == self.n_time_steps
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.time_step_idx < self.n_time_steps,
            "{}\ntime step index out of range",
            format_dbg!((self.time_step_idx, self.n_time_steps))
        );
        Ok(())
    }
}

/// Everything a transition evaluation reads from the DP table
#[derive(Clone, Copy, Debug)]
pub struct StageContext<'a> {
    pub position: SweepPosition,
    /// Slice of the current time-step
    pub current: &'a DpSlice,
    /// Slice of the next time-step; absent only at the final stage
    pub next: Option<&'a DpSlice>,
}

impl<'a> StageContext<'a> {
    pub fn new(
        position: SweepPosition,
        current: &'a DpSlice,
        next: Option<&'a DpSlice>,
    ) -> anyhow::Result<Self> {
        position.validate()?;
        ensure!(
            position.is_final() || next.is_some(),
            "{}\nnon-final stage requires the next time-step's DP slice",
            format_dbg!(position)
        );
        ensure!(
            position.cur_speed_idx < current.len(),
            "{}\ncurrent speed index out of range for current DP slice",
            format_dbg!((position.cur_speed_idx, current.len()))
        );
        Ok(Self {
            position,
            current,
            next,
        })
    }

    /// SOC extrema of the current cell
    pub fn current_soc_band(&self) -> anyhow::Result<(f64, f64)> {
        self.current.soc_band(self.position.cur_speed_idx)
    }

    /// Successor table of a non-final stage
    pub fn successor(&self) -> anyhow::Result<&'a DpSlice> {
        self.next.with_context(|| {
            format!(
                "{}\nno successor DP slice supplied",
                format_dbg!(self.position)
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice() -> DpSlice {
        DpSlice::new(
            vec![10.0, 15.0, 20.0],
            vec![1.0e5, f64::NAN, 3.0e5],
            vec![0.4, f64::NAN, 0.5],
            vec![0.6, f64::NAN, 0.7],
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        assert!(DpSlice::new(vec![1.0, 2.0], vec![0.0], vec![0.0, 0.0], vec![0.0, 0.0]).is_err());
        let yaml = "speed_mps: [1.0, 2.0]\nsubtotal_energy_j: [0.0]\nsoc_min: [0.0, 0.0]\nsoc_max: [0.0, 0.0]\n";
        assert!(DpSlice::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_subtotal_at_speed() {
        let slice = slice();
        assert_eq!(slice.subtotal_at_speed(20.0005, 1e-3), Some(3.0e5));
        assert_eq!(slice.subtotal_at_speed(9.9995, 1e-3), Some(1.0e5));
        assert_eq!(slice.subtotal_at_speed(20.01, 1e-3), None);
        // row exists but is unreached
        assert_eq!(slice.subtotal_at_speed(15.0, 1e-3), None);
    }

    #[test]
    fn test_unreached_slice_from_yaml() {
        let yaml = "speed_mps: [5.0]\nsubtotal_energy_j: [.nan]\nsoc_min: [.nan]\nsoc_max: [.nan]\n";
        let slice = DpSlice::from_yaml(yaml).unwrap();
        assert!(slice.approx_eq(&DpSlice::unreached(vec![5.0]), 1e-12));
        assert_eq!(slice.subtotal_at_speed(5.0, 1e-3), None);
    }

    #[test]
    fn test_sweep_position_is_final() {
        let pos = SweepPosition {
            time_step_idx: 4,
            n_time_steps: 5,
            cur_speed_idx: 0,
        };
        assert!(pos.is_final());
        assert!(!SweepPosition {
            time_step_idx: 3,
            ..pos
        }
        .is_final());
        assert!(SweepPosition {
            time_step_idx: 5,
            ..pos
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_stage_context_requires_successor() {
        let current = slice();
        let pos = SweepPosition {
            time_step_idx: 0,
            n_time_steps: 3,
            cur_speed_idx: 2,
        };
        assert!(StageContext::new(pos, &current, None).is_err());
        let ctx = StageContext::new(pos, &current, Some(&current)).unwrap();
        assert_eq!(ctx.current_soc_band().unwrap(), (0.5, 0.7));
        assert!(ctx.successor().is_ok());

        let bad_idx = SweepPosition {
            cur_speed_idx: 3,
            ..pos
        };
        assert!(StageContext::new(bad_idx, &current, Some(&current)).is_err());

        let last = SweepPosition {
            time_step_idx: 2,
            ..pos
        };
        assert!(StageContext::new(last, &current, None).is_ok());
    }
}
