pub use crate::candidates::{ConstraintRecord, RegenMode, TorquePair, TorquePairs};
pub use crate::dp_table::{DpSlice, StageContext, SweepPosition};
pub use crate::edge::{CandidateEdge, Rejection, Slope, SlopeKind, StepSize};
pub use crate::forces::ForceBundle;
pub use crate::motor_eff::{EfficiencyMap, Extrapolate, MotorEffModel, MotorEfficiency};
pub use crate::params::{DpParams, PhysicalProperties};
pub use crate::scenario::{ScenarioResults, TransitionScenario};
pub use crate::traits::{ApproxEq, SerdeAPI};
pub use crate::transition::{best_slot, SlotOutcome, SlotResult, TransitionEvaluator, TransitionOutcome};
pub use crate::vehicle::{Axle, DualMotorVehicle};
