//! Crate containing the per-transition evaluator of a dynamic-programming
//! energy optimization over the speed profile of a dual-motor (front/rear)
//! electric vehicle.
//!
//! For one DP state and one candidate next speed, [transition::TransitionEvaluator]
//! finds the front/rear torque split with minimum battery power subject to
//! acceleration, torque, traction and state-of-charge limits, and combines it
//! with the successor's subtotal energy to the destination.

#[macro_use]
pub mod macros;

pub mod candidates;
pub mod dp_table;
pub mod edge;
pub mod forces;
pub mod imports;
pub mod motor_eff;
pub mod params;
pub mod prelude;
pub mod scenario;
pub mod traits;
pub mod transition;
pub mod utils;
pub mod vehicle;
