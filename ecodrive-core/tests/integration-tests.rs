use ecodrive_core::prelude::*;
use ecodrive_core::vehicle::DualMotorVehicle;

const CRUISE_FINAL_STAGE: &str = include_str!("assets/cruise_final_stage.yaml");
const UPHILL_MID_SWEEP: &str = include_str!("assets/uphill_mid_sweep.yaml");

#[test]
fn test_cruise_final_stage() {
    let scenario = TransitionScenario::from_yaml(CRUISE_FINAL_STAGE).unwrap();
    assert_eq!(scenario.vehicle, {
        let mut veh = DualMotorVehicle::mock_vehicle();
        veh.scenario_name = "mid-size dual-motor sedan".into();
        veh
    });
    let outcomes = scenario.evaluate().unwrap();
    assert_eq!(outcomes.len(), scenario.target_speeds_mps.len());

    assert_eq!(outcomes[0].outcome.rejection(), Some(Rejection::AccelLimit));
    assert_eq!(outcomes[4].outcome.rejection(), Some(Rejection::AccelLimit));

    let decel = outcomes[1].outcome.feasible().unwrap();
    assert_eq!(decel.regen_mode, RegenMode::Rear);
    assert!(decel.pwr_w < 0.0);
    assert_eq!(decel.subtotal_energy_j, Some(decel.energy_j + 5.0e4));

    let veh = &scenario.vehicle;
    let cruise = outcomes[2].outcome.feasible().unwrap();
    let rear_torque_nm = veh.drag_force_coef() * 400.0 * veh.wheel_radius_m;
    assert!(cruise.rear_torque_nm.approx_eq(&rear_torque_nm, 1e-9));
    assert!(cruise.energy_j.approx_eq(&(cruise.pwr_w * cruise.dt_s), 1e-12));
    assert_eq!(cruise.subtotal_energy_j, Some(cruise.energy_j + 5.0e4));

    let accel = outcomes[3].outcome.feasible().unwrap();
    assert_eq!(accel.regen_mode, RegenMode::Neither);
    assert!(accel.pwr_w > cruise.pwr_w);
    for outcome in &outcomes[1..4] {
        assert_eq!(outcome.constraints.soc, vec![0]);
    }
}

#[test]
fn test_uphill_mid_sweep() {
    let scenario = TransitionScenario::from_yaml(UPHILL_MID_SWEEP).unwrap();
    let res = scenario.solve().unwrap();
    let outcomes = &res.outcomes;
    assert_eq!(outcomes.len(), 6);

    // 15 -> 30 m/s over 50 m
    assert_eq!(outcomes[5].outcome.rejection(), Some(Rejection::AccelLimit));

    let hold = outcomes[2].outcome.feasible().unwrap();
    assert!(hold.dt_s.approx_eq(&(50.0 / 15.0), 1e-12));
    assert!(hold.pwr_w > 0.0, "holding speed uphill draws power");
    assert_eq!(hold.subtotal_energy_j, Some(hold.energy_j + 1.7e6));

    // successor row exists but is unreached
    let to_18 = outcomes[4].outcome.feasible().unwrap();
    assert_eq!(to_18.subtotal_energy_j, None);

    let best = res.best.unwrap();
    assert!(best.slot_idx < 4);
    let best_subtotal = best.result.subtotal_energy_j.unwrap();
    for outcome in outcomes {
        if let Some(subtotal) = outcome
            .outcome
            .feasible()
            .and_then(|r| r.subtotal_energy_j)
        {
            assert!(best_subtotal <= subtotal);
        }
    }

    // each constraint stage only narrows the previous one
    for outcome in outcomes.iter().filter(|o| o.outcome.feasible().is_some()) {
        let rec = &outcome.constraints;
        assert!(rec.torque_range.len() <= 31);
        assert!(rec.rear_traction.iter().all(|i| rec.torque_range.contains(i)));
        assert!(rec.front_traction.iter().all(|i| rec.rear_traction.contains(i)));
        assert!(rec.soc.iter().all(|i| rec.front_traction.contains(i)));
        assert!(!rec.soc.is_empty());
    }
}

#[test]
fn test_scenario_file_round_trip() {
    let scenario = TransitionScenario::from_yaml(UPHILL_MID_SWEEP).unwrap();
    let dir = tempfile::tempdir().unwrap();
    for ext in ["yaml", "json"] {
        let path = dir.path().join(format!("scenario.{ext}"));
        let mut scenario = scenario.clone();
        if ext == "json" {
            // JSON has no NaN literal
            scenario.current_slice = DpSlice::new(
                vec![15.0],
                vec![0.0],
                vec![0.6],
                vec![0.72],
            )
            .unwrap();
            scenario.position.cur_speed_idx = 0;
            scenario.next_slice = Some(
                DpSlice::new(vec![15.0], vec![1.7e6], vec![0.5], vec![0.7]).unwrap(),
            );
        }
        scenario.to_file(&path).unwrap();
        let scenario_rt = TransitionScenario::from_file(&path).unwrap();
        assert_eq!(scenario_rt.vehicle, scenario.vehicle);
        assert_eq!(scenario_rt.step, scenario.step);
        assert_eq!(scenario_rt.slope, scenario.slope);
        assert_eq!(scenario_rt.target_speeds_mps, scenario.target_speeds_mps);
    }
}

#[test]
fn test_invalid_vehicle_rejected() {
    let bad = CRUISE_FINAL_STAGE.replace("drive_eff_rear: 0.95", "drive_eff_rear: 1.95");
    let err = TransitionScenario::from_yaml(bad).unwrap_err();
    assert!(err.downcast_ref::<validator::ValidationErrors>().is_some());
}
