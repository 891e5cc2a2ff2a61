//! Randomized invariants of full runs on synthetic networks.

use proptest::prelude::*;
use shadowban_core::{DynamicsState, SimParams};
use shadowban_env::{ObjectiveMode, OpinionEnv, SimError};
use shadowban_sim::{ScenarioId, SimulationDriver};

fn objective() -> impl Strategy<Value = ObjectiveMode> {
    prop_oneof![
        Just(ObjectiveMode::Mean),
        Just(ObjectiveMode::VarMax),
        Just(ObjectiveMode::VarMin),
    ]
}

fn scenario() -> impl Strategy<Value = ScenarioId> {
    prop_oneof![
        Just(ScenarioId::Ring),
        Just(ScenarioId::ErdosRenyi),
        Just(ScenarioId::Polarized),
    ]
}

fn dynamics(
    scenario: ScenarioId,
    seed: u64,
    vertices: usize,
    params: SimParams,
) -> Result<DynamicsState, SimError> {
    let net = scenario.build(seed, vertices)?;
    DynamicsState::new(net.graph()?, net.initial_opinions()?, params)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_opinions_stay_in_unit_interval(
        scenario in scenario(),
        seed in any::<u64>(),
        vertices in 4usize..16,
        tau in 0.0f64..1.0,
        omega in 0.0f64..4.0,
        objective in objective(),
        sedge in 0.0f64..1.0,
        experiment in any::<bool>(),
    ) {
        let params = SimParams::default()
            .with_kernel(tau, omega)
            .with_steps(3, 4)
            .with_objective(objective)
            .with_suppression(sedge / 2.0, sedge)
            .with_experiment(experiment);
        let mut state = dynamics(scenario, seed, vertices, params).unwrap();
        let trajectory = SimulationDriver::new().run(&mut state).unwrap();

        prop_assert!(trajectory.opinions.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn test_controls_respect_budget(
        scenario in scenario(),
        seed in any::<u64>(),
        vertices in 4usize..16,
        objective in objective(),
        smax_share in 0.0f64..=1.0,
        sedge in 0.0f64..=1.0,
    ) {
        // any smax <= sedge is feasible
        let smax = sedge * smax_share;
        let params = SimParams::default()
            .with_steps(3, 2)
            .with_objective(objective)
            .with_suppression(smax, sedge);
        let mut state = dynamics(scenario, seed, vertices, params).unwrap();
        let ne = state.num_edges() as f64;
        let trajectory = SimulationDriver::new().run(&mut state).unwrap();

        for row in trajectory.controls.row_iter() {
            prop_assert!(row.iter().all(|&u| u >= 1.0 - sedge - 1e-12 && u <= 1.0));
            prop_assert!(row.sum() <= ne * (1.0 - smax) + 1e-9 * ne.max(1.0));
        }
    }

    #[test]
    fn test_no_ban_gives_unit_controls(
        scenario in scenario(),
        seed in any::<u64>(),
        vertices in 4usize..12,
        smax in 0.0f64..=1.0,
    ) {
        let params = SimParams::default()
            .with_steps(2, 3)
            .with_suppression(smax, 0.0)
            .with_shadowban(false);
        let mut state = dynamics(scenario, seed, vertices, params).unwrap();
        let trajectory = SimulationDriver::new().run(&mut state).unwrap();

        prop_assert!(trajectory.controls.iter().all(|&u| u == 1.0));
    }

    #[test]
    fn test_runs_repeat_exactly(
        scenario in scenario(),
        seed in any::<u64>(),
        sedge in 0.0f64..=1.0,
    ) {
        let params = SimParams::default()
            .with_steps(2, 3)
            .with_objective(ObjectiveMode::VarMin)
            .with_suppression(sedge / 3.0, sedge);
        let driver = SimulationDriver::new();

        let a = driver.run(&mut dynamics(scenario, seed, 10, params.clone()).unwrap()).unwrap();
        let b = driver.run(&mut dynamics(scenario, seed, 10, params).unwrap()).unwrap();
        prop_assert_eq!(a, b);
    }
}
