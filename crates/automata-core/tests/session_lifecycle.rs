//! End-to-end tests of session semantics through the service layer.
//!
//! These drive [`SimulationService`] exactly as the transport does and
//! check the properties callers rely on: step composition, determinism
//! across worker counts, failure atomicity, close semantics, and isolation
//! between concurrent sessions.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use automata_core::{CloseOutcome, ServiceConfig, SimulationService};
use automata_types::{
    BoundaryMode, CellAssignment, CellState, CreateRequest, ErrorKind, InitialStateSource,
    RuleSpecification, SessionId, SessionStatus, StepRequest,
};

fn service(threads: usize) -> SimulationService {
    let mut config = ServiceConfig::default();
    config.engine.worker_threads = threads;
    SimulationService::new(config).unwrap()
}

fn random_request(notation: &str, seed: u64) -> CreateRequest {
    CreateRequest {
        dim_x: 16,
        dim_y: 12,
        dim_z: 10,
        boundary_mode: BoundaryMode::Wrapped,
        rule_specification: RuleSpecification::notation(notation),
        initial_state_source: InitialStateSource::Random { density: 0.3, seed },
    }
}

/// A 64x64x64 lattice: thirty generations take long enough to observe the
/// session mid-step.
fn large_request(seed: u64) -> CreateRequest {
    CreateRequest {
        dim_x: 64,
        dim_y: 64,
        dim_z: 64,
        ..random_request("4/4/5/M", seed)
    }
}

async fn wait_until_stepping(svc: &SimulationService, id: SessionId) {
    let session = svc.registry().get(id).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        while session.status() != SessionStatus::Stepping {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
}

fn step(session_id: SessionId, step_count: u64) -> StepRequest {
    StepRequest {
        session_id,
        step_count,
    }
}

#[tokio::test]
async fn single_cell_dies_in_three_cube() {
    let svc = service(2);
    let request = CreateRequest {
        dim_x: 3,
        dim_y: 3,
        dim_z: 3,
        boundary_mode: BoundaryMode::Wrapped,
        rule_specification: RuleSpecification::life_like(&[4, 5], &[5]),
        initial_state_source: InitialStateSource::Cells {
            cells: vec![CellAssignment {
                x: 1,
                y: 1,
                z: 1,
                state: CellState::ALIVE,
            }],
        },
    };
    let id = svc.create_simulation(request).await.unwrap().session_id;

    let response = svc.step_simulation(step(id, 1), true).await.unwrap();
    assert_eq!(response.generation, 1);
    assert_eq!(response.population, 0);

    let state = svc.get_state(id).await.unwrap();
    assert_eq!(state.generation, 1);
    assert!(state.cell_states.iter().all(|c| c.is_dead()));
}

#[tokio::test]
async fn two_single_steps_equal_one_double_step() {
    let svc = service(3);
    let a = svc
        .create_simulation(random_request("4/4/5/M", 7))
        .await
        .unwrap()
        .session_id;
    let b = svc
        .create_simulation(random_request("4/4/5/M", 7))
        .await
        .unwrap()
        .session_id;

    svc.step_simulation(step(a, 1), true).await.unwrap();
    svc.step_simulation(step(a, 1), true).await.unwrap();
    svc.step_simulation(step(b, 2), true).await.unwrap();

    let sa = svc.get_state(a).await.unwrap();
    let sb = svc.get_state(b).await.unwrap();
    assert_eq!(sa.generation, 2);
    assert_eq!(sa.cell_states, sb.cell_states);
}

#[tokio::test]
async fn results_do_not_depend_on_worker_count() {
    let one = service(1);
    let many = service(4);
    let a = one
        .create_simulation(random_request("9-26/5-7,12-13,15/5/M", 99))
        .await
        .unwrap()
        .session_id;
    let b = many
        .create_simulation(random_request("9-26/5-7,12-13,15/5/M", 99))
        .await
        .unwrap()
        .session_id;

    one.step_simulation(step(a, 8), true).await.unwrap();
    many.step_simulation(step(b, 8), true).await.unwrap();

    assert_eq!(
        one.get_state(a).await.unwrap().cell_states,
        many.get_state(b).await.unwrap().cell_states
    );
}

#[tokio::test]
async fn invalid_create_registers_nothing() {
    let svc = service(1);
    let mut request = random_request("4/4/5/M", 1);
    request.dim_x = 0;
    let err = svc.create_simulation(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDimensions);

    let mut request = random_request("4/4/5/M", 1);
    request.rule_specification = RuleSpecification::notation("27/4/2/M");
    let err = svc.create_simulation(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRuleSpecification);

    let mut request = random_request("4/4/5/M", 1);
    request.initial_state_source = InitialStateSource::Random {
        density: 1.5,
        seed: 0,
    };
    let err = svc.create_simulation(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInitialState);

    assert_eq!(svc.registry().len().await, 0);
}

#[tokio::test]
async fn close_semantics() {
    let svc = service(1);
    let err = svc.close_simulation(SessionId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionNotFound);

    let id = svc
        .create_simulation(random_request("S4,5/B5", 3))
        .await
        .unwrap()
        .session_id;
    assert_eq!(svc.close_simulation(id).await.unwrap(), CloseOutcome::Closed);
    assert_eq!(
        svc.close_simulation(id).await.unwrap(),
        CloseOutcome::AlreadyClosed
    );

    for err in [
        svc.get_state(id).await.unwrap_err(),
        svc.step_simulation(step(id, 1), true).await.unwrap_err(),
        svc.session_stats(id).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::SessionNotFound);
    }
}

#[tokio::test]
async fn concurrent_steps_on_one_session_serialize() {
    let svc = Arc::new(service(2));
    let id = svc
        .create_simulation(random_request("4/4/5/M", 5))
        .await
        .unwrap()
        .session_id;

    let first = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.step_simulation(step(id, 3), true).await })
    };
    let second = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.step_simulation(step(id, 4), true).await })
    };
    let mut generations = vec![
        first.await.unwrap().unwrap().generation,
        second.await.unwrap().unwrap().generation,
    ];
    generations.sort_unstable();

    // Whichever ran first ends at 3 or 4; the other always ends at 7.
    assert_eq!(generations.last().copied(), Some(7));
    assert_eq!(svc.get_state(id).await.unwrap().generation, 7);
}

#[tokio::test]
async fn close_waits_for_in_flight_step_on_same_session() {
    let svc = Arc::new(service(2));
    let id = svc
        .create_simulation(large_request(13))
        .await
        .unwrap()
        .session_id;

    let stepping = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.step_simulation(step(id, 30), true).await })
    };
    wait_until_stepping(&svc, id).await;

    assert_eq!(svc.close_simulation(id).await.unwrap(), CloseOutcome::Closed);
    let response = stepping.await.unwrap().unwrap();
    assert_eq!(response.generation, 30);

    assert_eq!(
        svc.get_state(id).await.unwrap_err().kind(),
        ErrorKind::SessionNotFound
    );
}

#[tokio::test]
async fn reads_during_a_step_return_the_previous_generation() {
    let svc = Arc::new(service(2));
    let id = svc
        .create_simulation(large_request(17))
        .await
        .unwrap()
        .session_id;

    let stepping = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.step_simulation(step(id, 30), true).await })
    };
    wait_until_stepping(&svc, id).await;

    // A read that waited for the step would see generation 30.
    let state = tokio::time::timeout(Duration::from_millis(250), svc.get_state(id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.generation, 0);
    let stats = svc.session_stats(id).await.unwrap();
    assert_eq!(stats.generation, 0);

    assert_eq!(stepping.await.unwrap().unwrap().generation, 30);
    assert_eq!(svc.get_state(id).await.unwrap().generation, 30);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let svc = Arc::new(service(4));
    let a = svc
        .create_simulation(random_request("4/4/5/M", 11))
        .await
        .unwrap()
        .session_id;
    let b = svc
        .create_simulation(random_request("4/4/5/M", 11))
        .await
        .unwrap()
        .session_id;
    let before_b = svc.get_state(b).await.unwrap();

    let stepping = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.step_simulation(step(a, 20), true).await })
    };
    svc.close_simulation(b).await.unwrap();
    stepping.await.unwrap().unwrap();

    assert_eq!(svc.get_state(a).await.unwrap().generation, 20);
    assert_eq!(before_b.generation, 0);
    assert!(svc.get_state(b).await.is_err());
}

#[tokio::test]
async fn stats_report_population_and_entropy() {
    let svc = service(1);
    let request = CreateRequest {
        dim_x: 4,
        dim_y: 4,
        dim_z: 4,
        boundary_mode: BoundaryMode::Clamped,
        rule_specification: RuleSpecification::life_like(&[], &[]),
        initial_state_source: InitialStateSource::Cells {
            cells: vec![CellAssignment {
                x: 0,
                y: 0,
                z: 0,
                state: CellState::ALIVE,
            }],
        },
    };
    let id = svc.create_simulation(request).await.unwrap().session_id;
    let stats = svc.session_stats(id).await.unwrap();
    assert_eq!(stats.population, 1);
    assert_eq!(stats.volume, 64);
    assert_eq!(stats.observations, 1);

    // Everything dies, then the empty lattice repeats.
    svc.step_simulation(step(id, 2), true).await.unwrap();
    let stats = svc.session_stats(id).await.unwrap();
    assert_eq!(stats.population, 0);
    assert_eq!(stats.distinct_states, 2);
    assert_eq!(stats.cycle_detected_at, Some(2));
    assert!(stats.entropy_bits > 0.0);
}
