//! End-to-end scheduling scenarios against the public store API.

use std::sync::Arc;

use cadence_cycles::{
    BallotState, CycleData, CycleError, CycleStore, DelayOracle, GovernanceOracle, TenantId,
    Timestamp, Weight,
};

const WEEK: u64 = 604_800;
const THREE_DAYS: u64 = 259_200;
const T: Timestamp = 1_700_000_000;
const E24: u128 = 1_000_000_000_000_000_000_000_000;

fn weekly(weight: Weight) -> CycleData {
    CycleData::new(WEEK, weight, 0)
}

// ── Scenario A: first configuration ─────────────────────────

#[test]
fn scenario_a_first_configuration() {
    let tenant = TenantId(2);
    let mut store = CycleStore::new();
    store
        .configure(tenant, weekly(Weight::Explicit(E24)), 0, 0, T)
        .unwrap();

    let current = store.current_of(tenant, T);
    assert_eq!(current.number, 1);
    assert_eq!(current.start, T);
    assert_eq!(current.duration, WEEK);
    assert_eq!(current.weight, E24);

    let queued = store.queued_of(tenant, T);
    assert_eq!(queued.number, 2);
    assert_eq!(queued.start, T + WEEK);
    assert_eq!(queued.weight, E24);
}

// ── Scenario B: reconfigure mid-cycle two durations ahead ───

#[test]
fn scenario_b_reconfigure_two_durations_ahead() {
    let tenant = TenantId(2);
    let mut store = CycleStore::new();
    store
        .configure(tenant, weekly(Weight::Explicit(E24)), 0, 0, T)
        .unwrap();

    let mid = T + WEEK / 2;
    let c = store
        .configure(tenant, weekly(Weight::Inherit), 0, T + 2 * WEEK, mid)
        .unwrap();
    assert_eq!(c.number, 3);
    assert_eq!(c.start, T + 2 * WEEK);
    assert_eq!(c.based_on, T);

    // The rolled-over first cycle is next until the second cycle is one
    // duration away.
    let queued = store.queued_of(tenant, mid);
    assert_eq!((queued.number, queued.start, queued.configuration), (2, T + WEEK, T));

    let current = store.current_of(tenant, T + WEEK);
    assert_eq!((current.number, current.start, current.configuration), (2, T + WEEK, T));
    let queued = store.queued_of(tenant, T + WEEK);
    assert_eq!((queued.number, queued.configuration), (3, mid));

    let current = store.current_of(tenant, T + 2 * WEEK);
    assert_eq!((current.number, current.configuration), (3, mid));
    let queued = store.queued_of(tenant, T + 2 * WEEK);
    assert_eq!((queued.number, queued.start), (4, T + 3 * WEEK));
}

// ── Scenario C: failed ballot is invisible ──────────────────

#[test]
fn scenario_c_failed_reconfiguration_is_as_if_never_submitted() {
    let tenant = TenantId(5);
    let oracle = Arc::new(DelayOracle::new("three-day-buffer", THREE_DAYS));
    let ballot: Arc<dyn GovernanceOracle> = oracle.clone();
    let first = weekly(Weight::Explicit(E24)).with_ballot(ballot);

    let mut with_proposal = CycleStore::new();
    let mut without = CycleStore::new();
    with_proposal.configure(tenant, first.clone(), 0, 0, T).unwrap();
    without.configure(tenant, first, 0, 0, T).unwrap();

    let proposed_at = T + 1_000;
    let proposal = with_proposal
        .configure(
            tenant,
            CycleData::new(2 * WEEK, Weight::Explicit(E24 / 2), 0),
            0,
            0,
            proposed_at,
        )
        .unwrap();
    assert_eq!((proposal.number, proposal.start), (2, T + WEEK));

    // While undecided the proposal is visible as queued.
    let (latest, state) = with_proposal.latest_configured_of(tenant, T + 2_000);
    assert_eq!(latest.configuration, proposed_at);
    assert_eq!(state, BallotState::Active);
    assert_eq!(with_proposal.queued_of(tenant, T + 2_000).configuration, proposed_at);

    oracle.finalize(tenant, proposed_at, BallotState::Failed).unwrap();
    assert_eq!(
        with_proposal.current_ballot_state_of(tenant, T + 2_000),
        BallotState::Failed
    );

    for now in [T + 2_000, T + WEEK - 1, T + WEEK, T + 3 * WEEK + 17, T + 400 * WEEK] {
        assert_eq!(
            with_proposal.current_of(tenant, now),
            without.current_of(tenant, now),
            "current at {now}"
        );
        assert_eq!(
            with_proposal.queued_of(tenant, now),
            without.queued_of(tenant, now),
            "queued at {now}"
        );
    }
}

#[test]
fn delay_ballot_approves_after_its_window() {
    let tenant = TenantId(5);
    let ballot: Arc<dyn GovernanceOracle> = Arc::new(DelayOracle::new("buffer", THREE_DAYS));
    let mut store = CycleStore::new();
    store
        .configure(tenant, weekly(Weight::Explicit(E24)).with_ballot(ballot), 0, 0, T)
        .unwrap();

    // Proposed too late for the window to close before the next cycle.
    let late = T + WEEK - 10;
    let c = store
        .configure(tenant, weekly(Weight::Explicit(E24 / 4)), 0, 0, late)
        .unwrap();
    assert_eq!((c.number, c.start), (3, T + 2 * WEEK));

    assert_eq!(store.current_ballot_state_of(tenant, late + 1), BallotState::Active);
    assert_eq!(
        store.current_ballot_state_of(tenant, late + THREE_DAYS),
        BallotState::Approved
    );
    assert_eq!(store.current_of(tenant, T + WEEK).configuration, T);
    let current = store.current_of(tenant, T + 2 * WEEK);
    assert_eq!((current.configuration, current.weight), (late, E24 / 4));
}

// ── Scenario D: validation ──────────────────────────────────

#[test]
fn scenario_d_out_of_range_proposals() {
    let tenant = TenantId(1);
    let mut store = CycleStore::new();

    let mut data = weekly(Weight::Inherit);
    data.duration = 1u128 << 64;
    assert!(matches!(
        store.configure(tenant, data, 0, 0, T),
        Err(CycleError::InvalidDuration { .. })
    ));

    let data = CycleData::new(WEEK, Weight::Inherit, cadence_cycles::MAX_DISCOUNT_RATE + 1);
    assert!(matches!(
        store.configure(tenant, data, 0, 0, T),
        Err(CycleError::InvalidDiscountRate { .. })
    ));

    let data = weekly(Weight::Explicit(1u128 << 88));
    assert!(matches!(
        store.configure(tenant, data, 0, 0, T),
        Err(CycleError::InvalidWeight { .. })
    ));

    assert!(store.current_of(tenant, T).is_empty());
}

// ── Properties ──────────────────────────────────────────────

#[test]
fn rollover_lands_on_the_duration_grid() {
    let tenant = TenantId(3);
    let mut store = CycleStore::new();
    let base = store
        .configure(tenant, weekly(Weight::Explicit(E24)), 0, 0, T)
        .unwrap();

    for n in [0u64, 1, 2, 51, 10_000, 1_000_000_000] {
        for r in [0, 1, WEEK / 2, WEEK - 1] {
            let now = T + n * WEEK + r;
            let current = store.current_of(tenant, now);
            assert_eq!(current.number, base.number + n, "n={n} r={r}");
            assert_eq!(current.start, T + n * WEEK, "n={n} r={r}");
            assert_eq!(current.weight, E24, "rollover keeps weight");

            let queued = store.queued_of(tenant, now);
            assert_eq!(queued.number, base.number + n + 1, "n={n} r={r}");
            assert_eq!(queued.start, T + (n + 1) * WEEK, "n={n} r={r}");
        }
    }
}

#[test]
fn numbering_is_monotonic_across_reconfigurations() {
    let tenant = TenantId(4);
    let mut store = CycleStore::new();
    store
        .configure(tenant, CycleData::new(WEEK, Weight::Explicit(E24), 50_000_000), 0, 0, T)
        .unwrap();

    let proposals: [(u64, u64, Timestamp); 6] = [
        // (offset from T, duration, must start at or after)
        (100, WEEK, 0),
        (WEEK + 5, 3 * WEEK, 0),
        (2 * WEEK + 5, 0, T + 10 * WEEK),
        (11 * WEEK, WEEK, 0),
        (11 * WEEK + 1, 2 * WEEK, T + 40 * WEEK),
        (50 * WEEK, 1, 0),
    ];
    for (offset, duration, must) in proposals {
        let now = T + offset;
        store
            .configure(tenant, CycleData::new(duration, Weight::Inherit, 10_000_000), 0, must, now)
            .unwrap();
    }

    let numbers: Vec<u64> = store.history_of(tenant).iter().map(|c| c.number).collect();
    assert!(
        numbers.windows(2).all(|w| w[0] < w[1]),
        "numbers not increasing: {numbers:?}"
    );

    let mut last = 0;
    for step in 0..200 {
        let at = T + step * WEEK / 3;
        let current = store.current_of(tenant, at);
        assert!(current.number >= last, "went backwards at {at}");
        let stored = store.get(tenant, current.configuration);
        assert!(current.number >= stored.number);
        let queued = store.queued_of(tenant, at);
        assert!(queued.is_empty() || queued.number > current.number, "queued behind current at {at}");
        last = current.number;
    }
}

#[test]
fn tenants_are_independent() {
    let mut store = CycleStore::new();
    store
        .configure(TenantId(1), weekly(Weight::Explicit(E24)), 0, 0, T)
        .unwrap();
    store
        .configure(TenantId(2), CycleData::new(0, Weight::Explicit(7), 0), 0, 0, T + 3)
        .unwrap();

    assert_eq!(store.current_of(TenantId(1), T + WEEK).number, 2);
    assert_eq!(store.current_of(TenantId(2), T + WEEK).number, 1);
    assert!(store.queued_of(TenantId(2), T + WEEK).is_empty());
    assert!(store.current_of(TenantId(3), T + WEEK).is_empty());
}
