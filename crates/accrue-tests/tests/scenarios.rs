//! End-to-end ledger scenarios with exact expected balances.

use std::sync::Arc;

use accrue_core::auth::AdminList;
use accrue_core::clock::ManualClock;
use accrue_core::constants::{DEFAULT_TIME_LOCK_SECS, SECONDS_PER_DAY};
use accrue_core::error::LedgerError;
use accrue_core::events::LedgerEvent;
use accrue_core::types::ParticipantId;
use accrue_ledger::testing::{Fixture, T0, Vault};
use accrue_node::{LedgerConfig, LedgerNode};
use accrue_tests::helpers::audit;

#[test]
fn single_holder_then_second_joins() {
    let f = Fixture::new();
    let a = f.participant("a", 10_000);
    let b = f.participant("b", 10_000);

    f.ledger.lock(&a, 100).unwrap();
    f.distributor.deposit_rewards(&f.admin, 1_000).unwrap();
    assert_eq!(f.ledger.unpaid_of(&a).unwrap(), 1_000);

    assert_eq!(f.distributor.claim(&a).unwrap(), 1_000);
    assert_eq!(f.vault.paid(&a), 1_000);
    assert_eq!(f.ledger.unpaid_of(&a).unwrap(), 0);

    f.ledger.lock(&a, 50).unwrap();
    assert_eq!(f.ledger.unpaid_of(&a).unwrap(), 0);

    f.ledger.lock(&b, 50).unwrap();
    f.distributor.deposit_rewards(&f.admin, 500).unwrap();
    // 150 of 200 eligible shares against 50 of 200.
    assert_eq!(f.ledger.unpaid_of(&a).unwrap(), 375);
    assert_eq!(f.ledger.unpaid_of(&b).unwrap(), 125);
    assert_eq!(audit(&f), Ok(()));
}

#[test]
fn one_third_split_leaves_dust() {
    let f = Fixture::new();
    let a = f.participant("a", 1_000);
    let b = f.participant("b", 1_000);
    f.ledger.lock(&a, 100).unwrap();
    f.ledger.lock(&b, 50).unwrap();

    f.distributor.deposit_rewards(&f.admin, 500).unwrap();
    assert_eq!(f.distributor.claim(&a).unwrap(), 333);
    assert_eq!(f.distributor.claim(&b).unwrap(), 166);

    let stats = f.ledger.stats().unwrap();
    assert_eq!(stats.total_rewards_distributed, 499);
    assert_eq!(stats.undistributed(), 1);
}

#[test]
fn excluded_holder_earns_nothing_but_may_leave() {
    let f = Fixture::new();
    let a = f.participant("a", 1_000);
    let treasury = f.participant("treasury", 1_000);
    f.ledger.set_exclusion(&f.admin, &treasury, true).unwrap();
    f.ledger.lock(&treasury, 900).unwrap();
    f.ledger.lock(&a, 100).unwrap();

    f.distributor.deposit_rewards(&f.admin, 1_000).unwrap();
    assert_eq!(f.distributor.pending(&a).unwrap(), 1_000);
    assert_eq!(f.distributor.pending(&treasury).unwrap(), 0);

    // Excluded holders skip the time lock.
    assert_eq!(f.ledger.unlock(&treasury, 0).unwrap(), 900);
    assert_eq!(
        f.ledger.unlock(&a, 0),
        Err(LedgerError::TimeLockActive {
            unlock_at: T0 + DEFAULT_TIME_LOCK_SECS,
            now: T0,
        })
    );
    assert_eq!(audit(&f), Ok(()));
}

#[test]
fn time_lock_of_four_hundred_days_rejected() {
    let f = Fixture::new();
    assert!(matches!(
        f.ledger.set_time_lock(&f.admin, 400 * SECONDS_PER_DAY),
        Err(LedgerError::DurationTooLong { .. })
    ));
    assert_eq!(f.ledger.stats().unwrap().time_lock_secs, DEFAULT_TIME_LOCK_SECS);
}

#[test]
fn full_lifecycle_event_trail() {
    let f = Fixture::new();
    let a = f.participant("a", 100);
    f.ledger.lock(&a, 100).unwrap();
    f.distributor.deposit_rewards(&f.admin, 10).unwrap();
    f.clock.advance(DEFAULT_TIME_LOCK_SECS);
    f.ledger.unlock(&a, 0).unwrap();

    assert_eq!(
        f.events.snapshot(),
        vec![
            LedgerEvent::Locked { participant: a, amount: 100, locked_at: T0 },
            LedgerEvent::RewardsDeposited {
                depositor: f.admin,
                amount: 10,
                accumulator_per_share: 10u128.pow(17),
            },
            LedgerEvent::RewardDistributed { participant: a, amount: 10 },
            LedgerEvent::Unlocked { participant: a, amount: 100 },
        ]
    );
    assert_eq!(f.vault.wallet(&a), 100);
    assert_eq!(f.vault.paid(&a), 10);
}

#[test]
fn rocks_backed_ledger_matches_memory_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Arc::new(Vault::new());
    let admin = ParticipantId::from_label("admin");
    let config = LedgerConfig {
        data_dir: dir.path().to_path_buf(),
        ..LedgerConfig::default()
    };
    let node = LedgerNode::open_with_clock(
        config,
        vault.clone(),
        vault.clone(),
        Arc::new(AdminList::new([admin])),
        Arc::new(ManualClock::new(T0)),
    )
    .unwrap();

    let f = Fixture::new();
    let ids: Vec<_> = ["a", "b", "c"].iter().map(|l| f.participant(l, 10_000)).collect();
    for id in &ids {
        vault.fund(id, 10_000);
    }

    for (i, id) in ids.iter().enumerate() {
        let stake = 100 * (i as u64 + 1);
        f.ledger.lock(id, stake).unwrap();
        node.ledger().lock(id, stake).unwrap();
    }
    for amount in [7, 1_000, 333] {
        f.distributor.deposit_rewards(&f.admin, amount).unwrap();
        node.distributor().deposit_rewards(&admin, amount).unwrap();
    }
    f.ledger.set_exclusion(&f.admin, &ids[1], true).unwrap();
    node.ledger().set_exclusion(&admin, &ids[1], true).unwrap();

    assert_eq!(f.ledger.stats().unwrap(), node.ledger().stats().unwrap());
    for id in &ids {
        assert_eq!(
            f.distributor.pending(id).unwrap(),
            node.distributor().pending(id).unwrap()
        );
        assert_eq!(f.ledger.account(id).unwrap(), node.ledger().account(id).unwrap());
        assert_eq!(f.ledger.reward_state(id).unwrap(), node.ledger().reward_state(id).unwrap());
    }
}
