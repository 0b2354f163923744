//! Shared helpers for the integration suites.

use accrue_core::store::MemoryLedgerStore;
use accrue_core::types::ParticipantId;
use accrue_ledger::testing::Fixture;

/// Deterministic participant ids `p0..pn`.
pub fn participants(n: usize) -> Vec<ParticipantId> {
    (0..n)
        .map(|i| ParticipantId::from_label(&format!("p{i}")))
        .collect()
}

/// Fixture with `ids` each funded with `funds`.
pub fn funded_fixture(ids: &[ParticipantId], funds: u64) -> Fixture {
    let f = Fixture::new();
    for id in ids {
        f.vault.fund(id, funds);
    }
    f
}

/// Sum of every participant's unpaid reward.
pub fn total_unpaid(f: &Fixture, ids: &[ParticipantId]) -> u128 {
    ids.iter()
        .map(|id| f.ledger.unpaid_of(id).unwrap_or(0) as u128)
        .sum()
}

/// Check the global totals against the participant records and the vault.
///
/// Returns a description of the first broken invariant.
pub fn audit(f: &Fixture) -> Result<(), String> {
    let global = f.ledger.stats().map_err(|e| e.to_string())?;
    let (deposited, eligible, holders, realised) = f
        .ledger
        .with_store(|store: &MemoryLedgerStore| {
            let mut deposited = 0u128;
            let mut eligible = 0u128;
            let mut holders = 0u64;
            let mut realised = 0u128;
            for (id, record) in store.iter() {
                let account = &record.account;
                if account.is_excluded && account.eligible_shares != 0 {
                    return Err(format!("{id}: excluded with eligible shares"));
                }
                if !account.is_excluded && account.eligible_shares != account.actual_balance {
                    return Err(format!("{id}: eligible shares diverge from balance"));
                }
                deposited += account.actual_balance as u128;
                eligible += account.eligible_shares as u128;
                holders += u64::from(account.eligible_shares > 0);
                realised += record.rewards.total_realised;
            }
            Ok((deposited, eligible, holders, realised))
        })
        .map_err(|e| e.to_string())??;

    if global.total_deposited != deposited {
        return Err(format!("total_deposited {} != sum {deposited}", global.total_deposited));
    }
    if global.total_eligible != eligible {
        return Err(format!("total_eligible {} != sum {eligible}", global.total_eligible));
    }
    if global.total_participants != holders {
        return Err(format!("total_participants {} != holders {holders}", global.total_participants));
    }
    if global.total_rewards_distributed != realised {
        return Err(format!(
            "total_rewards_distributed {} != realised {realised}",
            global.total_rewards_distributed
        ));
    }
    if global.total_rewards_distributed > global.total_rewards_deposited {
        return Err("distributed more than deposited".into());
    }
    if f.vault.total_paid() != global.total_rewards_distributed {
        return Err(format!(
            "vault paid {} != distributed {}",
            f.vault.total_paid(),
            global.total_rewards_distributed
        ));
    }
    if f.vault.custody() as u128 != global.total_deposited {
        return Err(format!("custody {} != total_deposited {}", f.vault.custody(), global.total_deposited));
    }
    Ok(())
}
