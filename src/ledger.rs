//! Vault lifecycle and pool accounting.
//!
//! Every transition takes the current records by reference, checks all of
//! its preconditions in order, and only then builds the updated records. A
//! rejected call returns the first failing precondition and leaves the
//! inputs untouched; the processor persists the returned records before it
//! moves any tokens.

use borsh::BorshDeserialize;
use solana_program::pubkey::Pubkey;

use crate::{
    error::VaultError,
    reward::{calculate_reward_rate, calculate_rewards, BASIS_POINTS},
    state::{
        LedgerState, OwnerVaultIndex, VaultRecord, EMERGENCY_PENALTY_BPS, MAX_LOCK_DURATION,
        MIN_LOCK_DURATION,
    },
};

/// Records produced by a successful vault creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultOpened {
    pub ledger: LedgerState,
    pub index: OwnerVaultIndex,
    pub vault: VaultRecord,
}

/// Records and token movements produced by a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultClaimed {
    pub ledger: LedgerState,
    pub vault: VaultRecord,
    /// Principal returned to the owner
    pub amount: u64,
    /// Yield paid out of the reward pool
    pub reward: u64,
}

/// Records and token movements produced by an emergency withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultWithdrawn {
    pub ledger: LedgerState,
    pub vault: VaultRecord,
    /// Principal returned to the owner after the penalty
    pub payout: u64,
    /// Principal forfeited into the reward pool
    pub penalty: u64,
}

/// Lock `amount` for `duration` ticks starting at `now`.
pub fn open_vault(
    ledger: &LedgerState,
    index: &OwnerVaultIndex,
    owner: &Pubkey,
    amount: u64,
    duration: u64,
    now: u64,
    vault_bump: u8,
) -> Result<VaultOpened, VaultError> {
    if ledger.paused {
        return Err(VaultError::ContractPaused);
    }
    if amount == 0 {
        return Err(VaultError::InvalidAmount);
    }
    if !(MIN_LOCK_DURATION..=MAX_LOCK_DURATION).contains(&duration) {
        return Err(VaultError::InvalidDuration);
    }
    if index.owner != *owner {
        return Err(VaultError::InvalidInput);
    }
    if index.is_full() {
        return Err(VaultError::VaultLimitReached);
    }

    let vault_id = ledger
        .next_vault_id()
        .ok_or(VaultError::ArithmeticOverflow)?;
    let lock_end = now
        .checked_add(duration)
        .ok_or(VaultError::ArithmeticOverflow)?;
    let total_locked = ledger
        .total_locked
        .checked_add(amount)
        .ok_or(VaultError::ArithmeticOverflow)?;

    let vault = VaultRecord {
        owner: *owner,
        vault_id,
        position: index.next_position(),
        amount,
        lock_start: now,
        lock_end,
        reward_rate: calculate_reward_rate(duration),
        claimed: false,
        emergency_withdrawn: false,
        bump: vault_bump,
    };

    let mut index = index.clone();
    index
        .push(vault_id)
        .map_err(|_| VaultError::VaultLimitReached)?;

    let ledger = LedgerState {
        total_locked,
        vault_nonce: vault_id,
        ..ledger.clone()
    };

    Ok(VaultOpened {
        ledger,
        index,
        vault,
    })
}

/// Settle a matured vault: principal back to the owner plus its reward.
pub fn claim_vault(
    ledger: &LedgerState,
    vault: &VaultRecord,
    caller: &Pubkey,
    now: u64,
) -> Result<VaultClaimed, VaultError> {
    if vault.owner != *caller {
        return Err(VaultError::VaultNotFound);
    }
    if !vault.is_matured(now) {
        return Err(VaultError::VaultLocked);
    }
    if vault.is_settled() {
        return Err(VaultError::AlreadyClaimed);
    }

    let reward = calculate_rewards(vault.amount, vault.duration());
    if ledger.reward_pool < reward {
        return Err(VaultError::InsufficientRewards);
    }

    let total_locked = ledger
        .total_locked
        .checked_sub(vault.amount)
        .ok_or(VaultError::ArithmeticOverflow)?;
    let total_rewards_distributed = ledger
        .total_rewards_distributed
        .checked_add(reward)
        .ok_or(VaultError::ArithmeticOverflow)?;

    Ok(VaultClaimed {
        ledger: LedgerState {
            total_locked,
            reward_pool: ledger.reward_pool - reward,
            total_rewards_distributed,
            ..ledger.clone()
        },
        vault: VaultRecord {
            claimed: true,
            ..vault.clone()
        },
        amount: vault.amount,
        reward,
    })
}

/// Exit a vault at any time, forfeiting [`EMERGENCY_PENALTY_BPS`] of the
/// principal to the reward pool. Maturity is not checked.
pub fn emergency_withdraw(
    ledger: &LedgerState,
    vault: &VaultRecord,
    caller: &Pubkey,
) -> Result<VaultWithdrawn, VaultError> {
    if vault.owner != *caller {
        return Err(VaultError::VaultNotFound);
    }
    if vault.is_settled() {
        return Err(VaultError::AlreadyClaimed);
    }

    let penalty = emergency_penalty(vault.amount);
    let payout = vault.amount - penalty;

    let total_locked = ledger
        .total_locked
        .checked_sub(vault.amount)
        .ok_or(VaultError::ArithmeticOverflow)?;
    let reward_pool = ledger
        .reward_pool
        .checked_add(penalty)
        .ok_or(VaultError::ArithmeticOverflow)?;

    Ok(VaultWithdrawn {
        ledger: LedgerState {
            total_locked,
            reward_pool,
            ..ledger.clone()
        },
        vault: VaultRecord {
            emergency_withdrawn: true,
            ..vault.clone()
        },
        payout,
        penalty,
    })
}

/// Penalty charged on an emergency exit of `amount`
pub fn emergency_penalty(amount: u64) -> u64 {
    // amount * 1000 / 10000 never exceeds amount, so the narrowing is lossless
    ((amount as u128) * (EMERGENCY_PENALTY_BPS as u128) / (BASIS_POINTS as u128)) as u64
}

pub fn add_rewards(
    ledger: &LedgerState,
    caller: &Pubkey,
    amount: u64,
) -> Result<LedgerState, VaultError> {
    if !ledger.is_admin(caller) {
        return Err(VaultError::OwnerOnly);
    }
    if amount == 0 {
        return Err(VaultError::InvalidAmount);
    }

    let reward_pool = ledger
        .reward_pool
        .checked_add(amount)
        .ok_or(VaultError::ArithmeticOverflow)?;

    Ok(LedgerState {
        reward_pool,
        ..ledger.clone()
    })
}

/// Set the pause flag. Only vault creation honors it.
pub fn set_paused(
    ledger: &LedgerState,
    caller: &Pubkey,
    paused: bool,
) -> Result<LedgerState, VaultError> {
    if !ledger.is_admin(caller) {
        return Err(VaultError::OwnerOnly);
    }

    Ok(LedgerState {
        paused,
        ..ledger.clone()
    })
}

/// Sweep `amount` out of the reward pool. The pool must stay strictly
/// positive, so `amount == reward_pool` is refused.
pub fn withdraw_excess_rewards(
    ledger: &LedgerState,
    caller: &Pubkey,
    amount: u64,
) -> Result<LedgerState, VaultError> {
    if !ledger.is_admin(caller) {
        return Err(VaultError::OwnerOnly);
    }
    if amount == 0 {
        return Err(VaultError::InvalidAmount);
    }
    if ledger.reward_pool <= amount {
        return Err(VaultError::InsufficientRewards);
    }

    Ok(LedgerState {
        reward_pool: ledger.reward_pool - amount,
        ..ledger.clone()
    })
}

/// Look up a vault record from raw account data.
/// Missing, empty or foreign data yields `None`.
pub fn get_vault(account_data: Option<&[u8]>) -> Option<VaultRecord> {
    let data = account_data?;
    if data.len() != VaultRecord::SIZE {
        return None;
    }
    VaultRecord::try_from_slice(data).ok()
}

/// Vault ids recorded for an owner; empty when the index does not exist.
pub fn get_user_vaults(account_data: Option<&[u8]>) -> Vec<u64> {
    account_data
        .filter(|data| data.len() == OwnerVaultIndex::SIZE)
        .and_then(|mut data| OwnerVaultIndex::deserialize(&mut data).ok())
        .map(|index| index.vault_ids)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::BLOCKS_PER_MONTH;
    use crate::state::MAX_VAULTS_PER_OWNER;
    use borsh::BorshSerialize;

    struct Fixture {
        admin: Pubkey,
        user: Pubkey,
        ledger: LedgerState,
        index: OwnerVaultIndex,
    }

    fn fixture() -> Fixture {
        let admin = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        Fixture {
            admin,
            user,
            ledger: LedgerState::new(admin, Pubkey::new_unique(), Pubkey::new_unique(), 255),
            index: OwnerVaultIndex::new(user, 254),
        }
    }

    fn open(f: &mut Fixture, amount: u64, duration: u64, now: u64) -> VaultRecord {
        let opened = open_vault(&f.ledger, &f.index, &f.user, amount, duration, now, 253).unwrap();
        f.ledger = opened.ledger;
        f.index = opened.index;
        opened.vault
    }

    #[test]
    fn test_open_vault_records_fresh_open_vault() {
        let mut f = fixture();
        let vault = open(&mut f, 1_000_000_000, 4320, 100);

        assert_eq!(vault.vault_id, 1);
        assert_eq!(vault.position, 0);
        assert_eq!(vault.reward_rate, 550);
        assert_eq!(vault.lock_start, 100);
        assert_eq!(vault.lock_end, 100 + 4320);
        assert!(!vault.claimed);
        assert!(!vault.emergency_withdrawn);
        assert_eq!(f.ledger.total_locked, 1_000_000_000);
        assert_eq!(f.ledger.vault_nonce, 1);
        assert_eq!(f.index.vault_ids, vec![1]);
    }

    #[test]
    fn test_open_vault_precondition_order() {
        let mut f = fixture();
        f.ledger.paused = true;
        // paused wins over the zero amount and the bad duration
        assert_eq!(
            open_vault(&f.ledger, &f.index, &f.user, 0, 1, 0, 0),
            Err(VaultError::ContractPaused)
        );

        f.ledger.paused = false;
        assert_eq!(
            open_vault(&f.ledger, &f.index, &f.user, 0, 1, 0, 0),
            Err(VaultError::InvalidAmount)
        );
        assert_eq!(
            open_vault(&f.ledger, &f.index, &f.user, 10, MIN_LOCK_DURATION - 1, 0, 0),
            Err(VaultError::InvalidDuration)
        );
        assert_eq!(
            open_vault(&f.ledger, &f.index, &f.user, 10, MAX_LOCK_DURATION + 1, 0, 0),
            Err(VaultError::InvalidDuration)
        );
        assert!(open_vault(&f.ledger, &f.index, &f.user, 10, MIN_LOCK_DURATION, 0, 0).is_ok());
        assert!(open_vault(&f.ledger, &f.index, &f.user, 10, MAX_LOCK_DURATION, 0, 0).is_ok());
    }

    #[test]
    fn test_open_vault_rejects_full_index() {
        let mut f = fixture();
        for _ in 0..MAX_VAULTS_PER_OWNER {
            open(&mut f, 5, MIN_LOCK_DURATION, 0);
        }
        let before = f.ledger.clone();
        assert_eq!(
            open_vault(&f.ledger, &f.index, &f.user, 5, MIN_LOCK_DURATION, 0, 0),
            Err(VaultError::VaultLimitReached)
        );
        assert_eq!(f.ledger, before);
        assert_eq!(f.index.vault_ids.len(), MAX_VAULTS_PER_OWNER);
    }

    #[test]
    fn test_vault_ids_are_never_reused() {
        let mut f = fixture();
        let first = open(&mut f, 50, MIN_LOCK_DURATION, 0);
        f.ledger = emergency_withdraw(&f.ledger, &first, &f.user).unwrap().ledger;
        let second = open(&mut f, 50, MIN_LOCK_DURATION, 0);
        assert_eq!(second.vault_id, 2);
        assert_eq!(f.index.vault_ids, vec![1, 2]);
    }

    #[test]
    fn test_claim_before_maturity_is_locked() {
        let mut f = fixture();
        let vault = open(&mut f, 1_000, BLOCKS_PER_MONTH, 10);
        assert_eq!(
            claim_vault(&f.ledger, &vault, &f.user, vault.lock_end - 1),
            Err(VaultError::VaultLocked)
        );
    }

    #[test]
    fn test_claim_pays_principal_and_reward() {
        let mut f = fixture();
        f.ledger = add_rewards(&f.ledger, &f.admin, 1_000_000_000).unwrap();
        let vault = open(&mut f, 1_000_000_000, 4320, 0);

        let claimed = claim_vault(&f.ledger, &vault, &f.user, vault.lock_end).unwrap();
        assert_eq!(claimed.amount, 1_000_000_000);
        assert_eq!(claimed.reward, 4_520_547);
        assert!(claimed.vault.claimed);
        assert_eq!(claimed.ledger.total_locked, 0);
        assert_eq!(claimed.ledger.reward_pool, 1_000_000_000 - 4_520_547);
        assert_eq!(claimed.ledger.total_rewards_distributed, 4_520_547);
    }

    #[test]
    fn test_claim_requires_funded_pool() {
        let mut f = fixture();
        let vault = open(&mut f, 1_000_000, 4320, 0);
        assert_eq!(
            claim_vault(&f.ledger, &vault, &f.user, vault.lock_end),
            Err(VaultError::InsufficientRewards)
        );
    }

    #[test]
    fn test_claim_of_foreign_vault_is_not_found() {
        let mut f = fixture();
        let vault = open(&mut f, 1_000, 4320, 0);
        let stranger = Pubkey::new_unique();
        assert_eq!(
            claim_vault(&f.ledger, &vault, &stranger, vault.lock_end),
            Err(VaultError::VaultNotFound)
        );
        assert_eq!(
            emergency_withdraw(&f.ledger, &vault, &stranger),
            Err(VaultError::VaultNotFound)
        );
    }

    #[test]
    fn test_settlement_happens_once() {
        let mut f = fixture();
        f.ledger = add_rewards(&f.ledger, &f.admin, 1_000_000).unwrap();

        let a = open(&mut f, 10_000, 4320, 0);
        let claimed = claim_vault(&f.ledger, &a, &f.user, a.lock_end).unwrap();
        f.ledger = claimed.ledger;
        assert_eq!(
            claim_vault(&f.ledger, &claimed.vault, &f.user, a.lock_end),
            Err(VaultError::AlreadyClaimed)
        );
        assert_eq!(
            emergency_withdraw(&f.ledger, &claimed.vault, &f.user),
            Err(VaultError::AlreadyClaimed)
        );

        let b = open(&mut f, 10_000, 4320, 0);
        let withdrawn = emergency_withdraw(&f.ledger, &b, &f.user).unwrap();
        f.ledger = withdrawn.ledger;
        assert_eq!(
            emergency_withdraw(&f.ledger, &withdrawn.vault, &f.user),
            Err(VaultError::AlreadyClaimed)
        );
        assert_eq!(
            claim_vault(&f.ledger, &withdrawn.vault, &f.user, b.lock_end),
            Err(VaultError::AlreadyClaimed)
        );
        // maturity is checked ahead of the settlement flags
        assert_eq!(
            claim_vault(&f.ledger, &withdrawn.vault, &f.user, b.lock_end - 1),
            Err(VaultError::VaultLocked)
        );
    }

    #[test]
    fn test_emergency_withdraw_splits_principal() {
        let mut f = fixture();
        let vault = open(&mut f, 1_000, 4320, 0);
        let withdrawn = emergency_withdraw(&f.ledger, &vault, &f.user).unwrap();

        assert_eq!(withdrawn.payout, 900);
        assert_eq!(withdrawn.penalty, 100);
        assert_eq!(withdrawn.ledger.reward_pool, 100);
        assert_eq!(withdrawn.ledger.total_locked, 0);
        assert!(withdrawn.vault.emergency_withdrawn);
        assert!(!withdrawn.vault.claimed);
    }

    #[test]
    fn test_emergency_payout_plus_penalty_is_principal() {
        for amount in [1u64, 9, 10, 11, 999, 1_000_001, u64::MAX] {
            let penalty = emergency_penalty(amount);
            assert_eq!(penalty, amount / 10);
            assert_eq!(amount - penalty + penalty, amount);
        }
    }

    #[test]
    fn test_emergency_withdraw_after_maturity_is_allowed() {
        let mut f = fixture();
        let vault = open(&mut f, 2_000, 4320, 0);
        assert!(vault.is_matured(vault.lock_end + 10));
        let withdrawn = emergency_withdraw(&f.ledger, &vault, &f.user).unwrap();
        assert_eq!(withdrawn.payout, 1_800);
    }

    #[test]
    fn test_total_locked_tracks_open_vaults() {
        let mut f = fixture();
        f.ledger = add_rewards(&f.ledger, &f.admin, 10_000_000).unwrap();
        let a = open(&mut f, 100, 4320, 0);
        let b = open(&mut f, 250, 4320, 0);
        let c = open(&mut f, 4_000, 8640, 0);
        assert_eq!(f.ledger.total_locked(), 4_350);
        assert_eq!([a.position, b.position, c.position], [0, 1, 2]);

        f.ledger = claim_vault(&f.ledger, &a, &f.user, a.lock_end).unwrap().ledger;
        assert_eq!(f.ledger.total_locked(), 4_250);
        f.ledger = emergency_withdraw(&f.ledger, &c, &f.user).unwrap().ledger;
        assert_eq!(f.ledger.total_locked(), 250);
        assert!(!b.is_settled());
    }

    #[test]
    fn test_admin_operations_reject_non_admin() {
        let mut f = fixture();
        f.ledger = add_rewards(&f.ledger, &f.admin, 500).unwrap();
        let intruder = f.user;

        for paused in [false, true] {
            f.ledger.paused = paused;
            assert_eq!(add_rewards(&f.ledger, &intruder, 10), Err(VaultError::OwnerOnly));
            assert_eq!(set_paused(&f.ledger, &intruder, true), Err(VaultError::OwnerOnly));
            assert_eq!(set_paused(&f.ledger, &intruder, false), Err(VaultError::OwnerOnly));
            assert_eq!(
                withdraw_excess_rewards(&f.ledger, &intruder, 1),
                Err(VaultError::OwnerOnly)
            );
        }
    }

    #[test]
    fn test_pause_blocks_only_creation() {
        let mut f = fixture();
        f.ledger = add_rewards(&f.ledger, &f.admin, 1_000_000).unwrap();
        let vault = open(&mut f, 1_000, 4320, 0);

        f.ledger = set_paused(&f.ledger, &f.admin, true).unwrap();
        assert!(f.ledger.is_paused());
        assert_eq!(
            open_vault(&f.ledger, &f.index, &f.user, 1_000, 4320, 0, 0),
            Err(VaultError::ContractPaused)
        );
        assert!(claim_vault(&f.ledger, &vault, &f.user, vault.lock_end).is_ok());
        assert!(emergency_withdraw(&f.ledger, &vault, &f.user).is_ok());

        f.ledger = set_paused(&f.ledger, &f.admin, false).unwrap();
        assert!(open_vault(&f.ledger, &f.index, &f.user, 1_000, 4320, 0, 0).is_ok());
    }

    #[test]
    fn test_withdraw_excess_rewards_is_strict() {
        let f = fixture();
        let ledger = add_rewards(&f.ledger, &f.admin, 1_000).unwrap();
        assert_eq!(
            withdraw_excess_rewards(&ledger, &f.admin, 1_000),
            Err(VaultError::InsufficientRewards)
        );
        let swept = withdraw_excess_rewards(&ledger, &f.admin, 999).unwrap();
        assert_eq!(swept.reward_pool(), 1);
    }

    #[test]
    fn test_zero_admin_amounts_are_rejected() {
        let f = fixture();
        assert_eq!(add_rewards(&f.ledger, &f.admin, 0), Err(VaultError::InvalidAmount));
        assert_eq!(
            withdraw_excess_rewards(&f.ledger, &f.admin, 0),
            Err(VaultError::InvalidAmount)
        );
    }

    #[test]
    fn test_reads_tolerate_missing_accounts() {
        assert_eq!(get_vault(None), None);
        assert_eq!(get_vault(Some(&[][..])), None);
        assert!(get_user_vaults(None).is_empty());
        assert!(get_user_vaults(Some(&[1u8, 2, 3][..])).is_empty());
    }

    #[test]
    fn test_reads_resolve_settled_vaults() {
        let mut f = fixture();
        let vault = open(&mut f, 1_000, 4320, 0);
        let settled = emergency_withdraw(&f.ledger, &vault, &f.user).unwrap().vault;

        let data = settled.try_to_vec().unwrap();
        assert_eq!(get_vault(Some(data.as_slice())), Some(settled));

        let mut index_data = vec![0u8; OwnerVaultIndex::SIZE];
        let bytes = f.index.try_to_vec().unwrap();
        index_data[..bytes.len()].copy_from_slice(&bytes);
        assert_eq!(get_user_vaults(Some(index_data.as_slice())), vec![1]);
    }
}
