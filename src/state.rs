use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

/// Shortest accepted lock, ~1 day of ticks
pub const MIN_LOCK_DURATION: u64 = 144;

/// Longest accepted lock, ~5 years of ticks
pub const MAX_LOCK_DURATION: u64 = 262_800;

/// Fixed early-exit penalty (10%)
pub const EMERGENCY_PENALTY_BPS: u64 = 1000;

/// Maximum number of vault ids one owner can accumulate
pub const MAX_VAULTS_PER_OWNER: usize = 100;

/// Ledger state account (PDA)
/// The single accounting record shared by every vault: admin binding,
/// custody accounts and the global counters.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    /// Deployer; the only key allowed to fund, pause or sweep the pool
    pub admin: Pubkey,
    /// The single SPL mint this ledger accepts
    pub token_mint: Pubkey,
    /// Token account holding locked principal and the reward pool
    pub pool_token_account: Pubkey,
    /// Sum of principal across all open vaults
    pub total_locked: u64,
    /// Tokens available to pay rewards
    pub reward_pool: u64,
    /// Audit counter, never read by ledger logic
    pub total_rewards_distributed: u64,
    /// Last vault id handed out
    pub vault_nonce: u64,
    /// When set, new vaults are refused
    pub paused: bool,
    /// Bump seed used for PDA derivation
    pub bump: u8,
}

impl LedgerState {
    pub const SIZE: usize = 32 + 32 + 32 + 8 + 8 + 8 + 8 + 1 + 1; // 130 bytes

    pub fn new(admin: Pubkey, token_mint: Pubkey, pool_token_account: Pubkey, bump: u8) -> Self {
        Self {
            admin,
            token_mint,
            pool_token_account,
            total_locked: 0,
            reward_pool: 0,
            total_rewards_distributed: 0,
            vault_nonce: 0,
            paused: false,
            bump,
        }
    }

    pub fn is_admin(&self, key: &Pubkey) -> bool {
        self.admin == *key
    }

    /// Id the next created vault will receive, if the nonce has room
    pub fn next_vault_id(&self) -> Option<u64> {
        self.vault_nonce.checked_add(1)
    }

    pub fn total_locked(&self) -> u64 {
        self.total_locked
    }

    pub fn reward_pool(&self) -> u64 {
        self.reward_pool
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.admin == Pubkey::default() {
            return Err("Invalid admin pubkey");
        }
        if self.token_mint == Pubkey::default() {
            return Err("Invalid token mint pubkey");
        }
        if self.pool_token_account == Pubkey::default() {
            return Err("Invalid pool token account pubkey");
        }
        Ok(())
    }
}

/// Vault record account (PDA)
/// One depositor's locked principal, its maturity window and settlement flags
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VaultRecord {
    pub owner: Pubkey,
    pub vault_id: u64,
    /// Slot in the owner's index; seeds the record address
    pub position: u64,
    /// Locked principal, immutable after creation
    pub amount: u64,
    /// Slot at creation
    pub lock_start: u64,
    /// Slot from which the vault may be claimed
    pub lock_end: u64,
    /// Annualized rate fixed at creation
    pub reward_rate: u64,
    pub claimed: bool,
    pub emergency_withdrawn: bool,
    /// Bump seed used for PDA derivation
    pub bump: u8,
}

impl VaultRecord {
    pub const SIZE: usize = 32 + 8 + 8 + 8 + 8 + 8 + 8 + 1 + 1 + 1; // 83 bytes

    pub fn duration(&self) -> u64 {
        self.lock_end.saturating_sub(self.lock_start)
    }

    pub fn is_matured(&self, now: u64) -> bool {
        now >= self.lock_end
    }

    /// Claimed or emergency-withdrawn; either way no further transitions
    pub fn is_settled(&self) -> bool {
        self.claimed || self.emergency_withdrawn
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.owner == Pubkey::default() {
            return Err("Invalid owner pubkey");
        }
        if self.amount == 0 {
            return Err("Vault amount must be non-zero");
        }
        if self.lock_end < self.lock_start {
            return Err("Lock end precedes lock start");
        }
        if self.claimed && self.emergency_withdrawn {
            return Err("Vault cannot be both claimed and emergency-withdrawn");
        }
        Ok(())
    }
}

/// Owner vault index account (PDA)
/// Append-only list of every vault id an owner has created, settled or not.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct OwnerVaultIndex {
    pub owner: Pubkey,
    /// Bump seed used for PDA derivation
    pub bump: u8,
    pub vault_ids: Vec<u64>,
}

impl OwnerVaultIndex {
    /// Allocated size: room for a full index so the account never needs a realloc
    pub const SIZE: usize = 32 + 1 + 4 + 8 * MAX_VAULTS_PER_OWNER; // 837 bytes

    pub fn new(owner: Pubkey, bump: u8) -> Self {
        Self {
            owner,
            bump,
            vault_ids: Vec::new(),
        }
    }

    /// Position the owner's next vault will take
    pub fn next_position(&self) -> u64 {
        self.vault_ids.len() as u64
    }

    pub fn is_full(&self) -> bool {
        self.vault_ids.len() >= MAX_VAULTS_PER_OWNER
    }

    pub fn push(&mut self, vault_id: u64) -> Result<(), &'static str> {
        if self.is_full() {
            return Err("Owner vault index is full");
        }
        self.vault_ids.push(vault_id);
        Ok(())
    }

    pub fn contains(&self, vault_id: u64) -> bool {
        self.vault_ids.contains(&vault_id)
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.owner == Pubkey::default() {
            return Err("Invalid owner pubkey");
        }
        if self.vault_ids.len() > MAX_VAULTS_PER_OWNER {
            return Err("Owner vault index exceeds capacity");
        }
        Ok(())
    }
}
