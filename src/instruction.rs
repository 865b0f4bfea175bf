use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    bpf_loader_upgradeable,
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
    sysvar,
};

use crate::{
    error::VaultError,
    utils::{derive_ledger_state_pda, derive_owner_index_pda, derive_vault_record_pda},
};

/// Instructions supported by the time-locked vault program
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum VaultInstruction {
    /// Create the ledger and bind its admin, mint and pool token account
    ///
    /// Accounts expected:
    /// 0. [signer, writable] Admin
    /// 1. [writable] Ledger state account (PDA)
    /// 2. [] Pool token account (token authority = ledger PDA)
    /// 3. [] Token mint
    /// 4. [] SPL Token program
    /// 5. [] System program
    /// 6. [] Rent sysvar
    /// 7. [] Program data account (upgrade authority must be the admin)
    Initialize,

    /// Lock `amount` tokens for `duration` slots
    ///
    /// Accounts expected:
    /// 0. [signer, writable] Depositor
    /// 1. [writable] Depositor token account
    /// 2. [writable] Pool token account
    /// 3. [writable] Ledger state account
    /// 4. [writable] Vault record account (PDA for the owner's next index position)
    /// 5. [writable] Owner vault index account (PDA)
    /// 6. [] SPL Token program
    /// 7. [] System program
    CreateVault { amount: u64, duration: u64 },

    /// Release a matured vault's principal plus reward
    ///
    /// Accounts expected:
    /// 0. [signer] Depositor
    /// 1. [writable] Depositor token account
    /// 2. [writable] Pool token account
    /// 3. [writable] Ledger state account
    /// 4. [writable] Vault record account (PDA)
    /// 5. [] SPL Token program
    ClaimVault { vault_id: u64 },

    /// Release a vault's principal minus the early-exit penalty
    ///
    /// Accounts expected: same as `ClaimVault`
    EmergencyWithdraw { vault_id: u64 },

    /// Admin funds the reward pool
    ///
    /// Accounts expected:
    /// 0. [signer] Admin
    /// 1. [writable] Admin token account
    /// 2. [writable] Pool token account
    /// 3. [writable] Ledger state account
    /// 4. [] SPL Token program
    AddRewards { amount: u64 },

    /// Admin halts vault creation
    ///
    /// Accounts expected:
    /// 0. [signer] Admin
    /// 1. [writable] Ledger state account
    Pause,

    /// Admin resumes vault creation
    ///
    /// Accounts expected: same as `Pause`
    Unpause,

    /// Admin sweeps surplus from the reward pool
    ///
    /// Accounts expected: same as `AddRewards`
    WithdrawExcessRewards { amount: u64 },
}

impl VaultInstruction {
    /// Create an Initialize instruction
    pub fn initialize(
        program_id: &Pubkey,
        admin: &Pubkey,
        pool_token_account: &Pubkey,
        token_mint: &Pubkey,
    ) -> Instruction {
        let (ledger_state, _) = derive_ledger_state_pda(program_id);
        let accounts = vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(ledger_state, false),
            AccountMeta::new_readonly(*pool_token_account, false),
            AccountMeta::new_readonly(*token_mint, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(
                Pubkey::find_program_address(&[program_id.as_ref()], &bpf_loader_upgradeable::id()).0,
                false,
            ),
        ];

        Self::build(program_id, accounts, &VaultInstruction::Initialize)
    }

    /// Create a CreateVault instruction. `vault_position` is the number of
    /// vaults already in the depositor's index.
    pub fn create_vault(
        program_id: &Pubkey,
        depositor: &Pubkey,
        depositor_token_account: &Pubkey,
        pool_token_account: &Pubkey,
        vault_position: u64,
        amount: u64,
        duration: u64,
    ) -> Instruction {
        let (ledger_state, _) = derive_ledger_state_pda(program_id);
        let (vault_record, _) = derive_vault_record_pda(program_id, depositor, vault_position);
        let (owner_index, _) = derive_owner_index_pda(program_id, depositor);
        let accounts = vec![
            AccountMeta::new(*depositor, true),
            AccountMeta::new(*depositor_token_account, false),
            AccountMeta::new(*pool_token_account, false),
            AccountMeta::new(ledger_state, false),
            AccountMeta::new(vault_record, false),
            AccountMeta::new(owner_index, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ];

        Self::build(
            program_id,
            accounts,
            &VaultInstruction::CreateVault { amount, duration },
        )
    }

    /// Create a ClaimVault instruction. `vault_position` is where `vault_id`
    /// sits in the depositor's index.
    pub fn claim_vault(
        program_id: &Pubkey,
        depositor: &Pubkey,
        depositor_token_account: &Pubkey,
        pool_token_account: &Pubkey,
        vault_id: u64,
        vault_position: u64,
    ) -> Instruction {
        let accounts = Self::settlement_accounts(
            program_id,
            depositor,
            depositor_token_account,
            pool_token_account,
            vault_position,
        );

        Self::build(program_id, accounts, &VaultInstruction::ClaimVault { vault_id })
    }

    /// Create an EmergencyWithdraw instruction
    pub fn emergency_withdraw(
        program_id: &Pubkey,
        depositor: &Pubkey,
        depositor_token_account: &Pubkey,
        pool_token_account: &Pubkey,
        vault_id: u64,
        vault_position: u64,
    ) -> Instruction {
        let accounts = Self::settlement_accounts(
            program_id,
            depositor,
            depositor_token_account,
            pool_token_account,
            vault_position,
        );

        Self::build(program_id, accounts, &VaultInstruction::EmergencyWithdraw { vault_id })
    }

    /// Create an AddRewards instruction
    pub fn add_rewards(
        program_id: &Pubkey,
        admin: &Pubkey,
        admin_token_account: &Pubkey,
        pool_token_account: &Pubkey,
        amount: u64,
    ) -> Instruction {
        Self::build(
            program_id,
            Self::treasury_accounts(program_id, admin, admin_token_account, pool_token_account),
            &VaultInstruction::AddRewards { amount },
        )
    }

    /// Create a Pause instruction
    pub fn pause(program_id: &Pubkey, admin: &Pubkey) -> Instruction {
        let (ledger_state, _) = derive_ledger_state_pda(program_id);
        let accounts = vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new(ledger_state, false),
        ];

        Self::build(program_id, accounts, &VaultInstruction::Pause)
    }

    /// Create an Unpause instruction
    pub fn unpause(program_id: &Pubkey, admin: &Pubkey) -> Instruction {
        let (ledger_state, _) = derive_ledger_state_pda(program_id);
        let accounts = vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new(ledger_state, false),
        ];

        Self::build(program_id, accounts, &VaultInstruction::Unpause)
    }

    /// Create a WithdrawExcessRewards instruction
    pub fn withdraw_excess_rewards(
        program_id: &Pubkey,
        admin: &Pubkey,
        admin_token_account: &Pubkey,
        pool_token_account: &Pubkey,
        amount: u64,
    ) -> Instruction {
        Self::build(
            program_id,
            Self::treasury_accounts(program_id, admin, admin_token_account, pool_token_account),
            &VaultInstruction::WithdrawExcessRewards { amount },
        )
    }

    fn settlement_accounts(
        program_id: &Pubkey,
        depositor: &Pubkey,
        depositor_token_account: &Pubkey,
        pool_token_account: &Pubkey,
        vault_position: u64,
    ) -> Vec<AccountMeta> {
        let (ledger_state, _) = derive_ledger_state_pda(program_id);
        let (vault_record, _) = derive_vault_record_pda(program_id, depositor, vault_position);
        vec![
            AccountMeta::new_readonly(*depositor, true),
            AccountMeta::new(*depositor_token_account, false),
            AccountMeta::new(*pool_token_account, false),
            AccountMeta::new(ledger_state, false),
            AccountMeta::new(vault_record, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ]
    }

    fn treasury_accounts(
        program_id: &Pubkey,
        admin: &Pubkey,
        admin_token_account: &Pubkey,
        pool_token_account: &Pubkey,
    ) -> Vec<AccountMeta> {
        let (ledger_state, _) = derive_ledger_state_pda(program_id);
        vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new(*admin_token_account, false),
            AccountMeta::new(*pool_token_account, false),
            AccountMeta::new(ledger_state, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ]
    }

    fn build(
        program_id: &Pubkey,
        accounts: Vec<AccountMeta>,
        data: &VaultInstruction,
    ) -> Instruction {
        Instruction {
            program_id: *program_id,
            accounts,
            data: data.try_to_vec().unwrap(),
        }
    }
}

/// Parse instruction data into VaultInstruction
pub fn unpack(input: &[u8]) -> Result<VaultInstruction, ProgramError> {
    if input.is_empty() {
        return Err(VaultError::InvalidInput.into());
    }

    VaultInstruction::try_from_slice(input).map_err(|_| VaultError::InvalidInput.into())
}
