use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use crate::{
    error::VaultError,
    instruction::{unpack, VaultInstruction},
    ledger,
    state::{LedgerState, OwnerVaultIndex, VaultRecord},
    utils::{
        derive_ledger_state_pda, derive_owner_index_pda, derive_vault_record_pda,
        is_uninitialized, load_token_account, verify_account_owner, verify_ledger_state_pda,
        verify_program_id, verify_signer, verify_token_mint, verify_uninitialized_account,
        verify_upgrade_authority, verify_vault_record_pda, verify_writable, LEDGER_SEED,
        OWNER_INDEX_SEED, VAULT_SEED,
    },
};

/// Log the head of an account buffer when decoding fails
fn log_buffer_state(data: &[u8], expected_size: usize, operation: &str) {
    msg!(
        "{}: Buffer length: {}, expected: {}",
        operation,
        data.len(),
        expected_size
    );
    if !data.is_empty() {
        let preview_len = 20.min(data.len());
        msg!("{}: First {} bytes: {:?}", operation, preview_len, &data[..preview_len]);
    }
}

/// Serialize a record into the front of an account's data buffer
fn store_record<T: BorshSerialize>(
    record: &T,
    account: &AccountInfo,
    operation: &str,
) -> ProgramResult {
    let serialized = record.try_to_vec().map_err(|e| {
        msg!("{}: Failed to serialize record: {}", operation, e);
        VaultError::InvalidInput
    })?;

    let mut data = account.try_borrow_mut_data()?;
    if data.len() < serialized.len() {
        msg!(
            "{}: Account data buffer too small - required: {}, available: {}",
            operation,
            serialized.len(),
            data.len()
        );
        return Err(VaultError::InvalidInput.into());
    }

    data[..serialized.len()].copy_from_slice(&serialized);
    Ok(())
}

/// Load and verify the ledger state PDA
fn load_ledger_state(
    program_id: &Pubkey,
    ledger_info: &AccountInfo,
    operation: &str,
) -> Result<LedgerState, ProgramError> {
    if is_uninitialized(ledger_info) {
        msg!("{}: Ledger has not been initialized", operation);
        return Err(VaultError::AccountNotInitialized.into());
    }
    verify_account_owner(ledger_info, program_id)?;

    let data = ledger_info.try_borrow_data()?;
    if data.len() != LedgerState::SIZE {
        log_buffer_state(&data, LedgerState::SIZE, operation);
        return Err(VaultError::AccountNotInitialized.into());
    }

    let ledger = LedgerState::try_from_slice(&data).map_err(|e| {
        msg!("{}: Failed to deserialize ledger state: {}", operation, e);
        log_buffer_state(&data, LedgerState::SIZE, operation);
        VaultError::AccountNotInitialized
    })?;

    ledger.validate().map_err(|err| {
        msg!("{}: Ledger state validation failed: {}", operation, err);
        VaultError::InvalidInput
    })?;
    verify_ledger_state_pda(program_id, ledger_info.key, ledger.bump)?;

    Ok(ledger)
}

/// Load a vault record owned by `owner`. Anything that is not that owner's
/// vault `vault_id` is reported as not found.
fn load_vault_record(
    program_id: &Pubkey,
    vault_info: &AccountInfo,
    owner: &Pubkey,
    vault_id: u64,
    operation: &str,
) -> Result<VaultRecord, ProgramError> {
    if vault_info.owner != program_id {
        msg!("{}: Vault {} does not exist for {}", operation, vault_id, owner);
        return Err(VaultError::VaultNotFound.into());
    }

    let data = vault_info.try_borrow_data()?;
    let vault = ledger::get_vault(Some(&data[..])).ok_or_else(|| {
        log_buffer_state(&data, VaultRecord::SIZE, operation);
        VaultError::VaultNotFound
    })?;

    vault.validate().map_err(|err| {
        msg!("{}: Vault record validation failed: {}", operation, err);
        VaultError::InvalidInput
    })?;

    let address_matches =
        verify_vault_record_pda(program_id, vault_info.key, owner, vault.position, vault.bump)
            .is_ok();
    if vault.vault_id != vault_id || !address_matches {
        msg!("{}: Vault {} does not exist for {}", operation, vault_id, owner);
        return Err(VaultError::VaultNotFound.into());
    }

    Ok(vault)
}

/// Load the owner's vault index, or start an empty one if it was never created
fn load_or_new_owner_index(
    program_id: &Pubkey,
    index_info: &AccountInfo,
    owner: &Pubkey,
    bump: u8,
    operation: &str,
) -> Result<(OwnerVaultIndex, bool), ProgramError> {
    if is_uninitialized(index_info) {
        return Ok((OwnerVaultIndex::new(*owner, bump), true));
    }
    verify_account_owner(index_info, program_id)?;

    let data = index_info.try_borrow_data()?;
    if data.len() != OwnerVaultIndex::SIZE {
        log_buffer_state(&data, OwnerVaultIndex::SIZE, operation);
        return Err(VaultError::AccountNotInitialized.into());
    }

    // The account is allocated for a full index; trailing bytes are padding
    let index = OwnerVaultIndex::deserialize(&mut &data[..]).map_err(|e| {
        msg!("{}: Failed to deserialize owner index: {}", operation, e);
        VaultError::AccountNotInitialized
    })?;

    index.validate().map_err(|err| {
        msg!("{}: Owner index validation failed: {}", operation, err);
        VaultError::InvalidInput
    })?;
    if index.owner != *owner {
        msg!("{}: Owner index belongs to {}", operation, index.owner);
        return Err(VaultError::InvalidInput.into());
    }

    Ok((index, false))
}

/// Allocate a program-owned PDA, paid for by `payer`. An address that
/// already holds lamports is topped up to rent exemption, then allocated and
/// assigned in place.
fn create_pda_account<'a>(
    program_id: &Pubkey,
    payer: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    space: usize,
    seeds: &[&[u8]],
    operation: &str,
) -> ProgramResult {
    let log_failure = |e: ProgramError| {
        msg!("{}: Failed to create account {}: {}", operation, new_account.key, e);
        e
    };
    let required_lamports = Rent::get()?.minimum_balance(space);
    let current_lamports = new_account.lamports();

    if current_lamports == 0 {
        let create_ix = system_instruction::create_account(
            payer.key,
            new_account.key,
            required_lamports,
            space as u64,
            program_id,
        );
        return invoke_signed(
            &create_ix,
            &[payer.clone(), new_account.clone(), system_program_info.clone()],
            &[seeds],
        )
        .map_err(log_failure);
    }

    msg!(
        "{}: Account {} is pre-funded with {} lamports",
        operation,
        new_account.key,
        current_lamports
    );
    let top_up = required_lamports.saturating_sub(current_lamports);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, new_account.key, top_up),
            &[payer.clone(), new_account.clone(), system_program_info.clone()],
        )
        .map_err(log_failure)?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account.key, space as u64),
        &[new_account.clone(), system_program_info.clone()],
        &[seeds],
    )
    .map_err(log_failure)?;
    invoke_signed(
        &system_instruction::assign(new_account.key, program_id),
        &[new_account.clone(), system_program_info.clone()],
        &[seeds],
    )
    .map_err(log_failure)
}

/// Move tokens out of a caller-controlled account into the pool
fn transfer_into_pool<'a>(
    source: &AccountInfo<'a>,
    pool_token_account: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    token_program: &AccountInfo<'a>,
    amount: u64,
    operation: &str,
) -> ProgramResult {
    let transfer_ix = spl_token::instruction::transfer(
        &spl_token::id(),
        source.key,
        pool_token_account.key,
        authority.key,
        &[],
        amount,
    )?;

    invoke(
        &transfer_ix,
        &[
            source.clone(),
            pool_token_account.clone(),
            authority.clone(),
            token_program.clone(),
        ],
    )
    .map_err(|e| {
        msg!("{}: Token transfer into pool failed: {}", operation, e);
        e
    })
}

/// Move tokens out of the pool, signed by the ledger PDA
fn transfer_from_pool<'a>(
    pool_token_account: &AccountInfo<'a>,
    destination: &AccountInfo<'a>,
    ledger_info: &AccountInfo<'a>,
    token_program: &AccountInfo<'a>,
    ledger_bump: u8,
    amount: u64,
    operation: &str,
) -> ProgramResult {
    let transfer_ix = spl_token::instruction::transfer(
        &spl_token::id(),
        pool_token_account.key,
        destination.key,
        ledger_info.key,
        &[],
        amount,
    )?;

    invoke_signed(
        &transfer_ix,
        &[
            pool_token_account.clone(),
            destination.clone(),
            ledger_info.clone(),
            token_program.clone(),
        ],
        &[&[LEDGER_SEED, &[ledger_bump]]],
    )
    .map_err(|e| {
        msg!("{}: Token transfer from pool failed: {}", operation, e);
        e
    })
}

/// Check the pool token account is the one bound to the ledger and that the
/// other side of the transfer is a different account. Returns the pool balance.
fn pool_balance(
    pool_info: &AccountInfo,
    counterparty_info: &AccountInfo,
    ledger: &LedgerState,
    operation: &str,
) -> Result<u64, ProgramError> {
    if *pool_info.key != ledger.pool_token_account {
        msg!(
            "{}: Pool token account mismatch. Expected: {}, Got: {}",
            operation,
            ledger.pool_token_account,
            pool_info.key
        );
        return Err(VaultError::InvalidTokenAccount.into());
    }
    if counterparty_info.key == pool_info.key {
        msg!("{}: Pool token account cannot be the transfer counterparty", operation);
        return Err(VaultError::InvalidTokenAccount.into());
    }
    Ok(load_token_account(pool_info, &ledger.token_mint)?.amount)
}

fn u64_pair(first: u64, second: u64) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&first.to_le_bytes());
    out[8..].copy_from_slice(&second.to_le_bytes());
    out
}

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = unpack(instruction_data)?;

    match instruction {
        VaultInstruction::Initialize => process_initialize(program_id, accounts),
        VaultInstruction::CreateVault { amount, duration } => {
            process_create_vault(program_id, accounts, amount, duration)
        }
        VaultInstruction::ClaimVault { vault_id } => {
            process_claim_vault(program_id, accounts, vault_id)
        }
        VaultInstruction::EmergencyWithdraw { vault_id } => {
            process_emergency_withdraw(program_id, accounts, vault_id)
        }
        VaultInstruction::AddRewards { amount } => {
            process_add_rewards(program_id, accounts, amount)
        }
        VaultInstruction::Pause => process_set_paused(program_id, accounts, true),
        VaultInstruction::Unpause => process_set_paused(program_id, accounts, false),
        VaultInstruction::WithdrawExcessRewards { amount } => {
            process_withdraw_excess_rewards(program_id, accounts, amount)
        }
    }
}

/// Process Initialize instruction
/// Creates the ledger state and binds the admin (the upgrade authority), mint and pool account
pub fn process_initialize(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let admin_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let pool_token_info = next_account_info(account_info_iter)?;
    let token_mint_info = next_account_info(account_info_iter)?;
    let token_program_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;
    let rent_info = next_account_info(account_info_iter)?;
    let program_data_info = next_account_info(account_info_iter)?;

    verify_signer(admin_info)?;
    verify_writable(admin_info)?;
    verify_writable(ledger_info)?;
    verify_program_id(token_program_info, &spl_token::id())?;
    verify_program_id(system_program_info, &system_program::id())?;
    verify_program_id(rent_info, &solana_program::sysvar::rent::id())?;
    verify_token_mint(token_mint_info)?;
    verify_upgrade_authority(program_id, program_data_info, admin_info.key).map_err(|e| {
        msg!("Initialize: {} is not the program's upgrade authority", admin_info.key);
        e
    })?;

    let (ledger_pda, ledger_bump) = derive_ledger_state_pda(program_id);
    if ledger_pda != *ledger_info.key {
        msg!(
            "Initialize: Ledger state PDA mismatch. Expected: {}, Got: {}",
            ledger_pda,
            ledger_info.key
        );
        return Err(VaultError::InvalidInput.into());
    }
    verify_uninitialized_account(ledger_info).map_err(|e| {
        msg!("Initialize: Ledger already initialized");
        e
    })?;

    let pool_token_account = load_token_account(pool_token_info, token_mint_info.key)?;
    if pool_token_account.owner != ledger_pda {
        msg!(
            "Initialize: Pool token account must be controlled by the ledger PDA {}",
            ledger_pda
        );
        return Err(VaultError::InvalidTokenAccount.into());
    }

    let rent = Rent::from_account_info(rent_info)?;
    let ledger_lamports = rent.minimum_balance(LedgerState::SIZE);
    if admin_info.lamports() < ledger_lamports {
        msg!(
            "Initialize: Insufficient lamports for rent exemption. Required: {}, Available: {}",
            ledger_lamports,
            admin_info.lamports()
        );
        return Err(VaultError::InsufficientBalance.into());
    }

    create_pda_account(
        program_id,
        admin_info,
        ledger_info,
        system_program_info,
        LedgerState::SIZE,
        &[LEDGER_SEED, &[ledger_bump]],
        "Initialize",
    )?;

    let ledger = LedgerState::new(
        *admin_info.key,
        *token_mint_info.key,
        *pool_token_info.key,
        ledger_bump,
    );
    store_record(&ledger, ledger_info, "Initialize")?;

    msg!(
        "Ledger initialized. Admin: {}, Mint: {}, Pool: {}",
        ledger.admin,
        ledger.token_mint,
        ledger.pool_token_account
    );

    Ok(())
}

/// Process CreateVault instruction
/// Locks the depositor's tokens in a new vault
pub fn process_create_vault(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    amount: u64,
    duration: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let depositor_info = next_account_info(account_info_iter)?;
    let depositor_token_info = next_account_info(account_info_iter)?;
    let pool_token_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let vault_info = next_account_info(account_info_iter)?;
    let index_info = next_account_info(account_info_iter)?;
    let token_program_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;

    verify_signer(depositor_info)?;
    for account in [
        depositor_info,
        depositor_token_info,
        pool_token_info,
        ledger_info,
        vault_info,
        index_info,
    ] {
        verify_writable(account)?;
    }
    verify_program_id(token_program_info, &spl_token::id())?;
    verify_program_id(system_program_info, &system_program::id())?;

    let ledger = load_ledger_state(program_id, ledger_info, "CreateVault")?;

    let (index_pda, index_bump) = derive_owner_index_pda(program_id, depositor_info.key);
    if index_pda != *index_info.key {
        msg!(
            "CreateVault: Owner index PDA mismatch. Expected: {}, Got: {}",
            index_pda,
            index_info.key
        );
        return Err(VaultError::InvalidInput.into());
    }
    let (index, index_is_new) = load_or_new_owner_index(
        program_id,
        index_info,
        depositor_info.key,
        index_bump,
        "CreateVault",
    )?;

    let vault_id = ledger.next_vault_id().ok_or(VaultError::ArithmeticOverflow)?;
    let position = index.next_position();
    let (vault_pda, vault_bump) = derive_vault_record_pda(program_id, depositor_info.key, position);

    let now = Clock::get()?.slot;
    let opened = ledger::open_vault(
        &ledger,
        &index,
        depositor_info.key,
        amount,
        duration,
        now,
        vault_bump,
    )
    .map_err(|e| {
        msg!("CreateVault: Rejected: {}", e);
        e
    })?;

    if vault_pda != *vault_info.key {
        msg!(
            "CreateVault: Vault record PDA mismatch at position {}. Expected: {}, Got: {}",
            position,
            vault_pda,
            vault_info.key
        );
        return Err(VaultError::InvalidInput.into());
    }
    verify_uninitialized_account(vault_info)?;

    pool_balance(pool_token_info, depositor_token_info, &ledger, "CreateVault")?;
    let depositor_token = load_token_account(depositor_token_info, &ledger.token_mint)?;
    if depositor_token.amount < amount {
        msg!(
            "CreateVault: Insufficient depositor balance. Required: {}, Available: {}",
            amount,
            depositor_token.amount
        );
        return Err(VaultError::InsufficientBalance.into());
    }

    let position_bytes = position.to_le_bytes();
    create_pda_account(
        program_id,
        depositor_info,
        vault_info,
        system_program_info,
        VaultRecord::SIZE,
        &[VAULT_SEED, depositor_info.key.as_ref(), &position_bytes, &[vault_bump]],
        "CreateVault",
    )?;
    if index_is_new {
        create_pda_account(
            program_id,
            depositor_info,
            index_info,
            system_program_info,
            OwnerVaultIndex::SIZE,
            &[OWNER_INDEX_SEED, depositor_info.key.as_ref(), &[index_bump]],
            "CreateVault",
        )?;
    }

    store_record(&opened.vault, vault_info, "CreateVault")?;
    store_record(&opened.index, index_info, "CreateVault")?;
    store_record(&opened.ledger, ledger_info, "CreateVault")?;

    transfer_into_pool(
        depositor_token_info,
        pool_token_info,
        depositor_info,
        token_program_info,
        amount,
        "CreateVault",
    )?;

    set_return_data(&vault_id.to_le_bytes());

    msg!(
        "Vault created. Owner: {}, Vault: {}, Amount: {}, Lock: {}..{}, Rate: {} bp, Locked: {}",
        depositor_info.key,
        vault_id,
        amount,
        opened.vault.lock_start,
        opened.vault.lock_end,
        opened.vault.reward_rate,
        opened.ledger.total_locked
    );

    Ok(())
}

/// Process ClaimVault instruction
/// Pays out a matured vault's principal and reward
pub fn process_claim_vault(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    vault_id: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let depositor_info = next_account_info(account_info_iter)?;
    let depositor_token_info = next_account_info(account_info_iter)?;
    let pool_token_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let vault_info = next_account_info(account_info_iter)?;
    let token_program_info = next_account_info(account_info_iter)?;

    verify_signer(depositor_info)?;
    for account in [depositor_token_info, pool_token_info, ledger_info, vault_info] {
        verify_writable(account)?;
    }
    verify_program_id(token_program_info, &spl_token::id())?;

    let ledger = load_ledger_state(program_id, ledger_info, "ClaimVault")?;
    let vault = load_vault_record(
        program_id,
        vault_info,
        depositor_info.key,
        vault_id,
        "ClaimVault",
    )?;

    let now = Clock::get()?.slot;
    let claimed = ledger::claim_vault(&ledger, &vault, depositor_info.key, now).map_err(|e| {
        msg!("ClaimVault: Vault {} rejected at slot {}: {}", vault_id, now, e);
        e
    })?;

    load_token_account(depositor_token_info, &ledger.token_mint)?;
    let available = pool_balance(pool_token_info, depositor_token_info, &ledger, "ClaimVault")?;
    let owed = claimed
        .amount
        .checked_add(claimed.reward)
        .ok_or(VaultError::ArithmeticOverflow)?;
    if available < owed {
        msg!(
            "ClaimVault: Insufficient pool balance. Required: {}, Available: {}",
            owed,
            available
        );
        return Err(VaultError::InsufficientBalance.into());
    }

    store_record(&claimed.vault, vault_info, "ClaimVault")?;
    store_record(&claimed.ledger, ledger_info, "ClaimVault")?;

    transfer_from_pool(
        pool_token_info,
        depositor_token_info,
        ledger_info,
        token_program_info,
        ledger.bump,
        claimed.amount,
        "ClaimVault",
    )?;
    if claimed.reward > 0 {
        transfer_from_pool(
            pool_token_info,
            depositor_token_info,
            ledger_info,
            token_program_info,
            ledger.bump,
            claimed.reward,
            "ClaimVault",
        )?;
    }

    set_return_data(&u64_pair(claimed.amount, claimed.reward));

    msg!(
        "Vault claimed. Owner: {}, Vault: {}, Amount: {}, Reward: {}, Reward Pool: {}",
        depositor_info.key,
        vault_id,
        claimed.amount,
        claimed.reward,
        claimed.ledger.reward_pool
    );

    Ok(())
}

/// Process EmergencyWithdraw instruction
/// Returns a vault's principal minus the penalty, which stays in the pool
pub fn process_emergency_withdraw(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    vault_id: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let depositor_info = next_account_info(account_info_iter)?;
    let depositor_token_info = next_account_info(account_info_iter)?;
    let pool_token_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let vault_info = next_account_info(account_info_iter)?;
    let token_program_info = next_account_info(account_info_iter)?;

    verify_signer(depositor_info)?;
    for account in [depositor_token_info, pool_token_info, ledger_info, vault_info] {
        verify_writable(account)?;
    }
    verify_program_id(token_program_info, &spl_token::id())?;

    let ledger = load_ledger_state(program_id, ledger_info, "EmergencyWithdraw")?;
    let vault = load_vault_record(
        program_id,
        vault_info,
        depositor_info.key,
        vault_id,
        "EmergencyWithdraw",
    )?;

    let withdrawn = ledger::emergency_withdraw(&ledger, &vault, depositor_info.key).map_err(|e| {
        msg!("EmergencyWithdraw: Vault {} rejected: {}", vault_id, e);
        e
    })?;

    load_token_account(depositor_token_info, &ledger.token_mint)?;
    let available = pool_balance(
        pool_token_info,
        depositor_token_info,
        &ledger,
        "EmergencyWithdraw",
    )?;
    if available < withdrawn.payout {
        msg!(
            "EmergencyWithdraw: Insufficient pool balance. Required: {}, Available: {}",
            withdrawn.payout,
            available
        );
        return Err(VaultError::InsufficientBalance.into());
    }

    store_record(&withdrawn.vault, vault_info, "EmergencyWithdraw")?;
    store_record(&withdrawn.ledger, ledger_info, "EmergencyWithdraw")?;

    transfer_from_pool(
        pool_token_info,
        depositor_token_info,
        ledger_info,
        token_program_info,
        ledger.bump,
        withdrawn.payout,
        "EmergencyWithdraw",
    )?;

    set_return_data(&u64_pair(withdrawn.payout, withdrawn.penalty));

    msg!(
        "Vault emergency-withdrawn. Owner: {}, Vault: {}, Payout: {}, Penalty: {}, Locked: {}",
        depositor_info.key,
        vault_id,
        withdrawn.payout,
        withdrawn.penalty,
        withdrawn.ledger.total_locked
    );

    Ok(())
}

/// Process AddRewards instruction
/// Admin moves tokens into the reward pool
pub fn process_add_rewards(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    amount: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let admin_info = next_account_info(account_info_iter)?;
    let admin_token_info = next_account_info(account_info_iter)?;
    let pool_token_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let token_program_info = next_account_info(account_info_iter)?;

    verify_signer(admin_info)?;
    for account in [admin_token_info, pool_token_info, ledger_info] {
        verify_writable(account)?;
    }
    verify_program_id(token_program_info, &spl_token::id())?;

    let ledger = load_ledger_state(program_id, ledger_info, "AddRewards")?;
    let updated = ledger::add_rewards(&ledger, admin_info.key, amount).map_err(|e| {
        msg!("AddRewards: Rejected for {}: {}", admin_info.key, e);
        e
    })?;

    pool_balance(pool_token_info, admin_token_info, &ledger, "AddRewards")?;
    let admin_token = load_token_account(admin_token_info, &ledger.token_mint)?;
    if admin_token.amount < amount {
        msg!(
            "AddRewards: Insufficient admin balance. Required: {}, Available: {}",
            amount,
            admin_token.amount
        );
        return Err(VaultError::InsufficientBalance.into());
    }

    store_record(&updated, ledger_info, "AddRewards")?;

    transfer_into_pool(
        admin_token_info,
        pool_token_info,
        admin_info,
        token_program_info,
        amount,
        "AddRewards",
    )?;

    set_return_data(&amount.to_le_bytes());

    msg!(
        "Rewards added. Amount: {}, Reward Pool: {}",
        amount,
        updated.reward_pool
    );

    Ok(())
}

/// Process Pause / Unpause instructions
pub fn process_set_paused(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    paused: bool,
) -> ProgramResult {
    let operation = if paused { "Pause" } else { "Unpause" };
    let account_info_iter = &mut accounts.iter();
    let admin_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;

    verify_signer(admin_info)?;
    verify_writable(ledger_info)?;

    let ledger = load_ledger_state(program_id, ledger_info, operation)?;
    let updated = ledger::set_paused(&ledger, admin_info.key, paused).map_err(|e| {
        msg!("{}: Rejected for {}: {}", operation, admin_info.key, e);
        e
    })?;

    store_record(&updated, ledger_info, operation)?;

    set_return_data(&[updated.paused as u8]);

    msg!("{}: Vault creation paused = {}", operation, updated.paused);

    Ok(())
}

/// Process WithdrawExcessRewards instruction
/// Admin sweeps part of the reward pool back out
pub fn process_withdraw_excess_rewards(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    amount: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let admin_info = next_account_info(account_info_iter)?;
    let admin_token_info = next_account_info(account_info_iter)?;
    let pool_token_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let token_program_info = next_account_info(account_info_iter)?;

    verify_signer(admin_info)?;
    for account in [admin_token_info, pool_token_info, ledger_info] {
        verify_writable(account)?;
    }
    verify_program_id(token_program_info, &spl_token::id())?;

    let ledger = load_ledger_state(program_id, ledger_info, "WithdrawExcessRewards")?;
    let updated = ledger::withdraw_excess_rewards(&ledger, admin_info.key, amount).map_err(|e| {
        msg!("WithdrawExcessRewards: Rejected for {}: {}", admin_info.key, e);
        e
    })?;

    load_token_account(admin_token_info, &ledger.token_mint)?;
    let available = pool_balance(
        pool_token_info,
        admin_token_info,
        &ledger,
        "WithdrawExcessRewards",
    )?;
    if available < amount {
        msg!(
            "WithdrawExcessRewards: Insufficient pool balance. Required: {}, Available: {}",
            amount,
            available
        );
        return Err(VaultError::InsufficientBalance.into());
    }

    store_record(&updated, ledger_info, "WithdrawExcessRewards")?;

    transfer_from_pool(
        pool_token_info,
        admin_token_info,
        ledger_info,
        token_program_info,
        ledger.bump,
        amount,
        "WithdrawExcessRewards",
    )?;

    set_return_data(&amount.to_le_bytes());

    msg!(
        "Excess rewards withdrawn. Amount: {}, Reward Pool: {}",
        amount,
        updated.reward_pool
    );

    Ok(())
}
