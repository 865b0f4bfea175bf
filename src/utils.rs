use solana_program::{
    account_info::AccountInfo,
    bpf_loader_upgradeable::{self, UpgradeableLoaderState},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_program,
};

use crate::error::VaultError;

/// Seed for the ledger state PDA
pub const LEDGER_SEED: &[u8] = b"ledger";

/// Seed for vault record PDAs
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed for owner vault index PDAs
pub const OWNER_INDEX_SEED: &[u8] = b"owner_index";

/// Derive the ledger state PDA; one per program
pub fn derive_ledger_state_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LEDGER_SEED], program_id)
}

/// Derive a vault record PDA from its owner and its position in the owner's index
pub fn derive_vault_record_pda(
    program_id: &Pubkey,
    owner: &Pubkey,
    position: u64,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[VAULT_SEED, owner.as_ref(), &position.to_le_bytes()],
        program_id,
    )
}

/// Derive the owner vault index PDA
pub fn derive_owner_index_pda(program_id: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[OWNER_INDEX_SEED, owner.as_ref()], program_id)
}

/// Verify the ledger state PDA against its stored bump
pub fn verify_ledger_state_pda(
    program_id: &Pubkey,
    ledger_state: &Pubkey,
    bump: u8,
) -> Result<(), ProgramError> {
    let expected_pda = Pubkey::create_program_address(&[LEDGER_SEED, &[bump]], program_id)
        .map_err(|_| VaultError::InvalidInput)?;

    if expected_pda != *ledger_state {
        return Err(VaultError::InvalidInput.into());
    }

    Ok(())
}

/// Verify a vault record PDA against its stored bump
pub fn verify_vault_record_pda(
    program_id: &Pubkey,
    vault_record: &Pubkey,
    owner: &Pubkey,
    position: u64,
    bump: u8,
) -> Result<(), ProgramError> {
    let seeds = &[
        VAULT_SEED,
        owner.as_ref(),
        &position.to_le_bytes(),
        &[bump],
    ];

    let expected_pda = Pubkey::create_program_address(seeds, program_id)
        .map_err(|_| VaultError::InvalidInput)?;

    if expected_pda != *vault_record {
        return Err(VaultError::InvalidInput.into());
    }

    Ok(())
}

/// Verify `admin` is the upgrade authority recorded in the program's
/// ProgramData account. An immutable program has no authority and fails.
pub fn verify_upgrade_authority(
    program_id: &Pubkey,
    program_data: &AccountInfo,
    admin: &Pubkey,
) -> Result<(), ProgramError> {
    if *program_data.key != Pubkey::find_program_address(&[program_id.as_ref()], &bpf_loader_upgradeable::id()).0
        || program_data.owner != &bpf_loader_upgradeable::id()
    {
        return Err(VaultError::InvalidInput.into());
    }

    let data = program_data.try_borrow_data()?;
    let metadata_len = UpgradeableLoaderState::size_of_programdata_metadata();
    if data.len() < metadata_len {
        return Err(VaultError::InvalidInput.into());
    }

    let state: UpgradeableLoaderState =
        bincode::deserialize(&data[..metadata_len]).map_err(|_| VaultError::InvalidInput)?;
    match state {
        UpgradeableLoaderState::ProgramData {
            upgrade_authority_address: Some(authority),
            ..
        } if authority == *admin => Ok(()),
        UpgradeableLoaderState::ProgramData { .. } => Err(VaultError::OwnerOnly.into()),
        _ => Err(VaultError::InvalidInput.into()),
    }
}

/// Verify that an account is a signer
pub fn verify_signer(account: &AccountInfo) -> Result<(), ProgramError> {
    if !account.is_signer {
        return Err(VaultError::Unauthorized.into());
    }
    Ok(())
}

/// Verify that an account is writable
pub fn verify_writable(account: &AccountInfo) -> Result<(), ProgramError> {
    if !account.is_writable {
        return Err(VaultError::InvalidInput.into());
    }
    Ok(())
}

/// Verify that an account is owned by the expected program
pub fn verify_account_owner(
    account: &AccountInfo,
    expected_owner: &Pubkey,
) -> Result<(), ProgramError> {
    if account.owner != expected_owner {
        return Err(VaultError::InvalidInput.into());
    }
    Ok(())
}

/// Verify that an account is the expected program
pub fn verify_program_id(account: &AccountInfo, expected: &Pubkey) -> Result<(), ProgramError> {
    if account.key != expected {
        return Err(VaultError::InvalidInput.into());
    }
    Ok(())
}

/// Unpack an SPL token account and check it holds the expected mint
pub fn load_token_account(
    account: &AccountInfo,
    expected_mint: &Pubkey,
) -> Result<spl_token::state::Account, ProgramError> {
    if account.owner != &spl_token::id() {
        return Err(VaultError::InvalidTokenAccount.into());
    }

    let token_account = spl_token::state::Account::unpack(&account.data.borrow())
        .map_err(|_| VaultError::InvalidTokenAccount)?;

    if token_account.mint != *expected_mint {
        return Err(VaultError::InvalidMint.into());
    }

    Ok(token_account)
}

/// Verify that an account is a valid SPL token mint
pub fn verify_token_mint(account: &AccountInfo) -> Result<(), ProgramError> {
    if account.owner != &spl_token::id() {
        return Err(VaultError::InvalidMint.into());
    }

    spl_token::state::Mint::unpack(&account.data.borrow())
        .map_err(|_| VaultError::InvalidMint)?;

    Ok(())
}

/// Verify that an account is uninitialized (for PDA creation)
pub fn verify_uninitialized_account(account: &AccountInfo) -> Result<(), ProgramError> {
    if account.owner != &system_program::id() || account.data_len() != 0 {
        return Err(VaultError::InvalidInput.into());
    }
    Ok(())
}

/// True when the account has never been allocated by this program
pub fn is_uninitialized(account: &AccountInfo) -> bool {
    account.owner == &system_program::id() && account.data_len() == 0
}
