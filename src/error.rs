use num_traits::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Custom error types for the time-locked vault program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Admin-only operation invoked by someone else
    #[error("Caller is not the ledger admin")]
    OwnerOnly = 100,

    /// Depositor or pool token account cannot cover the transfer
    #[error("Insufficient balance")]
    InsufficientBalance = 101,

    #[error("Invalid amount")]
    InvalidAmount = 102,

    /// Lock duration outside the accepted range
    #[error("Invalid lock duration")]
    InvalidDuration = 103,

    #[error("Vault not found")]
    VaultNotFound = 104,

    /// Vault has not reached maturity yet
    #[error("Vault is still locked")]
    VaultLocked = 105,

    /// Vault was already claimed or emergency-withdrawn
    #[error("Vault already settled")]
    AlreadyClaimed = 106,

    #[error("Contract is paused")]
    ContractPaused = 107,

    /// Reward pool cannot cover the payout
    #[error("Insufficient rewards in pool")]
    InsufficientRewards = 108,

    /// Required signature missing
    #[error("Unauthorized")]
    Unauthorized = 109,

    /// Owner already holds the maximum number of vaults
    #[error("Vault limit reached")]
    VaultLimitReached = 110,

    #[error("Invalid input")]
    InvalidInput = 111,

    #[error("Invalid token account")]
    InvalidTokenAccount = 112,

    #[error("Invalid mint")]
    InvalidMint = 113,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 114,

    #[error("Account not initialized")]
    AccountNotInitialized = 115,
}

impl From<VaultError> for ProgramError {
    fn from(e: VaultError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for VaultError {
    fn type_of() -> &'static str {
        "VaultError"
    }
}

impl FromPrimitive for VaultError {
    fn from_i64(n: i64) -> Option<Self> {
        u64::try_from(n).ok().and_then(Self::from_u64)
    }

    fn from_u64(n: u64) -> Option<Self> {
        let error = match n {
            100 => VaultError::OwnerOnly,
            101 => VaultError::InsufficientBalance,
            102 => VaultError::InvalidAmount,
            103 => VaultError::InvalidDuration,
            104 => VaultError::VaultNotFound,
            105 => VaultError::VaultLocked,
            106 => VaultError::AlreadyClaimed,
            107 => VaultError::ContractPaused,
            108 => VaultError::InsufficientRewards,
            109 => VaultError::Unauthorized,
            110 => VaultError::VaultLimitReached,
            111 => VaultError::InvalidInput,
            112 => VaultError::InvalidTokenAccount,
            113 => VaultError::InvalidMint,
            114 => VaultError::ArithmeticOverflow,
            115 => VaultError::AccountNotInitialized,
            _ => return None,
        };
        Some(error)
    }
}

impl PrintProgramError for VaultError {
    fn print<E>(&self) {
        match self {
            VaultError::OwnerOnly => msg!("Error: Only the ledger admin may do this"),
            VaultError::InsufficientBalance => msg!("Error: Token balance too low for transfer"),
            VaultError::InvalidAmount => msg!("Error: Amount must be greater than zero"),
            VaultError::InvalidDuration => msg!("Error: Lock duration outside the accepted range"),
            VaultError::VaultNotFound => msg!("Error: No such vault for this owner"),
            VaultError::VaultLocked => msg!("Error: Vault has not reached maturity"),
            VaultError::AlreadyClaimed => msg!("Error: Vault already claimed or withdrawn"),
            VaultError::ContractPaused => msg!("Error: Vault creation is paused"),
            VaultError::InsufficientRewards => msg!("Error: Reward pool cannot cover this payout"),
            VaultError::Unauthorized => msg!("Error: Missing required signature"),
            VaultError::VaultLimitReached => msg!("Error: Owner vault index is full"),
            VaultError::InvalidInput => msg!("Error: Invalid input parameters provided"),
            VaultError::InvalidTokenAccount => msg!("Error: Invalid token account provided"),
            VaultError::InvalidMint => msg!("Error: Invalid mint provided"),
            VaultError::ArithmeticOverflow => msg!("Error: Arithmetic overflow occurred"),
            VaultError::AccountNotInitialized => msg!("Error: Account not properly initialized"),
        }
    }
}
