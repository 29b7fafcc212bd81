//! Core logic - framework-agnostic session handling and command behaviour.
//!
//! Nothing in here knows about Discord or axum. Bot commands and the OAuth
//! callback call these functions and only deal with delivering the result.

/// Solana backend commands (Privy wallets, portfolio, transfers, Raydium swaps)
pub mod chain;
/// Persistent log of failed commands
pub mod error_log;
/// Reply formatting within Discord's limits
pub mod format;
/// Okto backend commands
pub mod okto;
/// Per-user session record lifecycle
pub mod session;
/// Unsigned Solana transfer transactions for Privy to sign
pub mod solana_tx;
