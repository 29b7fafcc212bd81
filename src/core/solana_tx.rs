//! Unsigned Solana transfer transactions.
//!
//! Transactions are assembled locally and handed to Privy as base64
//! `bincode` bytes; the Privy wallet is both fee payer and only signer.

use crate::errors::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use solana_sdk::{
    hash::Hash, instruction::Instruction, message::Message, pubkey::Pubkey, system_instruction,
    transaction::Transaction,
};
use std::str::FromStr;

/// What is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    /// Lamports through the System program
    Native,
    /// An SPL token, moved between associated token accounts
    Token {
        /// Mint of the token
        mint: Pubkey,
        /// Mint decimals, checked on-chain by `transfer_checked`
        decimals: u8,
        /// Whether the recipient's associated token account must be created first
        create_destination_account: bool,
    },
}

/// One transfer from a Privy wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    /// Sender wallet, also the fee payer
    pub from: Pubkey,
    /// Recipient wallet (not a token account)
    pub to: Pubkey,
    /// Asset and token-account details
    pub asset: Asset,
    /// Amount in base units
    pub amount: u64,
}

/// Parses a base58 public key.
pub fn parse_pubkey(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address.trim()).map_err(|_| Error::InvalidAddress {
        address: address.to_string(),
    })
}

/// Associated token account of `wallet` for `mint` under the SPL Token program.
#[must_use]
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(wallet, mint)
}

/// Instructions performing `plan`.
pub fn transfer_instructions(plan: &TransferPlan) -> Result<Vec<Instruction>> {
    match plan.asset {
        Asset::Native => Ok(vec![system_instruction::transfer(
            &plan.from,
            &plan.to,
            plan.amount,
        )]),
        Asset::Token {
            mint,
            decimals,
            create_destination_account,
        } => {
            let source = associated_token_address(&plan.from, &mint);
            let destination = associated_token_address(&plan.to, &mint);

            let mut instructions = Vec::with_capacity(2);
            if create_destination_account {
                instructions.push(
                    spl_associated_token_account::instruction::create_associated_token_account(
                        &plan.from,
                        &plan.to,
                        &mint,
                        &spl_token::id(),
                    ),
                );
            }
            let transfer = spl_token::instruction::transfer_checked(
                &spl_token::id(),
                &source,
                &mint,
                &destination,
                &plan.from,
                &[],
                plan.amount,
                decimals,
            )
            .map_err(|e| Error::Transaction {
                message: e.to_string(),
            })?;
            instructions.push(transfer);
            Ok(instructions)
        }
    }
}

/// Serializes an unsigned transaction paid by `payer` as base64.
pub fn encode_unsigned(instructions: &[Instruction], payer: &Pubkey, blockhash: Hash) -> Result<String> {
    let message = Message::new_with_blockhash(instructions, Some(payer), &blockhash);
    let transaction = Transaction::new_unsigned(message);
    let bytes = bincode::serialize(&transaction).map_err(|e| Error::Transaction {
        message: e.to_string(),
    })?;
    Ok(STANDARD.encode(bytes))
}

/// Builds and encodes the transaction for `plan`.
pub fn build_transfer(plan: &TransferPlan, blockhash: Hash) -> Result<String> {
    encode_unsigned(&transfer_instructions(plan)?, &plan.from, blockhash)
}

#[cfg(test)]
pub(crate) fn decode(encoded: &str) -> Transaction {
    #![allow(clippy::unwrap_used)]
    bincode::deserialize(&STANDARD.decode(encoded).unwrap()).unwrap()
}
