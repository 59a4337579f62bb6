//! Supported token registry
//!
//! A closed set: anything not listed here is rejected with
//! `UnknownToken` rather than looked up at runtime.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use solana_sdk::{pubkey, pubkey::Pubkey};

use crate::tx_builder::errors::TransactionBuilderError;

pub const WSOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");
pub const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const USDT_MINT: Pubkey = pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB");
pub const JITOSOL_MINT: Pubkey = pubkey!("J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Token {
    Sol,
    Usdc,
    Usdt,
    #[serde(rename = "JITOSOL")]
    JitoSol,
}

impl Token {
    pub const ALL: [Token; 4] = [Token::Sol, Token::Usdc, Token::Usdt, Token::JitoSol];

    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Sol => "SOL",
            Token::Usdc => "USDC",
            Token::Usdt => "USDT",
            Token::JitoSol => "JITOSOL",
        }
    }

    /// SPL mint; SOL maps to the wrapped-SOL mint
    pub fn mint(&self) -> Pubkey {
        match self {
            Token::Sol => WSOL_MINT,
            Token::Usdc => USDC_MINT,
            Token::Usdt => USDT_MINT,
            Token::JitoSol => JITOSOL_MINT,
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Token::Sol | Token::JitoSol => 9,
            Token::Usdc | Token::Usdt => 6,
        }
    }

    /// Native SOL moves through the system program, not the token program
    pub fn is_native(&self) -> bool {
        matches!(self, Token::Sol)
    }

    pub fn from_mint(mint: &Pubkey) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.mint() == *mint)
    }

    /// Resolve a symbol (case-insensitive) or a Base58 mint
    pub fn resolve(identifier: &str) -> Result<Self, TransactionBuilderError> {
        let trimmed = identifier.trim();
        let upper = trimmed.to_ascii_uppercase();
        match upper.as_str() {
            "SOL" | "WSOL" => return Ok(Token::Sol),
            "USDC" => return Ok(Token::Usdc),
            "USDT" => return Ok(Token::Usdt),
            "JITOSOL" => return Ok(Token::JitoSol),
            _ => {}
        }
        Pubkey::from_str(trimmed)
            .ok()
            .and_then(|mint| Self::from_mint(&mint))
            .ok_or_else(|| TransactionBuilderError::UnknownToken(trimmed.to_string()))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
