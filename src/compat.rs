//! Uniform access to legacy and v0 messages
//!
//! The assembler emits a legacy message when no lookup tables are in play
//! and a v0 message otherwise. Output and tests read headers, keys and
//! signers through these helpers so they never match on the version.

use solana_sdk::{
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

use crate::tx_builder::output::MessageVersion;

#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Keys embedded in the message; lookup-table addresses are not included
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// The first `num_required_signatures` static keys, fee payer first
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let header = get_message_header(message);
    let account_keys = get_static_account_keys(message);
    let num_signers = header.num_required_signatures as usize;

    &account_keys[..num_signers.min(account_keys.len())]
}

#[inline]
#[must_use]
pub fn get_num_required_signatures(message: &VersionedMessage) -> u8 {
    get_message_header(message).num_required_signatures
}

#[must_use]
pub fn message_version(message: &VersionedMessage) -> MessageVersion {
    match message {
        VersionedMessage::Legacy(_) => MessageVersion::Legacy,
        VersionedMessage::V0(_) => MessageVersion::V0,
    }
}

/// Number of lookup tables a message references (always 0 for legacy)
#[must_use]
pub fn lookup_table_count(message: &VersionedMessage) -> usize {
    match message {
        VersionedMessage::Legacy(_) => 0,
        VersionedMessage::V0(v0_msg) => v0_msg.address_table_lookups.len(),
    }
}
