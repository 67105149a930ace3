//! Deterministic topic naming.
//!
//! A logical key maps to exactly one topic string `<namespace>-<identifier>`.
//! Every participant must use the identical derivation to interoperate, so
//! wallet-address identifiers are case-normalized before composition.

pub const PRIVATE_STORE_NAMESPACE: &str = "privatestore";
pub const CONVERSATIONS_NAMESPACE: &str = "conversations";
pub const INVITES_NAMESPACE: &str = "invites";

pub fn build_topic(namespace: &str, identifier: &str) -> String {
    format!("{namespace}-{identifier}")
}

/// Topic for a wallet-scoped collection; addresses are lowercased so that
/// checksummed and plain spellings land on the same topic.
pub fn build_wallet_topic(namespace: &str, wallet_address: &str) -> String {
    build_topic(namespace, &wallet_address.to_lowercase())
}
