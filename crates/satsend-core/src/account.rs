//! Accounts and addresses offered in the send pickers

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// HD account identified by its extended public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdAccount {
    /// Account index within the HD wallet
    pub index: u32,
    /// Extended public key
    pub xpub: String,
    /// Archived accounts are hidden from pickers
    #[serde(default)]
    pub archived: bool,
}

/// Imported single address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAddress {
    /// Encoded address
    pub address: String,
    /// Address was imported without a private key
    #[serde(default)]
    pub watch_only: bool,
    /// An encrypted private key is stored for the address
    #[serde(default)]
    pub has_private_key: bool,
    /// Archived addresses are hidden from pickers
    #[serde(default)]
    pub archived: bool,
}

impl LegacyAddress {
    /// Whether the wallet can sign for this address
    pub fn is_spendable(&self) -> bool {
        self.has_private_key
    }
}

/// Saved contact address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookEntry {
    /// Encoded address
    pub address: String,
}

/// What an [`ItemAccount`] refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountKind {
    /// HD account
    Hd(HdAccount),
    /// Imported address
    Legacy(LegacyAddress),
    /// Address book entry (receive only)
    AddressBook(AddressBookEntry),
}

/// Picker entry: label, balance and the account it refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAccount {
    /// Display label
    pub label: String,
    /// Balance in satoshis, if known
    pub balance: Option<u64>,
    /// Referenced account
    pub kind: AccountKind,
}

impl ItemAccount {
    /// Entry for an HD account
    pub fn hd(label: impl Into<String>, balance: u64, account: HdAccount) -> Self {
        Self {
            label: label.into(),
            balance: Some(balance),
            kind: AccountKind::Hd(account),
        }
    }

    /// Entry for an imported address
    pub fn legacy(label: impl Into<String>, balance: u64, address: LegacyAddress) -> Self {
        Self {
            label: label.into(),
            balance: Some(balance),
            kind: AccountKind::Legacy(address),
        }
    }

    /// Entry for an address book contact
    pub fn address_book(label: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            balance: None,
            kind: AccountKind::AddressBook(AddressBookEntry {
                address: address.into(),
            }),
        }
    }

    /// Xpub for HD accounts, address otherwise
    pub fn source_id(&self) -> &str {
        match &self.kind {
            AccountKind::Hd(account) => &account.xpub,
            AccountKind::Legacy(legacy) => &legacy.address,
            AccountKind::AddressBook(entry) => &entry.address,
        }
    }

    /// Whether both entries refer to the same account or address
    pub fn same_source(&self, other: &ItemAccount) -> bool {
        self.source_id() == other.source_id()
    }

    /// HD account, if this is one
    pub fn as_hd(&self) -> Option<&HdAccount> {
        match &self.kind {
            AccountKind::Hd(account) => Some(account),
            _ => None,
        }
    }

    /// Legacy address, if this is one
    pub fn as_legacy(&self) -> Option<&LegacyAddress> {
        match &self.kind {
            AccountKind::Legacy(legacy) => Some(legacy),
            _ => None,
        }
    }

    /// Whether the entry can fund a payment
    pub fn can_send_from(&self) -> bool {
        !matches!(self.kind, AccountKind::AddressBook(_))
    }

    /// Label shown in the picker, with the balance when known
    pub fn display_label(&self) -> String {
        match self.balance {
            Some(balance) => format!("{} ({})", self.label, balance),
            None => self.label.clone(),
        }
    }
}

impl fmt::Display for ItemAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Signing key material, wiped on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    /// Wrap raw key bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Verified second password, wiped on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecondPassword(String);

impl SecondPassword {
    /// Wrap a password
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Password text
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecondPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecondPassword(..)")
    }
}
