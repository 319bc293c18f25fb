// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Theta ledger types: addresses, coins and the transaction kinds the vault
//! builds and signs.
//!
//! Every type serializes two ways. In JSON (human readable) addresses and
//! keys are `0x`-prefixed hex and amounts are decimal strings, matching the
//! node's RPC conventions. In the binary wire format they are raw bytes and
//! fixed-width integers.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Length of a Theta account address in bytes.
pub const ADDRESS_LEN: usize = 20;

// =============================================================================
// Address
// =============================================================================

/// A 20-byte Theta account address (Ethereum-style).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Lower-case `0x`-prefixed hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", alloy::hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid address: {0}")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = alloy::hex::decode(raw)
            .map_err(|e| AddressParseError(format!("{trimmed}: {e}")))?;
        let array: [u8; ADDRESS_LEN] = bytes.as_slice().try_into().map_err(|_| {
            AddressParseError(format!(
                "{trimmed}: expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Address(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        } else {
            <[u8; ADDRESS_LEN]>::deserialize(deserializer).map(Address)
        }
    }
}

// =============================================================================
// Key material on the wire
// =============================================================================

/// SEC1-compressed secp256k1 public key, attached to an input the first time
/// an address transacts.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PublicKey(pub Vec<u8>);

/// Recoverable secp256k1 signature: `r || s || v` (65 bytes).
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

macro_rules! hex_bytes_newtype {
    ($name:ident) => {
        impl $name {
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", alloy::hex::encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    let raw = s.strip_prefix("0x").unwrap_or(&s);
                    alloy::hex::decode(raw).map($name).map_err(de::Error::custom)
                } else {
                    Vec::<u8>::deserialize(deserializer).map($name)
                }
            }
        }
    };
}

hex_bytes_newtype!(PublicKey);
hex_bytes_newtype!(Signature);

// =============================================================================
// Amounts
// =============================================================================

/// Serde helpers for integers the node encodes as decimal strings.
///
/// Deserialization accepts both JSON strings and numbers; serialization
/// writes strings in JSON and fixed-width integers in binary formats.
pub mod dec_str {
    use std::fmt;
    use std::marker::PhantomData;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    struct DecVisitor<T>(PhantomData<T>);

    impl<'de, T> de::Visitor<'de> for DecVisitor<T>
    where
        T: FromStr + TryFrom<u64> + TryFrom<u128>,
    {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "an unsigned integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
            T::try_from(v).map_err(|_| E::custom(format!("{v} out of range")))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<T, E> {
            T::try_from(v).map_err(|_| E::custom(format!("{v} out of range")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
            let v = u64::try_from(v).map_err(|_| E::custom("negative amount"))?;
            self.visit_u64(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
            v.trim()
                .parse::<T>()
                .map_err(|_| E::custom(format!("invalid decimal integer: {v:?}")))
        }

        /// Integers above `u64::MAX` arrive as floats. serde_json only hands
        /// over a float when it prints back to the digits that were sent.
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<T, E> {
            if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
                return Err(E::custom(format!(
                    "{v} is not an unsigned integer amount"
                )));
            }
            self.visit_str(&format!("{v:.0}"))
        }

        /// serde_json's arbitrary-precision form: a single-entry map whose
        /// value holds the number's literal digits.
        fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<T, A::Error> {
            let (_, digits): (de::IgnoredAny, String) = map
                .next_entry()?
                .ok_or_else(|| de::Error::custom("expected a number"))?;
            self.visit_str(&digits)
        }
    }

    pub fn deserialize_human<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + TryFrom<u64> + TryFrom<u128> + Deserialize<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(DecVisitor(PhantomData))
        } else {
            T::deserialize(deserializer)
        }
    }

    pub mod u128 {
        use super::*;

        pub fn serialize<S: Serializer>(v: &u128, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.serialize_str(&v.to_string())
            } else {
                serializer.serialize_u128(*v)
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
            deserialize_human(deserializer)
        }
    }

    pub mod u64 {
        use super::*;

        pub fn serialize<S: Serializer>(v: &u64, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.serialize_str(&v.to_string())
            } else {
                serializer.serialize_u64(*v)
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
            deserialize_human(deserializer)
        }
    }

    /// Optional amount; JSON `null` and a missing field both map to `None`.
    pub mod option_u128 {
        use super::*;

        pub fn serialize<S: Serializer>(v: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
            match v {
                Some(v) => super::u128::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u128>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super::u128")] u128);

            Option::<Wrapper>::deserialize(deserializer).map(|w| w.map(|Wrapper(v)| v))
        }
    }

    pub mod option_u64 {
        use super::*;

        pub fn serialize<S: Serializer>(v: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match v {
                Some(v) => super::u64::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super::u64")] u64);

            Option::<Wrapper>::deserialize(deserializer).map(|w| w.map(|Wrapper(v)| v))
        }
    }
}

/// A two-currency balance in minor units (wei). TFuel is the gas currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coins {
    #[serde(rename = "thetawei", with = "dec_str::u128", default)]
    pub theta_wei: u128,
    #[serde(rename = "tfuelwei", with = "dec_str::u128", default)]
    pub tfuel_wei: u128,
}

impl Coins {
    pub const fn zero() -> Self {
        Self {
            theta_wei: 0,
            tfuel_wei: 0,
        }
    }

    /// An amount of the gas currency only.
    pub const fn tfuel(tfuel_wei: u128) -> Self {
        Self {
            theta_wei: 0,
            tfuel_wei,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.theta_wei == 0 && self.tfuel_wei == 0
    }

    /// Component-wise sum, `None` on overflow.
    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        Some(Coins {
            theta_wei: self.theta_wei.checked_add(other.theta_wei)?,
            tfuel_wei: self.tfuel_wei.checked_add(other.tfuel_wei)?,
        })
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// One spending (or counter-signing) party of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxInput {
    pub address: Address,
    pub coins: Coins,
    #[serde(with = "dec_str::u64")]
    pub sequence: u64,
    /// Present only on an address's first transaction (`sequence == 1`).
    #[serde(default)]
    pub pub_key: Option<PublicKey>,
    #[serde(default)]
    pub signature: Signature,
}

impl TxInput {
    /// An unsigned input for `address`; binds `pub_key` iff `sequence == 1`.
    pub fn new(address: Address, coins: Coins, sequence: u64, pub_key: &PublicKey) -> Self {
        Self {
            address,
            coins,
            sequence,
            pub_key: (sequence == 1).then(|| pub_key.clone()),
            signature: Signature::default(),
        }
    }

    /// An input that only names an address (service-payment target stub).
    pub fn address_only(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub coins: Coins,
}

/// Plain transfer from one or more inputs to one or more outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTx {
    pub fee: Coins,
    #[serde(with = "dec_str::u64")]
    pub gas: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

/// Escrows `source.coins` plus `collateral` for later service payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveFundTx {
    pub fee: Coins,
    #[serde(with = "dec_str::u64")]
    pub gas: u64,
    pub source: TxInput,
    pub collateral: Coins,
    pub resource_ids: Vec<String>,
    #[serde(with = "dec_str::u64")]
    pub duration: u64,
}

/// Returns the unused part of a reservation to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFundTx {
    pub fee: Coins,
    #[serde(with = "dec_str::u64")]
    pub gas: u64,
    pub source: TxInput,
    #[serde(with = "dec_str::u64")]
    pub reserve_sequence: u64,
}

/// Two-party settlement against a reservation. The payer signs `source`
/// first; the payee completes `target`, pays the fee and counter-signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePaymentTx {
    pub fee: Coins,
    #[serde(with = "dec_str::u64")]
    pub gas: u64,
    pub source: TxInput,
    pub target: TxInput,
    #[serde(with = "dec_str::u64")]
    pub payment_sequence: u64,
    #[serde(with = "dec_str::u64")]
    pub reserve_sequence: u64,
    pub resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub address: Address,
    pub percentage: u32,
}

/// Installs an on-chain rule dividing payments for `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRuleTx {
    pub fee: Coins,
    #[serde(with = "dec_str::u64")]
    pub gas: u64,
    pub resource_id: String,
    pub initiator: TxInput,
    pub splits: Vec<Split>,
    #[serde(with = "dec_str::u64")]
    pub duration: u64,
}

/// Every transaction kind the vault produces, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    Send(SendTx),
    ReserveFund(ReserveFundTx),
    ReleaseFund(ReleaseFundTx),
    ServicePayment(ServicePaymentTx),
    SplitRule(SplitRuleTx),
}

impl Transaction {
    pub fn kind(&self) -> &'static str {
        match self {
            Transaction::Send(_) => "send",
            Transaction::ReserveFund(_) => "reserve_fund",
            Transaction::ReleaseFund(_) => "release_fund",
            Transaction::ServicePayment(_) => "service_payment",
            Transaction::SplitRule(_) => "split_rule",
        }
    }
}
