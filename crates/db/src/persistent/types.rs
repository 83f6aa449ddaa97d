//! This module contains the types used to interact with the SQLite database at a column-level.
//!
//! These types are used to map the custom Rust types to SQLite types by implementing the necessary
//! serialization and deserialization logic.

use std::{ops::Deref, str::FromStr};

use alloy_primitives::{hex, Address, B256};
use plasma_primitives::{coin::CoinStatus, types::Slot};
use sqlx::Sqlite;

use super::errors::StorageError;

/// Converts an unsigned block number or timestamp into SQLite's `INTEGER`.
pub(super) fn to_db_int(value: u64) -> Result<i64, StorageError> {
    i64::try_from(value)
        .map_err(|_| StorageError::MismatchedTypes(format!("{value} does not fit in an INTEGER")))
}

/// Converts SQLite's `INTEGER` back into an unsigned block number or timestamp.
pub(super) fn from_db_int(value: i64) -> Result<u64, StorageError> {
    u64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("negative integer {value} in database")))
}

/// A 32-byte hash stored as `0x`-prefixed lowercase hex `TEXT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DbHash(B256);

impl Deref for DbHash {
    type Target = B256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<B256> for DbHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl sqlx::Type<Sqlite> for DbHash {
    fn type_info() -> <Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for DbHash {
    fn decode(
        value: <Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let hash_str: String = sqlx::decode::Decode::<'r, Sqlite>::decode(value)?;
        let hash = B256::from_str(&hash_str)
            .map_err(|_| sqlx::Error::Decode("Failed to decode B256".into()))?;

        Ok(Self(hash))
    }
}

impl<'q> sqlx::Encode<'q, Sqlite> for DbHash {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<'q, Sqlite>::encode(hex::encode_prefixed(self.0), buf)
    }
}

/// An account address stored as `0x`-prefixed lowercase hex `TEXT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DbAddress(Address);

impl Deref for DbAddress {
    type Target = Address;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Address> for DbAddress {
    fn from(value: Address) -> Self {
        Self(value)
    }
}

impl sqlx::Type<Sqlite> for DbAddress {
    fn type_info() -> <Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for DbAddress {
    fn decode(
        value: <Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let address_str: String = sqlx::decode::Decode::<'r, Sqlite>::decode(value)?;
        let address = Address::from_str(&address_str)
            .map_err(|_| sqlx::Error::Decode("Failed to decode Address".into()))?;

        Ok(Self(address))
    }
}

impl<'q> sqlx::Encode<'q, Sqlite> for DbAddress {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<'q, Sqlite>::encode(hex::encode_prefixed(self.0), buf)
    }
}

/// A slot stored as fixed-width hex `TEXT`.
///
/// Slots span the whole `u64` range which does not fit in SQLite's signed `INTEGER`. The fixed
/// width keeps the lexicographic order of the column equal to the numeric order of the slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DbSlot(Slot);

impl Deref for DbSlot {
    type Target = Slot;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Slot> for DbSlot {
    fn from(value: Slot) -> Self {
        Self(value)
    }
}

impl sqlx::Type<Sqlite> for DbSlot {
    fn type_info() -> <Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for DbSlot {
    fn decode(
        value: <Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let slot_hex: String = sqlx::decode::Decode::<'r, Sqlite>::decode(value)?;
        let slot = Slot::from_str_radix(&slot_hex, 16)
            .map_err(|_| sqlx::Error::Decode("Failed to decode slot".into()))?;

        Ok(Self(slot))
    }
}

impl<'q> sqlx::Encode<'q, Sqlite> for DbSlot {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<'q, Sqlite>::encode(format!("{:016x}", self.0), buf)
    }
}

/// The status of a coin stored as its canonical name in `TEXT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DbCoinStatus(CoinStatus);

impl Deref for DbCoinStatus {
    type Target = CoinStatus;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<CoinStatus> for DbCoinStatus {
    fn from(value: CoinStatus) -> Self {
        Self(value)
    }
}

impl sqlx::Type<Sqlite> for DbCoinStatus {
    fn type_info() -> <Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for DbCoinStatus {
    fn decode(
        value: <Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let status: String = sqlx::decode::Decode::<'r, Sqlite>::decode(value)?;
        let status = CoinStatus::from_str(&status)?;

        Ok(Self(status))
    }
}

impl<'q> sqlx::Encode<'q, Sqlite> for DbCoinStatus {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<'q, Sqlite>::encode(self.0.as_str(), buf)
    }
}
