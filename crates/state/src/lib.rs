//! The host-side account state consumed by the contract machine: a journaled
//! in-memory account map with stacked snapshots, plus a read-only view for
//! query execution.
//!
//! Contract code, its hash and its size live under reserved storage keys of
//! the owning account; contracts cannot write those keys through SSTORE.

pub mod account;
pub mod journal;
pub mod view;

pub use account::Account;
pub use journal::JournaledState;
pub use view::ViewState;

use helios_types::H256;
use std::sync::LazyLock;

/// Reserved storage key holding the contract bytecode.
pub static KEY_CODE: LazyLock<H256> = LazyLock::new(|| helios_crypto::keccak256(b"__CODE__"));

/// Reserved storage key holding the code hash.
pub static KEY_CODE_HASH: LazyLock<H256> =
    LazyLock::new(|| helios_crypto::keccak256(b"__CODEHASH__"));

/// Reserved storage key holding the code size (4 bytes, little-endian).
pub static KEY_CODE_SIZE: LazyLock<H256> =
    LazyLock::new(|| helios_crypto::keccak256(b"__CODESIZE__"));

/// Reserved storage key holding the dead flag.
pub static KEY_SUICIDE: LazyLock<H256> = LazyLock::new(|| helios_crypto::keccak256(b"__SUICIDE__"));

/// Whether `key` is reserved for the host and rejected by `set_state`.
pub fn is_reserved_key(key: &H256) -> bool {
    *key == *KEY_CODE || *key == *KEY_CODE_HASH || *key == *KEY_CODE_SIZE || *key == *KEY_SUICIDE
}
