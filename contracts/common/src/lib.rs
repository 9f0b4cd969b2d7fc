//! Shared types and helpers for the sensor aggregation contracts.
//!
//! This crate provides:
//! - [`CommonError`]: error codes shared by every contract in the workspace.
//! - [`fhe`]: the opaque-arithmetic capability interface (`FheEngine`), the
//!   [`fhe::Handle`] type and the cleartext codec used on the decryption
//!   callback path.
//! - [`pausable`]: the global pause flag kept in instance storage.
//!
//! Contract-specific errors start at code **100** when they need their own
//! range; the aggregator reuses the codes below for its shared failures.

#![no_std]
#![allow(clippy::arithmetic_side_effects)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use soroban_sdk::contracterror;

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod fhe;
pub mod pausable;

pub use fhe::{FheEngine, FheEngineClient, Handle};

// ── Shared error enum ────────────────────────────────────────────────────────

/// Standardised error codes shared by the workspace contracts.
///
/// # Code ranges
/// | Range   | Purpose                       |
/// |---------|-------------------------------|
/// | 1 – 9   | Lifecycle / initialisation    |
/// | 10 – 19 | Authentication & authorisation|
/// | 30 – 39 | Validation / input            |
/// | 40 – 49 | Contract state                |
/// | 100+    | Reserved for contract-specific |
#[contracterror]
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
#[repr(u32)]
pub enum CommonError {
    /// No owner has been recorded yet.
    NotInitialized = 1,
    /// The caller does not hold the role the entry point requires.
    AccessDenied = 10,
    /// A cleartext payload did not have the expected word layout.
    MalformedCleartext = 30,
    /// The contract is currently paused and cannot process requests.
    Paused = 40,
}
