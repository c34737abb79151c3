//! # Storage Module
//!
//! Local persistence for key material.
//!
//! Only private-key handles are persisted, through the [`KeyStore`] trait.
//! Conversation keys are never written anywhere unwrapped; they live in the
//! session cache (see [`crate::session`]) and die with it.

mod key_store;

pub use key_store::{KeyStore, MemoryKeyStore, SharedKeyHandle};
