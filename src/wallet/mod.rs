//! Wallet module for building and signing transactions

pub mod wallet;

pub use wallet::{create_transaction, Signer};
