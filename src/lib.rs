//! Plant-care authentication service
//!
//! Custody of an envelope-encrypted RSA signing key in MongoDB, RS256
//! token issuance and verification, and a role-based authorization gate,
//! fronted by a small HTTP API.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod keys;
pub mod routes;
pub mod server;
pub mod types;
pub mod users;

#[cfg(test)]
mod testutil;
