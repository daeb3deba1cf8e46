//! Outbound adapters implementing the domain's driven ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel with `diesel-async`
//! - **memory**: in-process store used when no database is configured and as
//!   the integration-test double
//!
//! Adapters translate between storage and domain types. Settlement rules run
//! in the domain; adapters only provide the transaction around them.

pub mod memory;
pub mod persistence;
