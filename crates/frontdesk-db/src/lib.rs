//! Database layer for the frontdesk booking ledger.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Every durable table — users, appointments,
//! call summaries — is created through versioned migrations managed here.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single shared calendar served by one
//!   process needs no external database. WAL allows concurrent readers
//!   alongside the single writer, which matches the access pattern of many
//!   live call sessions reading availability while bookings commit.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the code that depends on it
//!   and cannot drift.
//! - **Timestamps as RFC 3339 UTC text**: one fixed format (see
//!   `frontdesk-types`) makes interval comparisons valid on the raw strings,
//!   which the appointment overlap re-check relies on.

mod migrations;
mod pool;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool, DbSettings};
