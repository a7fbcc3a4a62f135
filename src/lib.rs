//! loobook — a bathroom slot-booking server speaking the Postgres wire
//! protocol.
//!
//! One shared bathroom, one schedule: bookings are half-open millisecond
//! intervals that must not overlap, with back-to-back slots explicitly
//! allowed. All state lives in memory, made durable by an append-only WAL
//! replayed on startup. Any Postgres client can connect and manage bookings
//! through a small SQL surface over the `bookings` table.

pub mod auth;
pub mod compactor;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod reminder;
pub mod sql;
pub mod tls;
pub mod wal;
pub mod wire;
