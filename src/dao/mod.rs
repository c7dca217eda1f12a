/// In-memory round store used by the server and tests.
pub mod memory;
/// Snapshots returned by phase transitions.
pub mod models;
/// Phase transition and recovery capabilities.
pub mod round_store;
/// Storage abstraction layer for database operations.
pub mod storage;
