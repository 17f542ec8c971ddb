//! Repository-style access to the SQLite store.
//!
//! Read functions take the pool; write functions take the caller's
//! transaction so each logical write commits as one atomic unit.

pub mod routes;
pub mod runs;
pub mod special_days;
pub mod stops;
