//! Constraint enforcement module.
//!
//! Row payloads are checked against their entity definition before a write
//! (required fields, column types, unknown columns), and against the stored
//! data inside the write transaction (primary key uniqueness, foreign keys).

mod validator;

pub use validator::ConstraintValidator;
