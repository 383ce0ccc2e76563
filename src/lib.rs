//! # leaguedesk
//!
//! Multi-tenant account lifecycle service for leagues (tenants) and the
//! coaches that belong to them.
//!
//! ## Lifecycle model
//!
//! A league or coach row is always in exactly one of three states:
//! `Pending` (initial), `Validated`, or `Rejected` (terminal, modeled as
//! row deletion with no tombstone). Every transition is performed as a
//! single guarded conditional write whose affected-row count is the only
//! concurrency primitive: the precondition travels inside the `UPDATE`
//! itself, so of two racing transitions exactly one wins and the loser
//! observes zero affected rows.
//!
//! ## Credential workflow
//!
//! - League approval/rejection is authorized by signed, stateless action
//!   tokens embedded in email links sent to the administration.
//! - Coach approval/rejection is performed by the owning league's
//!   authenticated admin, with the tenant scope embedded in the guard.
//! - Validation and password reset generate a one-time password that is
//!   hashed before the guarded write and mailed exactly once afterwards.
//! - Notifications are dispatched strictly after the state change has
//!   committed; a delivery failure is logged and never rolls it back.

pub mod api;
pub mod cli;
pub mod lifecycle;
pub mod tokens;
