//! Milestone escrow ledger for a freelance gig marketplace
//!
//! This crate keeps gig money and gig state in lockstep:
//! - Gigs are posted with ordered milestones and per-milestone payments
//! - Accepting an application escrows the first payment with the platform
//! - Approving a milestone pays the freelancer and escrows the next one
//! - Rejecting a pending milestone terminates the engagement, moving nothing
//!
//! Collaborators (user directory, SMS notifier, artifact store) are injected
//! behind traits; notifications are best-effort and post-commit.

pub mod artifact_store;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notifier;
pub mod settings;

use error::EscrowError;

/// Result type alias for ledger operations
pub type EscrowResult<T> = Result<T, EscrowError>;
