//! Credential and challenge engine.
//!
//! A login runs through the states of [`ChallengeState`]:
//!
//! ```text
//! PASSWORD ──start_login──▶ COMPLETE
//!     │
//!     └──▶ NEW_PASSWORD_REQUIRED ─┐
//!     └──▶ MFA_SETUP ─────────────┼─respond_to_challenge─▶ (next state, per provider)
//!     └──▶ SOFTWARE_TOKEN_MFA ────┘
//! ```
//!
//! Each step returns an [`AuthOutcome`]: either the issued [`TokenSet`] or
//! the next challenge with its [`Session`]. Plain login, MFA confirmation
//! and challenge responses are all entry points of the one
//! [`ChallengeEngine`].

mod engine;
mod types;

pub use engine::ChallengeEngine;
pub use types::{
    AuthOutcome, ChallengeResponses, ChallengeState, MfaSetup, Session, TokenSet, UserProfile,
};
