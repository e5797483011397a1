//! Confirmation Tokens (spec §4.4 / C4): the two-phase token-issue/confirm
//! protocol every sensitive publication action runs through.

pub mod model;
pub mod store;

pub use model::{ConfirmationRequest, RequestStatus};
pub use store::{TOKEN_TTL, TokenStore};
