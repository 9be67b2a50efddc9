//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod claims;
pub mod error;
pub mod i18n;
pub mod types;

pub use claims::{decode_claims, AccessClaims};
pub use error::{GymError, GymResult};
pub use i18n::{translate, Direction, Formatter, Locale};
pub use types::{
    AccessDecision, Credentials, Envelope, ErrorBody, LeaveRequest, LoginResponse, MemberDetails,
    MemberId, NewTicket, PendingScan, Role, RosterSnapshot, ScanOutcome, ScanResponse, ScanSource,
    Ticket, TicketCategory, TicketMessage, TicketStatus, User,
};
