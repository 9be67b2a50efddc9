//! Domain types for the gymdesk client toolkit.

use crate::error::{GymError, GymResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// The `{ "data": ... }` wrapper every successful backend response uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Error body returned on non-2xx responses.
///
/// `detail` is usually a string, but request validation failures carry a
/// list of `{ loc, msg, type }` objects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Flattens `detail` into one displayable line, if there is one.
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                (!msgs.is_empty()).then(|| msgs.join("; "))
            }
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Form checks run before anything goes over the wire.
    pub fn validate(&self) -> GymResult<()> {
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(GymError::Validation("Enter a valid email address".into())),
        }
        if self.password.is_empty() {
            return Err(GymError::Validation("Password is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
}

fn bearer() -> String {
    "bearer".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Manager,
    Coach,
    Employee,
    Cashier,
    Reception,
    FrontDesk,
    Customer,
    Other(String),
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ADMIN" => Self::Admin,
            "MANAGER" => Self::Manager,
            "COACH" => Self::Coach,
            "EMPLOYEE" => Self::Employee,
            "CASHIER" => Self::Cashier,
            "RECEPTION" => Self::Reception,
            "FRONT_DESK" => Self::FrontDesk,
            "CUSTOMER" => Self::Customer,
            _ => Self::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        match r {
            Role::Admin => "ADMIN".into(),
            Role::Manager => "MANAGER".into(),
            Role::Coach => "COACH".into(),
            Role::Employee => "EMPLOYEE".into(),
            Role::Cashier => "CASHIER".into(),
            Role::Reception => "RECEPTION".into(),
            Role::FrontDesk => "FRONT_DESK".into(),
            Role::Customer => "CUSTOMER".into(),
            Role::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: MemberId,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Members and roster
// ---------------------------------------------------------------------------

/// Opaque member/user identifier.
///
/// The backend emits UUID strings, while older tokens carry integer
/// subjects; both normalise to the same string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl<'de> Deserialize<'de> for MemberId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => MemberId(s),
            Raw::Int(n) => MemberId(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDetails {
    pub id: MemberId,
    pub full_name: String,
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(default)]
    pub subscription_end_date: Option<NaiveDate>,
}

/// Last-synced view of who may enter while the scan endpoint is unreachable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub active_members: Vec<MemberId>,
    #[serde(default)]
    pub details: HashMap<MemberId, MemberDetails>,
}

impl RosterSnapshot {
    /// Builds a snapshot from the flat member list the roster endpoint returns.
    pub fn from_members(members: Vec<MemberDetails>) -> Self {
        let active_members = members.iter().map(|m| m.id.clone()).collect();
        let details = members.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self {
            active_members,
            details,
        }
    }

    pub fn is_active(&self, id: &MemberId) -> bool {
        self.active_members.contains(id)
    }

    pub fn details(&self, id: &MemberId) -> Option<&MemberDetails> {
        self.details.get(id)
    }

    pub fn len(&self) -> usize {
        self.active_members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_members.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// A scan submission that could not reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingScan {
    pub token: String,
    pub kiosk_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessDecision {
    Granted,
    Denied,
    AlreadyScanned,
}

impl AccessDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "GRANTED",
            Self::Denied => "DENIED",
            Self::AlreadyScanned => "ALREADY_SCANNED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    Online,
    Offline,
}

/// Wire shape of `POST /access/scan`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanResponse {
    pub status: AccessDecision,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub member_id: Option<MemberId>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// What the kiosk shows after one scan, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub decision: AccessDecision,
    pub source: ScanSource,
    pub member_id: Option<MemberId>,
    pub member_name: Option<String>,
    pub reason: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanOutcome {
    pub fn online(resp: ScanResponse, scanned_at: DateTime<Utc>) -> Self {
        Self {
            decision: resp.status,
            source: ScanSource::Online,
            member_id: resp.member_id,
            member_name: resp.user_name,
            reason: resp.reason,
            scanned_at,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.decision == AccessDecision::Granted
    }
}

// ---------------------------------------------------------------------------
// Support tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// `OPEN -> IN_PROGRESS -> RESOLVED | CLOSED`; resolved tickets may be
    /// reopened or closed; closed is terminal.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, Resolved)
                | (Open, Closed)
                | (InProgress, Resolved)
                | (InProgress, Closed)
                | (Resolved, Closed)
                | (Resolved, Open)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "IN_PROGRESS" => Some(Self::InProgress),
            "RESOLVED" => Some(Self::Resolved),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    General,
    Technical,
    Billing,
    Subscription,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Technical => "TECHNICAL",
            Self::Billing => "BILLING",
            Self::Subscription => "SUBSCRIPTION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GENERAL" => Some(Self::General),
            "TECHNICAL" => Some(Self::Technical),
            "BILLING" => Some(Self::Billing),
            "SUBSCRIPTION" => Some(Self::Subscription),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: String,
    pub sender_id: MemberId,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub category: TicketCategory,
    pub status: TicketStatus,
    pub customer_id: MemberId,
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
    pub created_at: DateTime<Utc>,
}

const MAX_SUBJECT_LEN: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct NewTicket {
    pub subject: String,
    pub category: TicketCategory,
    pub message: String,
}

impl NewTicket {
    pub fn validate(&self) -> GymResult<()> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(GymError::Validation("Subject is required".into()));
        }
        if subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(GymError::Validation(format!(
                "Subject must be at most {MAX_SUBJECT_LEN} characters"
            )));
        }
        if self.message.trim().is_empty() {
            return Err(GymError::Validation("Message is required".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: String,
    pub user_id: MemberId,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_id_accepts_strings_and_integers() {
        let a: MemberId = serde_json::from_str("\"3f2a\"").unwrap();
        let b: MemberId = serde_json::from_str("42").unwrap();
        assert_eq!(a, MemberId::new("3f2a"));
        assert_eq!(b, MemberId::new("42"));
    }

    #[test]
    fn error_body_flattens_validation_list() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"detail":[{"loc":["body","email"],"msg":"field required","type":"missing"},
                          {"loc":["body","password"],"msg":"too short","type":"value_error"}]}"#,
        )
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("field required; too short"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail":"Invalid credentials"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Invalid credentials"));

        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.message(), None);
    }

    #[test]
    fn credentials_validation() {
        assert!(Credentials::new("admin@gym-erp.com", "password123")
            .validate()
            .is_ok());
        assert!(matches!(
            Credentials::new("admin", "x").validate(),
            Err(GymError::Validation(_))
        ));
        assert!(matches!(
            Credentials::new("@gym-erp.com", "x").validate(),
            Err(GymError::Validation(_))
        ));
        assert!(matches!(
            Credentials::new("admin@gym-erp.com", "").validate(),
            Err(GymError::Validation(_))
        ));
    }

    #[test]
    fn ticket_lifecycle() {
        use TicketStatus::*;
        assert!(Open.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(Resolved.can_transition_to(Open));
        assert!(!Closed.can_transition_to(Open));
        assert!(!InProgress.can_transition_to(Open));
        assert!(!Open.can_transition_to(Open));
    }

    #[test]
    fn new_ticket_validation() {
        let mut t = NewTicket {
            subject: "Locker broken".into(),
            category: TicketCategory::Technical,
            message: "Locker 12 does not close".into(),
        };
        assert!(t.validate().is_ok());

        t.subject = "   ".into();
        assert!(t.validate().is_err());

        t.subject = "x".repeat(201);
        assert!(t.validate().is_err());
    }

    #[test]
    fn role_roundtrips_unknown_values() {
        let r: Role = serde_json::from_str("\"FRONT_DESK\"").unwrap();
        assert_eq!(r, Role::FrontDesk);
        let r: Role = serde_json::from_str("\"JANITOR\"").unwrap();
        assert_eq!(r, Role::Other("JANITOR".into()));
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"JANITOR\"");
    }

    #[test]
    fn roster_from_members() {
        let snap = RosterSnapshot::from_members(vec![MemberDetails {
            id: MemberId::new("m1"),
            full_name: "Lina Haddad".into(),
            subscription_status: Some("ACTIVE".into()),
            subscription_end_date: None,
        }]);
        assert_eq!(snap.active_members, vec![MemberId::new("m1")]);
        assert_eq!(snap.details[&MemberId::new("m1")].full_name, "Lina Haddad");
    }
}
