//! Core types for the marketplace.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque user identifier supplied by the upstream identity layer.
pub type UserId = String;

/// Role of the calling user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Ngo,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Ngo => write!(f, "ngo"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "ngo" => Ok(Role::Ngo),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of the resource, or an admin.
    pub fn owns_or_admin(&self, owner: &str) -> bool {
        self.is_admin() || self.id == owner
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Ledger status, recomputed after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Active,
    Exhausted,
    /// Reserved. Never assigned by this service.
    Expired,
}

/// Purchase recorded against a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Gateway payment id.
    pub payment_ref: String,
    pub order_id: String,
    /// Amount paid in minor units.
    pub amount: u64,
    pub currency: String,
    pub hours_added: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Prepaid hour balance for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourCreditLedger {
    pub student: UserId,
    pub total_hours: Decimal,
    pub hours_used: Decimal,
    pub status: LedgerStatus,
    /// Append-only purchase history.
    pub transactions: Vec<LedgerTransaction>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Hour logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Pending,
    Approved,
    Rejected,
}

/// A volunteering time entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourLogEntry {
    pub id: String,
    pub student: UserId,
    pub opportunity: String,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub description: String,
    pub status: LogStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_by: Option<UserId>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Hour log submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewHourLog {
    pub opportunity_id: String,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub description: String,
}

/// Smallest loggable amount of time (half an hour).
pub fn min_log_hours() -> Decimal {
    Decimal::new(5, 1)
}

impl NewHourLog {
    pub fn validate(&self) -> Result<(), String> {
        if self.opportunity_id.trim().is_empty() {
            return Err("opportunity_id is required".into());
        }
        if self.hours < min_log_hours() {
            return Err(format!("hours must be at least {}", min_log_hours()));
        }
        if self.description.trim().is_empty() {
            return Err("description is required".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityKind {
    #[default]
    Volunteering,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    /// Owning organization (NGO user id).
    pub organization: UserId,
    pub title: String,
    pub kind: OpportunityKind,
    pub description: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewOpportunity {
    pub title: String,
    #[serde(default)]
    pub kind: OpportunityKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

/// Volunteer application to an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub student: UserId,
    pub opportunity: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternshipListing {
    pub id: String,
    pub organization: UserId,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub duration: Option<String>,
    /// Monthly stipend in major units.
    pub stipend: Option<u64>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewInternship {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub stipend: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternshipStatus {
    Pending,
    SelectedPendingPayment,
    Hired,
    Rejected,
}

/// Settled payment attached to a gated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub order_id: String,
    pub transaction_id: String,
    /// Minor units.
    pub amount: u64,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternshipApplication {
    pub id: String,
    pub student: UserId,
    pub internship: String,
    pub status: InternshipStatus,
    #[serde(default)]
    pub payment: Option<PaymentDetails>,
    pub applied_at: DateTime<Utc>,
}

/// Purchasable certification course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub id: String,
    pub title: String,
    pub provider: Option<String>,
    pub description: String,
    /// Price in major units.
    pub price: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCertification {
    pub title: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificationStatus {
    Applied,
    Completed,
}

/// A student's certificate record, either purchased (`certification`) or
/// issued for volunteering (`opportunity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCertification {
    pub id: String,
    pub student: UserId,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub opportunity: Option<String>,
    pub status: CertificationStatus,
    #[serde(default)]
    pub payment: Option<PaymentDetails>,
    #[serde(default)]
    pub certificate_url: Option<String>,
    pub applied_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!(" NGO ".parse::<Role>().unwrap(), Role::Ngo);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_owns_or_admin() {
        let ngo = Caller::new("ngo-1", Role::Ngo);
        let admin = Caller::new("admin-1", Role::Admin);
        assert!(ngo.owns_or_admin("ngo-1"));
        assert!(!ngo.owns_or_admin("ngo-2"));
        assert!(admin.owns_or_admin("ngo-2"));
    }

    #[test]
    fn test_hour_log_validation() {
        let mut log = NewHourLog {
            opportunity_id: "opp".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            hours: Decimal::new(5, 1),
            description: "Tutoring".into(),
        };
        assert!(log.validate().is_ok());

        log.hours = Decimal::new(4, 1);
        assert!(log.validate().is_err());

        log.hours = Decimal::from(2);
        log.description = "   ".into();
        assert!(log.validate().is_err());
    }

    #[test]
    fn test_internship_status_wire_format() {
        let json = serde_json::to_string(&InternshipStatus::SelectedPendingPayment).unwrap();
        assert_eq!(json, "\"selected_pending_payment\"");
    }

    #[test]
    fn test_new_hour_log_accepts_numeric_hours() {
        let json = r#"{"opportunity_id":"o","date":"2024-03-01","hours":2.5,"description":"d"}"#;
        let log: NewHourLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.hours, Decimal::new(25, 1));
    }
}
