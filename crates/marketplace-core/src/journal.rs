//! Hour-log journal.
//!
//! Submitting a log reserves its hours on the student's ledger straight
//! away. Approval keeps the reservation; rejection gives it back, whether
//! or not the log had been approved.

use crate::error::{MarketplaceError, Result};
use crate::ledger;
use crate::marketplace::Marketplace;
use crate::store::MarketplaceData;
use crate::types::{new_id, ApplicationStatus, Caller, HourLogEntry, LogStatus, NewHourLog};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

fn has_accepted_application(data: &MarketplaceData, student: &str, opportunity: &str) -> bool {
    data.applications.values().any(|a| {
        a.student == student
            && a.opportunity == opportunity
            && a.status == ApplicationStatus::Accepted
    })
}

/// Owner of the log's opportunity, or an admin.
fn authorize_reviewer(data: &MarketplaceData, caller: &Caller, opportunity: &str) -> Result<()> {
    let opportunity = data
        .opportunities
        .get(opportunity)
        .ok_or_else(|| MarketplaceError::NotFound(format!("opportunity {}", opportunity)))?;
    if !caller.owns_or_admin(&opportunity.organization) {
        return Err(MarketplaceError::NotAuthorized(
            "not the owner of this opportunity".into(),
        ));
    }
    Ok(())
}

fn find_log(data: &MarketplaceData, log_id: &str) -> Result<HourLogEntry> {
    data.hour_logs
        .get(log_id)
        .cloned()
        .ok_or_else(|| MarketplaceError::NotFound(format!("hour log {}", log_id)))
}

fn set_review(
    data: &mut MarketplaceData,
    log_id: &str,
    status: LogStatus,
    reviewer: &Caller,
) -> Result<HourLogEntry> {
    let entry = data
        .hour_logs
        .get_mut(log_id)
        .ok_or_else(|| MarketplaceError::NotFound(format!("hour log {}", log_id)))?;
    entry.status = status;
    entry.reviewed_by = Some(reviewer.id.clone());
    entry.reviewed_at = Some(Utc::now());
    Ok(entry.clone())
}

pub(crate) fn approved_hours(data: &MarketplaceData, student: &str, opportunity: &str) -> Decimal {
    data.hour_logs
        .values()
        .filter(|l| {
            l.student == student && l.opportunity == opportunity && l.status == LogStatus::Approved
        })
        .map(|l| l.hours)
        .sum()
}

fn newest_first(logs: &mut [HourLogEntry]) {
    logs.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
}

impl Marketplace {
    /// Record volunteering time and reserve it on the ledger.
    ///
    /// Checks run in order: input, eligibility, balance. The debit and the
    /// new entry are written together or not at all.
    pub async fn submit_hours(&self, student: &str, log: NewHourLog) -> Result<HourLogEntry> {
        log.validate().map_err(MarketplaceError::InvalidInput)?;

        let entry = self
            .mutate(|data| {
                if !has_accepted_application(data, student, &log.opportunity_id) {
                    return Err(MarketplaceError::NotEligible(
                        "no accepted application for this opportunity".into(),
                    ));
                }

                ledger::debit(data, student, log.hours)?;

                let entry = HourLogEntry {
                    id: new_id(),
                    student: student.to_string(),
                    opportunity: log.opportunity_id.clone(),
                    date: log.date,
                    hours: log.hours,
                    description: log.description.trim().to_string(),
                    status: LogStatus::Pending,
                    created_at: Utc::now(),
                    reviewed_by: None,
                    reviewed_at: None,
                };
                data.hour_logs.insert(entry.id.clone(), entry.clone());
                Ok(entry)
            })
            .await?;

        info!(
            student = %student,
            log_id = %entry.id,
            hours = %entry.hours,
            "Hours logged"
        );
        Ok(entry)
    }

    /// Approve a pending log. Approving an approved log changes nothing.
    pub async fn approve_log(&self, caller: &Caller, log_id: &str) -> Result<HourLogEntry> {
        self.mutate(|data| {
            let log = find_log(data, log_id)?;
            authorize_reviewer(data, caller, &log.opportunity)?;

            match log.status {
                LogStatus::Approved => Ok(log),
                LogStatus::Rejected => Err(MarketplaceError::InvalidTransition(
                    "a rejected log cannot be approved".into(),
                )),
                LogStatus::Pending => {
                    let entry = set_review(data, log_id, LogStatus::Approved, caller)?;
                    info!(log_id = %log_id, reviewer = %caller.id, "Hour log approved");
                    Ok(entry)
                }
            }
        })
        .await
    }

    /// Reject a pending or approved log and refund its hours exactly once.
    pub async fn reject_log(&self, caller: &Caller, log_id: &str) -> Result<HourLogEntry> {
        self.mutate(|data| {
            let log = find_log(data, log_id)?;
            authorize_reviewer(data, caller, &log.opportunity)?;

            match log.status {
                LogStatus::Rejected => Err(MarketplaceError::AlreadyRejected),
                LogStatus::Pending | LogStatus::Approved => {
                    let entry = set_review(data, log_id, LogStatus::Rejected, caller)?;
                    ledger::refund(data, &log.student, log.hours);
                    info!(
                        log_id = %log_id,
                        reviewer = %caller.id,
                        refunded = %log.hours,
                        "Hour log rejected"
                    );
                    Ok(entry)
                }
            }
        })
        .await
    }

    /// Sum of approved hours for a student on one opportunity.
    pub async fn total_approved_hours(&self, student: &str, opportunity: &str) -> Decimal {
        approved_hours(&*self.read().await, student, opportunity)
    }

    /// Sum of approved hours for a student across all opportunities.
    pub async fn approved_hours_for_student(&self, student: &str) -> Decimal {
        self.read()
            .await
            .hour_logs
            .values()
            .filter(|l| l.student == student && l.status == LogStatus::Approved)
            .map(|l| l.hours)
            .sum()
    }

    pub async fn logs_for_student(&self, student: &str) -> Vec<HourLogEntry> {
        let data = self.read().await;
        let mut logs: Vec<_> = data
            .hour_logs
            .values()
            .filter(|l| l.student == student)
            .cloned()
            .collect();
        newest_first(&mut logs);
        logs
    }

    /// Logs submitted against any opportunity the organization owns.
    pub async fn logs_for_organization(&self, organization: &str) -> Vec<HourLogEntry> {
        let data = self.read().await;
        let mut logs: Vec<_> = data
            .hour_logs
            .values()
            .filter(|l| {
                data.opportunities
                    .get(&l.opportunity)
                    .is_some_and(|o| o.organization == organization)
            })
            .cloned()
            .collect();
        newest_first(&mut logs);
        logs
    }
}
