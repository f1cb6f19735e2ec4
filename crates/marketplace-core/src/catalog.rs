//! Profiles, opportunities and volunteer applications.

use crate::error::{MarketplaceError, Result};
use crate::marketplace::Marketplace;
use crate::types::{
    new_id, Application, ApplicationStatus, Caller, InternshipListing, ListingStatus,
    NewInternship, NewOpportunity, Opportunity, UserProfile,
};
use chrono::Utc;
use tracing::info;

fn require_text(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MarketplaceError::InvalidInput(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

impl Marketplace {
    /// Set the caller's display name and email.
    pub async fn upsert_profile(&self, caller: &Caller, name: &str, email: &str) -> Result<UserProfile> {
        let name = require_text(name, "name")?;
        let email = require_text(email, "email")?;
        if !email.contains('@') {
            return Err(MarketplaceError::InvalidInput("email is malformed".into()));
        }

        let profile = UserProfile {
            id: caller.id.clone(),
            name,
            email,
            role: caller.role,
        };
        self.mutate(|data| {
            data.profiles.insert(profile.id.clone(), profile.clone());
            Ok(profile)
        })
        .await
    }

    pub async fn profile(&self, user: &str) -> Option<UserProfile> {
        self.read().await.profiles.get(user).cloned()
    }

    /// Publish an opportunity owned by the caller.
    pub async fn create_opportunity(&self, caller: &Caller, new: NewOpportunity) -> Result<Opportunity> {
        let title = require_text(&new.title, "title")?;
        if let (Some(start), Some(end)) = (new.start_date, new.end_date) {
            if end < start {
                return Err(MarketplaceError::InvalidInput(
                    "end_date is before start_date".into(),
                ));
            }
        }

        let opportunity = Opportunity {
            id: new_id(),
            organization: caller.id.clone(),
            title,
            kind: new.kind,
            description: new.description,
            location: new.location,
            start_date: new.start_date,
            end_date: new.end_date,
            status: ListingStatus::Open,
            created_at: Utc::now(),
        };

        let opportunity = self
            .mutate(|data| {
                data.opportunities
                    .insert(opportunity.id.clone(), opportunity.clone());
                Ok(opportunity)
            })
            .await?;

        info!(opportunity_id = %opportunity.id, organization = %caller.id, "Opportunity created");
        Ok(opportunity)
    }

    /// Apply to an open opportunity. One application per student.
    pub async fn apply_to_opportunity(&self, student: &str, opportunity_id: &str) -> Result<Application> {
        self.mutate(|data| {
            let opportunity = data
                .opportunities
                .get(opportunity_id)
                .ok_or_else(|| MarketplaceError::NotFound(format!("opportunity {}", opportunity_id)))?;
            if opportunity.status != ListingStatus::Open {
                return Err(MarketplaceError::InvalidTransition(
                    "opportunity is closed".into(),
                ));
            }
            if data
                .applications
                .values()
                .any(|a| a.student == student && a.opportunity == opportunity_id)
            {
                return Err(MarketplaceError::AlreadyAppliedToListing(
                    "already applied to this opportunity".into(),
                ));
            }

            let application = Application {
                id: new_id(),
                student: student.to_string(),
                opportunity: opportunity_id.to_string(),
                status: ApplicationStatus::Pending,
                applied_at: Utc::now(),
            };
            data.applications
                .insert(application.id.clone(), application.clone());
            Ok(application)
        })
        .await
    }

    /// Organization decision on a volunteer application.
    pub async fn set_application_status(
        &self,
        caller: &Caller,
        application_id: &str,
        status: ApplicationStatus,
    ) -> Result<Application> {
        if status == ApplicationStatus::Pending {
            return Err(MarketplaceError::InvalidTransition(
                "an application cannot be reset to pending".into(),
            ));
        }

        let application = self
            .mutate(|data| {
                let opportunity_id = data
                    .applications
                    .get(application_id)
                    .map(|a| a.opportunity.clone())
                    .ok_or_else(|| MarketplaceError::NotFound(format!("application {}", application_id)))?;
                let owner = data
                    .opportunities
                    .get(&opportunity_id)
                    .map(|o| o.organization.clone())
                    .ok_or_else(|| MarketplaceError::NotFound(format!("opportunity {}", opportunity_id)))?;
                if !caller.owns_or_admin(&owner) {
                    return Err(MarketplaceError::NotAuthorized(
                        "not the owner of this opportunity".into(),
                    ));
                }

                let application = data
                    .applications
                    .get_mut(application_id)
                    .ok_or_else(|| MarketplaceError::NotFound(format!("application {}", application_id)))?;
                application.status = status;
                Ok(application.clone())
            })
            .await?;

        info!(
            application_id = %application.id,
            status = ?application.status,
            "Application status updated"
        );
        Ok(application)
    }

    /// Publish an internship listing owned by the caller.
    pub async fn create_internship(&self, caller: &Caller, new: NewInternship) -> Result<InternshipListing> {
        let title = require_text(&new.title, "title")?;

        let listing = InternshipListing {
            id: new_id(),
            organization: caller.id.clone(),
            title,
            description: new.description,
            location: new.location,
            start_date: new.start_date,
            duration: new.duration,
            stipend: new.stipend,
            status: ListingStatus::Open,
            created_at: Utc::now(),
        };

        self.mutate(|data| {
            data.internships.insert(listing.id.clone(), listing.clone());
            Ok(listing)
        })
        .await
    }
}
