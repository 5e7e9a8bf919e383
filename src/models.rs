//! Core data models for the escrow ledger
//!
//! Records, status enums, and the lifecycle helpers for gigs, freelancer
//! applications, and active engagements. Balance mutation itself lives in the
//! ledger; these types only answer whether a transition is legal.

use crate::{error::EscrowError, EscrowResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Tolerance when comparing a gig's total payment to the milestone sum
pub const PAYMENT_TOLERANCE: f64 = 0.01;

/// Gig lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GigStatus {
    /// Listed and accepting applications
    Open,
    /// An application was accepted; no further applications
    Closed,
}

/// Application lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    /// Accepted and Rejected are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// Per-milestone approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    Pending,
    Approved,
}

/// Engagement lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementStatus {
    /// Work in progress
    Active,
    /// A pending milestone was rejected; the gig was re-listed
    Terminated,
    /// Last milestone approved and paid out
    Completed,
}

impl EngagementStatus {
    /// Terminated and Completed are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Completed)
    }
}

/// A unit of work posted by an employer, paid out per milestone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gig {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub skills_needed: Vec<String>,
    pub project_deadline: DateTime<Utc>,
    /// Ordered milestone descriptions
    pub milestones: Vec<String>,
    /// Payment per milestone, parallel to `milestones`
    pub milestone_payments: Vec<f64>,
    pub total_payment: f64,
    pub status: GigStatus,
    pub employer_id: String,
    pub created_at: DateTime<Utc>,
}

impl Gig {
    pub fn new(
        title: String,
        description: String,
        skills_needed: Vec<String>,
        project_deadline: DateTime<Utc>,
        milestones: Vec<String>,
        milestone_payments: Vec<f64>,
        total_payment: f64,
        employer_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            skills_needed,
            project_deadline,
            milestones,
            milestone_payments,
            total_payment,
            status: GigStatus::Open,
            employer_id,
            created_at: Utc::now(),
        }
    }

    /// Enforce the milestone shape invariants at creation time:
    /// at least one milestone, parallel payment list, and a total that
    /// matches the milestone sum within [`PAYMENT_TOLERANCE`].
    pub fn validate_milestones(
        milestones: &[String],
        milestone_payments: &[f64],
        total_payment: f64,
    ) -> EscrowResult<()> {
        if milestones.is_empty() {
            return Err(EscrowError::validation("At least one milestone is required"));
        }
        if milestones.len() != milestone_payments.len() {
            return Err(EscrowError::validation(format!(
                "Number of milestones ({}) must match number of milestone payments ({})",
                milestones.len(),
                milestone_payments.len()
            )));
        }
        // NaN compares false against everything, so finiteness is checked
        // explicitly before the sign and sum comparisons.
        if let Some(amount) = milestone_payments.iter().find(|p| !p.is_finite() || **p <= 0.0) {
            return Err(EscrowError::validation(format!(
                "Milestone payments must be positive finite amounts (got {amount})"
            )));
        }
        if !total_payment.is_finite() {
            return Err(EscrowError::validation(format!(
                "Total payment must be a finite amount (got {total_payment})"
            )));
        }
        let calculated: f64 = milestone_payments.iter().sum();
        if (calculated - total_payment).abs() > PAYMENT_TOLERANCE {
            return Err(EscrowError::validation(format!(
                "Total payment ({total_payment}) does not match sum of milestone payments ({calculated})"
            )));
        }
        Ok(())
    }
}

/// A freelancer's application to a gig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GigRequest {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub freelancer_id: String,
    /// Denormalized from the gig for participant queries
    pub employer_id: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl GigRequest {
    pub fn new(gig_id: Uuid, freelancer_id: String, employer_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            gig_id,
            freelancer_id,
            employer_id,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Error unless the request is still awaiting a decision
    pub fn ensure_pending(&self) -> EscrowResult<()> {
        if self.status != RequestStatus::Pending {
            return Err(EscrowError::already_processed(format!(
                "Request {} has already been {:?}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

/// The running engagement created when a request is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveGig {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub freelancer_id: String,
    pub employer_id: String,
    /// One entry per gig milestone, approved strictly in index order
    pub milestone_status: Vec<MilestoneStatus>,
    /// Submitted artifact links per milestone index; resubmission overwrites
    pub milestone_links: BTreeMap<usize, Vec<String>>,
    pub status: EngagementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActiveGig {
    /// Create the engagement for an accepted request, all milestones pending
    pub fn new(gig: &Gig, freelancer_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            gig_id: gig.id,
            freelancer_id,
            employer_id: gig.employer_id.clone(),
            milestone_status: vec![MilestoneStatus::Pending; gig.milestones.len()],
            milestone_links: BTreeMap::new(),
            status: EngagementStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn milestone_count(&self) -> usize {
        self.milestone_status.len()
    }

    /// Error unless the engagement is still running
    pub fn ensure_active(&self) -> EscrowResult<()> {
        if self.status != EngagementStatus::Active {
            return Err(EscrowError::invalid_state(
                format!("{:?}", self.status),
                "This gig is not active".to_string(),
            ));
        }
        Ok(())
    }

    /// Error unless `index` addresses an existing milestone
    pub fn ensure_index(&self, index: usize) -> EscrowResult<()> {
        if index >= self.milestone_status.len() {
            return Err(EscrowError::invalid_index(format!(
                "Milestone index {} out of range (0..{})",
                index,
                self.milestone_status.len()
            )));
        }
        Ok(())
    }

    /// Error unless every milestone before `index` is already approved
    pub fn ensure_prior_approved(&self, index: usize) -> EscrowResult<()> {
        for i in 0..index {
            if self.milestone_status[i] != MilestoneStatus::Approved {
                return Err(EscrowError::invalid_index(format!(
                    "Milestone {i} must be approved before milestone {index}"
                )));
            }
        }
        Ok(())
    }

    /// Error unless links were submitted for `index`
    pub fn ensure_submitted(&self, index: usize) -> EscrowResult<()> {
        if !self.milestone_links.contains_key(&index) {
            return Err(EscrowError::invalid_state(
                format!("{:?}", self.milestone_status[index]),
                format!("Milestone {index} has not been submitted yet"),
            ));
        }
        Ok(())
    }

    /// Error if the milestone was already approved (and paid)
    pub fn ensure_not_approved(&self, index: usize) -> EscrowResult<()> {
        if self.milestone_status[index] == MilestoneStatus::Approved {
            return Err(EscrowError::already_processed(format!(
                "Milestone {index} is already approved"
            )));
        }
        Ok(())
    }

    pub fn is_last_milestone(&self, index: usize) -> bool {
        index + 1 == self.milestone_status.len()
    }
}

/// A user's funds account, created lazily at zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: String,
    pub amount: f64,
}

impl Balance {
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            amount: 0.0,
        }
    }
}

/// The single platform escrow account holding funds between
/// employer debit and freelancer credit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyBalance {
    pub amount: f64,
    pub last_updated: DateTime<Utc>,
}

impl Default for CompanyBalance {
    fn default() -> Self {
        Self {
            amount: 0.0,
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_gig() -> Gig {
        Gig::new(
            "Landing page".to_string(),
            "Two-step build".to_string(),
            vec!["design".to_string(), "react".to_string()],
            Utc::now(),
            vec!["design".to_string(), "build".to_string()],
            vec![100.0, 200.0],
            300.0,
            "emp_1".to_string(),
        )
    }

    #[test]
    fn new_gig_starts_open() {
        let gig = sample_gig();
        assert_eq!(gig.status, GigStatus::Open);
        assert_eq!(gig.milestones.len(), gig.milestone_payments.len());
    }

    #[test]
    fn milestone_validation_rejects_bad_shapes() {
        assert!(Gig::validate_milestones(&[], &[], 0.0).is_err());
        assert!(Gig::validate_milestones(
            &["a".to_string(), "b".to_string()],
            &[100.0],
            100.0
        )
        .is_err());
        assert!(Gig::validate_milestones(&["a".to_string()], &[0.0], 0.0).is_err());
        // sum mismatch beyond tolerance
        let err =
            Gig::validate_milestones(&["a".to_string(), "b".to_string()], &[100.0, 200.0], 350.0)
                .unwrap_err();
        assert!(matches!(err, EscrowError::Validation(_)));
        // within tolerance passes
        assert!(Gig::validate_milestones(
            &["a".to_string(), "b".to_string()],
            &[100.0, 200.0],
            300.005
        )
        .is_ok());
    }

    #[test]
    fn milestone_validation_rejects_non_finite_amounts() {
        // NaN slips through plain comparisons, so it needs its own check
        assert!(matches!(
            Gig::validate_milestones(
                &["a".to_string(), "b".to_string()],
                &[f64::NAN, 200.0],
                300.0
            ),
            Err(EscrowError::Validation(_))
        ));
        assert!(matches!(
            Gig::validate_milestones(&["a".to_string()], &[f64::INFINITY], f64::INFINITY),
            Err(EscrowError::Validation(_))
        ));
        assert!(matches!(
            Gig::validate_milestones(&["a".to_string()], &[100.0], f64::NAN),
            Err(EscrowError::Validation(_))
        ));
    }

    #[test]
    fn active_gig_initializes_all_pending() {
        let gig = sample_gig();
        let active = ActiveGig::new(&gig, "fre_1".to_string());
        assert_eq!(active.status, EngagementStatus::Active);
        assert_eq!(active.milestone_status, vec![MilestoneStatus::Pending; 2]);
        assert!(active.milestone_links.is_empty());
        assert_eq!(active.employer_id, "emp_1");
    }

    #[test]
    fn sequential_order_helpers() {
        let gig = sample_gig();
        let mut active = ActiveGig::new(&gig, "fre_1".to_string());
        assert!(active.ensure_prior_approved(0).is_ok());
        assert!(matches!(
            active.ensure_prior_approved(1),
            Err(EscrowError::InvalidIndex(_))
        ));
        active.milestone_status[0] = MilestoneStatus::Approved;
        assert!(active.ensure_prior_approved(1).is_ok());
        assert!(matches!(
            active.ensure_not_approved(0),
            Err(EscrowError::AlreadyProcessed(_))
        ));
        assert!(matches!(
            active.ensure_index(2),
            Err(EscrowError::InvalidIndex(_))
        ));
    }

    #[test]
    fn status_wire_format_matches_store() {
        assert_eq!(serde_json::to_string(&GigStatus::Open).unwrap(), "\"OPEN\"");
        assert_eq!(
            serde_json::to_string(&EngagementStatus::Terminated).unwrap(),
            "\"TERMINATED\""
        );
        assert_eq!(
            serde_json::to_string(&RequestStatus::Pending).unwrap(),
            "\"PENDING\""
        );
    }

    #[test]
    fn link_map_serializes_with_string_keys() {
        let gig = sample_gig();
        let mut active = ActiveGig::new(&gig, "fre_1".to_string());
        active
            .milestone_links
            .insert(0, vec!["http://a".to_string()]);
        let json = serde_json::to_value(&active).unwrap();
        assert_eq!(json["milestone_links"]["0"][0], "http://a");
    }
}
