//! Escrow ledger - Funds movement in lockstep with the milestone lifecycle
//!
//! This module coordinates the gig/request/engagement state machine and the
//! balance transfers between employer, company escrow, and freelancer. Every
//! operation takes the state-wide write lock once, validates fully, and only
//! then mutates, so a failing operation leaves no partial balance change
//! behind and two racing calls serialize cleanly. Notifications go out after
//! the mutation is committed and are best-effort.

use crate::{
    artifact_store::{is_url, ArtifactStore, ArtifactUpload},
    directory::{Role, UserDirectory, UserProfile},
    error::EscrowError,
    models::{
        ActiveGig, Balance, CompanyBalance, EngagementStatus, Gig, GigRequest, GigStatus,
        MilestoneStatus, RequestStatus,
    },
    notifier::{
        self, Notifier,
    },
    EscrowResult,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Configuration for the escrow ledger
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on milestones per gig
    pub max_milestones: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { max_milestones: 50 }
    }
}

/// Gig creation input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGigRequest {
    pub title: String,
    pub description: String,
    pub skills_needed: Vec<String>,
    pub project_deadline: chrono::DateTime<Utc>,
    pub milestones: Vec<String>,
    pub milestone_payments: Vec<f64>,
    pub total_payment: f64,
    pub employer_id: String,
}

/// Freelancer application input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyToGigRequest {
    pub gig_id: Uuid,
    pub freelancer_id: String,
}

/// Milestone submission input: bare links plus optional uploaded files
#[derive(Debug, Clone)]
pub struct SubmitMilestoneRequest {
    pub active_gig_id: Uuid,
    pub milestone_index: usize,
    pub links: Vec<String>,
    pub files: Vec<ArtifactUpload>,
}

/// Listing filter for open-market gig queries
#[derive(Debug, Clone)]
pub struct GigFilter {
    /// Case-insensitive substring match on the title
    pub title: Option<String>,
    /// Every listed skill must appear in the gig's skill tags
    pub skills: Vec<String>,
    pub min_payment: Option<f64>,
    pub max_payment: Option<f64>,
    pub status: Option<GigStatus>,
}

impl Default for GigFilter {
    fn default() -> Self {
        Self {
            title: None,
            skills: Vec::new(),
            min_payment: None,
            max_payment: None,
            status: Some(GigStatus::Open),
        }
    }
}

/// Read-only snapshot of an engagement's submissions
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneLinksReport {
    pub active_gig_id: Uuid,
    pub gig_id: Uuid,
    pub gig_title: String,
    pub gig_milestones: Vec<String>,
    pub milestone_links: std::collections::BTreeMap<usize, Vec<String>>,
    pub milestone_status: Vec<MilestoneStatus>,
    pub milestone_count: usize,
}

/// All ledger-owned records. One write guard over this struct is the
/// transaction boundary for every funds-moving operation.
#[derive(Default)]
struct LedgerState {
    gigs: HashMap<Uuid, Gig>,
    requests: HashMap<Uuid, GigRequest>,
    active_gigs: HashMap<Uuid, ActiveGig>,
    balances: HashMap<String, Balance>,
    company_balance: CompanyBalance,
}

impl LedgerState {
    fn gig(&self, id: Uuid) -> EscrowResult<&Gig> {
        self.gigs
            .get(&id)
            .ok_or_else(|| EscrowError::not_found(format!("Gig {id} not found")))
    }

    fn gig_mut(&mut self, id: Uuid) -> EscrowResult<&mut Gig> {
        self.gigs
            .get_mut(&id)
            .ok_or_else(|| EscrowError::not_found(format!("Gig {id} not found")))
    }

    fn request_mut(&mut self, id: Uuid) -> EscrowResult<&mut GigRequest> {
        self.requests
            .get_mut(&id)
            .ok_or_else(|| EscrowError::not_found(format!("Gig request {id} not found")))
    }

    fn active_gig(&self, id: Uuid) -> EscrowResult<&ActiveGig> {
        self.active_gigs
            .get(&id)
            .ok_or_else(|| EscrowError::not_found(format!("Active gig {id} not found")))
    }

    fn active_gig_mut(&mut self, id: Uuid) -> EscrowResult<&mut ActiveGig> {
        self.active_gigs
            .get_mut(&id)
            .ok_or_else(|| EscrowError::not_found(format!("Active gig {id} not found")))
    }

    fn user_amount(&self, user_id: &str) -> f64 {
        self.balances.get(user_id).map(|b| b.amount).unwrap_or(0.0)
    }

    /// Credit a user balance, creating the account lazily
    fn credit(&mut self, user_id: &str, amount: f64) {
        self.balances
            .entry(user_id.to_string())
            .or_insert_with(|| Balance::new(user_id.to_string()))
            .amount += amount;
    }

    /// Debit a user balance. Callers check sufficiency before mutating.
    fn debit(&mut self, user_id: &str, amount: f64) {
        self.balances
            .entry(user_id.to_string())
            .or_insert_with(|| Balance::new(user_id.to_string()))
            .amount -= amount;
    }
}

/// Main escrow ledger with its injected collaborators
pub struct EscrowLedger {
    config: LedgerConfig,
    state: Arc<RwLock<LedgerState>>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl EscrowLedger {
    pub fn new(
        config: LedgerConfig,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(LedgerState::default())),
            directory,
            notifier,
            artifacts,
        }
    }

    // ---- gig posting and applications ----

    /// Create a new gig post by an employer
    pub async fn create_gig(&self, request: CreateGigRequest) -> EscrowResult<Gig> {
        let employer = self.directory.lookup(&request.employer_id).await?;
        if employer.role != Role::Employer {
            return Err(EscrowError::invalid_state(
                format!("{:?}", employer.role),
                "Only employers can create gigs".to_string(),
            ));
        }

        Gig::validate_milestones(
            &request.milestones,
            &request.milestone_payments,
            request.total_payment,
        )?;
        if request.milestones.len() > self.config.max_milestones {
            return Err(EscrowError::validation(format!(
                "At most {} milestones are supported",
                self.config.max_milestones
            )));
        }

        let gig = Gig::new(
            request.title,
            request.description,
            request.skills_needed,
            request.project_deadline,
            request.milestones,
            request.milestone_payments,
            request.total_payment,
            request.employer_id,
        );

        info!(gig_id = %gig.id, title = %gig.title, "Created gig");
        self.state.write().await.gigs.insert(gig.id, gig.clone());
        Ok(gig)
    }

    /// Freelancer application against an open gig
    pub async fn apply_to_gig(&self, request: ApplyToGigRequest) -> EscrowResult<GigRequest> {
        let freelancer = self.directory.lookup(&request.freelancer_id).await?;
        if freelancer.role != Role::Freelancer {
            return Err(EscrowError::invalid_state(
                format!("{:?}", freelancer.role),
                "Only freelancers can apply for gigs".to_string(),
            ));
        }

        let (gig_request, gig_title, employer_id) = {
            let mut state = self.state.write().await;
            let gig = state.gig(request.gig_id)?;
            if gig.status != GigStatus::Open {
                return Err(EscrowError::invalid_state(
                    format!("{:?}", gig.status),
                    "This gig is not open for applications".to_string(),
                ));
            }
            let duplicate = state.requests.values().any(|r| {
                r.gig_id == request.gig_id && r.freelancer_id == request.freelancer_id
            });
            if duplicate {
                return Err(EscrowError::already_processed(
                    "You have already applied for this gig",
                ));
            }

            let gig_title = gig.title.clone();
            let employer_id = gig.employer_id.clone();
            let gig_request = GigRequest::new(
                request.gig_id,
                request.freelancer_id.clone(),
                employer_id.clone(),
            );
            state.requests.insert(gig_request.id, gig_request.clone());
            (gig_request, gig_title, employer_id)
        };

        info!(request_id = %gig_request.id, gig_id = %request.gig_id, "Created gig request");
        if let Ok(employer) = self.directory.lookup(&employer_id).await {
            self.send(
                &employer,
                notifier::employer_new_request_message(&freelancer.display_name, &gig_title),
            )
            .await;
        }
        Ok(gig_request)
    }

    // ---- escrow operations ----

    /// Accept a pending request: close the gig, escrow the first milestone
    /// payment from the employer into the company account, and create the
    /// engagement.
    pub async fn accept_request(
        &self,
        request_id: Uuid,
        payment_verified: bool,
    ) -> EscrowResult<ActiveGig> {
        let (active, gig_title, employer_id, freelancer_id) = {
            let mut state = self.state.write().await;

            let request = state.request_mut(request_id)?;
            request.ensure_pending()?;
            if !payment_verified {
                return Err(EscrowError::payment_verification_required(
                    "Payment verification is required to accept a request",
                ));
            }
            let gig_id = request.gig_id;
            let freelancer_id = request.freelancer_id.clone();
            let employer_id = request.employer_id.clone();

            let (first_payment, gig_title) = {
                let gig = state.gig(gig_id)?;
                if gig.status != GigStatus::Open {
                    return Err(EscrowError::invalid_state(
                        format!("{:?}", gig.status),
                        "This gig already has an accepted request".to_string(),
                    ));
                }
                (gig.milestone_payments[0], gig.title.clone())
            };

            if state.user_amount(&employer_id) < first_payment {
                return Err(EscrowError::insufficient_funds(format!(
                    "Insufficient balance to pay for the first milestone (${first_payment})"
                )));
            }

            // All checks passed; apply the whole transition.
            state.request_mut(request_id)?.status = RequestStatus::Accepted;
            state.gig_mut(gig_id)?.status = GigStatus::Closed;
            state.debit(&employer_id, first_payment);
            state.company_balance.amount += first_payment;
            state.company_balance.last_updated = Utc::now();

            let active = {
                let gig = state.gig(gig_id)?;
                ActiveGig::new(gig, freelancer_id.clone())
            };
            state.active_gigs.insert(active.id, active.clone());
            (active, gig_title, employer_id, freelancer_id)
        };

        info!(active_gig_id = %active.id, gig_id = %active.gig_id, "Accepted gig request");
        if let (Ok(employer), Ok(freelancer)) = (
            self.directory.lookup(&employer_id).await,
            self.directory.lookup(&freelancer_id).await,
        ) {
            self.send(
                &freelancer,
                notifier::request_accepted_message(&gig_title, &employer.display_name),
            )
            .await;
        }
        Ok(active)
    }

    /// Reject a pending request. No funds move and no engagement is created.
    pub async fn reject_request(&self, request_id: Uuid) -> EscrowResult<GigRequest> {
        let (rejected, gig_id) = {
            let mut state = self.state.write().await;
            let request = state.request_mut(request_id)?;
            request.ensure_pending()?;
            request.status = RequestStatus::Rejected;
            (request.clone(), request.gig_id)
        };

        info!(request_id = %request_id, "Rejected gig request");
        let gig_title = {
            let state = self.state.read().await;
            state.gig(gig_id).map(|g| g.title.clone())
        };
        if let (Ok(title), Ok(employer), Ok(freelancer)) = (
            gig_title,
            self.directory.lookup(&rejected.employer_id).await,
            self.directory.lookup(&rejected.freelancer_id).await,
        ) {
            self.send(
                &freelancer,
                notifier::request_rejected_message(&title, &employer.display_name),
            )
            .await;
        }
        Ok(rejected)
    }

    /// Record a milestone submission: merge links and uploaded artifact URLs
    /// into the link map (overwriting any prior submission for that index).
    pub async fn submit_milestone(
        &self,
        request: SubmitMilestoneRequest,
    ) -> EscrowResult<ActiveGig> {
        // Validate before paying for uploads; the checks run again under the
        // write lock because the state may move while files are stored.
        {
            let state = self.state.read().await;
            let active = state.active_gig(request.active_gig_id)?;
            active.ensure_active()?;
            active.ensure_index(request.milestone_index)?;
            active.ensure_prior_approved(request.milestone_index)?;
        }

        let mut links: Vec<String> = request
            .links
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        for link in &links {
            if !is_url(link) {
                warn!(%link, "Submitted link is not an http(s) URL");
            }
        }
        for file in request.files {
            match self.artifacts.store(file.bytes, &file.content_type).await {
                Ok(url) => links.push(url),
                // One failed upload must not sink the submission.
                Err(err) => warn!(error = %err, "Failed to store milestone artifact"),
            }
        }

        let (active, gig_title, employer_id, freelancer_id) = {
            let mut state = self.state.write().await;
            let active = state.active_gig_mut(request.active_gig_id)?;
            active.ensure_active()?;
            active.ensure_index(request.milestone_index)?;
            active.ensure_prior_approved(request.milestone_index)?;

            active.milestone_links.insert(request.milestone_index, links);
            active.milestone_status[request.milestone_index] = MilestoneStatus::Pending;
            active.updated_at = Utc::now();

            let employer_id = active.employer_id.clone();
            let freelancer_id = active.freelancer_id.clone();
            let gig_id = active.gig_id;
            let snapshot = active.clone();
            let gig_title = state.gig(gig_id)?.title.clone();
            (snapshot, gig_title, employer_id, freelancer_id)
        };

        info!(
            active_gig_id = %active.id,
            milestone = request.milestone_index,
            "Submitted milestone"
        );
        if let (Ok(employer), Ok(freelancer)) = (
            self.directory.lookup(&employer_id).await,
            self.directory.lookup(&freelancer_id).await,
        ) {
            self.send(
                &employer,
                notifier::milestone_submitted_message(
                    &freelancer.display_name,
                    &gig_title,
                    request.milestone_index + 1,
                ),
            )
            .await;
        }
        Ok(active)
    }

    /// Approve a submitted milestone. Pays the freelancer out of company
    /// escrow, then (unless this was the last milestone) escrows the next
    /// milestone's payment from the employer. Last-milestone approval
    /// completes the engagement.
    pub async fn approve_milestone(
        &self,
        active_gig_id: Uuid,
        milestone_index: usize,
        payment_verified: bool,
    ) -> EscrowResult<ActiveGig> {
        let (active, gig_title, total_payment, payment, employer_id, freelancer_id) = {
            let mut state = self.state.write().await;

            // Validate everything up front; no write happens on any error
            // path, so a failed approval leaves every balance untouched.
            let (gig_id, payment, next_payment, last, employer_id, freelancer_id) = {
                let active = state.active_gig(active_gig_id)?;
                active.ensure_active()?;
                active.ensure_index(milestone_index)?;
                active.ensure_prior_approved(milestone_index)?;
                active.ensure_submitted(milestone_index)?;
                active.ensure_not_approved(milestone_index)?;

                let gig = state.gig(active.gig_id)?;
                let payment = gig.milestone_payments[milestone_index];
                if state.company_balance.amount < payment {
                    return Err(EscrowError::insufficient_company_funds(format!(
                        "Insufficient company balance to pay for the milestone (${payment})"
                    )));
                }

                let last = active.is_last_milestone(milestone_index);
                let next_payment = if last {
                    None
                } else {
                    if !payment_verified {
                        return Err(EscrowError::payment_verification_required(
                            "Payment verification for the next milestone is required",
                        ));
                    }
                    let next = gig.milestone_payments[milestone_index + 1];
                    if state.user_amount(&active.employer_id) < next {
                        return Err(EscrowError::insufficient_funds(format!(
                            "Insufficient employer balance to pay for the next milestone (${next})"
                        )));
                    }
                    Some(next)
                };

                (
                    active.gig_id,
                    payment,
                    next_payment,
                    last,
                    active.employer_id.clone(),
                    active.freelancer_id.clone(),
                )
            };

            // Pay the freelancer from escrow.
            state.company_balance.amount -= payment;
            state.credit(&freelancer_id, payment);

            // Escrow the next milestone from the employer.
            if let Some(next) = next_payment {
                state.debit(&employer_id, next);
                state.company_balance.amount += next;
            }
            state.company_balance.last_updated = Utc::now();

            let active = state.active_gig_mut(active_gig_id)?;
            active.milestone_status[milestone_index] = MilestoneStatus::Approved;
            if last {
                active.status = EngagementStatus::Completed;
            }
            active.updated_at = Utc::now();
            let snapshot = active.clone();

            let gig = state.gig(gig_id)?;
            (
                snapshot,
                gig.title.clone(),
                gig.total_payment,
                payment,
                employer_id,
                freelancer_id,
            )
        };

        let completed = active.status == EngagementStatus::Completed;
        info!(
            active_gig_id = %active_gig_id,
            milestone = milestone_index,
            amount = payment,
            completed,
            "Approved milestone"
        );
        if let (Ok(employer), Ok(freelancer)) = (
            self.directory.lookup(&employer_id).await,
            self.directory.lookup(&freelancer_id).await,
        ) {
            self.send(
                &freelancer,
                notifier::milestone_approved_message(&gig_title, milestone_index + 1, payment),
            )
            .await;
            if active.status == EngagementStatus::Completed {
                self.send(
                    &freelancer,
                    notifier::freelancer_completed_message(&gig_title, total_payment),
                )
                .await;
                self.send(
                    &employer,
                    notifier::employer_completed_message(&gig_title, &freelancer.display_name),
                )
                .await;
            }
        }
        Ok(active)
    }

    /// Reject a submitted, unapproved milestone: terminate the engagement and
    /// re-list the gig. Moves no money; earlier approved milestones stay paid.
    pub async fn reject_milestone(
        &self,
        active_gig_id: Uuid,
        milestone_index: usize,
    ) -> EscrowResult<ActiveGig> {
        let (active, gig_title, freelancer_id) = {
            let mut state = self.state.write().await;
            let gig_id = {
                let active = state.active_gig(active_gig_id)?;
                active.ensure_active()?;
                active.ensure_index(milestone_index)?;
                active.ensure_submitted(milestone_index)?;
                active.ensure_not_approved(milestone_index)?;
                active.gig_id
            };

            state.gig_mut(gig_id)?.status = GigStatus::Open;
            let active = state.active_gig_mut(active_gig_id)?;
            active.status = EngagementStatus::Terminated;
            active.updated_at = Utc::now();
            let snapshot = active.clone();
            let freelancer_id = snapshot.freelancer_id.clone();
            let gig_title = state.gig(gig_id)?.title.clone();
            (snapshot, gig_title, freelancer_id)
        };

        info!(
            active_gig_id = %active_gig_id,
            milestone = milestone_index,
            "Rejected milestone; engagement terminated"
        );
        if let Ok(freelancer) = self.directory.lookup(&freelancer_id).await {
            self.send(&freelancer, notifier::milestone_rejected_message(&gig_title))
                .await;
        }
        Ok(active)
    }

    // ---- balance operations ----

    /// Get a user's balance, creating it lazily at zero
    pub async fn balance(&self, user_id: &str) -> EscrowResult<Balance> {
        self.directory.lookup(user_id).await?;
        let mut state = self.state.write().await;
        Ok(state
            .balances
            .entry(user_id.to_string())
            .or_insert_with(|| Balance::new(user_id.to_string()))
            .clone())
    }

    /// Overwrite a user's balance (admin/testing path)
    pub async fn set_balance(&self, user_id: &str, amount: f64) -> EscrowResult<Balance> {
        self.directory.lookup(user_id).await?;
        let mut state = self.state.write().await;
        let balance = state
            .balances
            .entry(user_id.to_string())
            .or_insert_with(|| Balance::new(user_id.to_string()));
        balance.amount = amount;
        Ok(balance.clone())
    }

    /// Add funds to a user's balance
    pub async fn deposit(&self, user_id: &str, amount: f64) -> EscrowResult<Balance> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EscrowError::validation("Amount must be greater than 0"));
        }
        self.directory.lookup(user_id).await?;
        let mut state = self.state.write().await;
        state.credit(user_id, amount);
        Ok(state.balances[user_id].clone())
    }

    /// Withdraw funds from a user's balance
    pub async fn withdraw(&self, user_id: &str, amount: f64) -> EscrowResult<Balance> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EscrowError::validation("Amount must be greater than 0"));
        }
        self.directory.lookup(user_id).await?;
        let mut state = self.state.write().await;
        let current = state
            .balances
            .get(user_id)
            .ok_or_else(|| EscrowError::not_found(format!("Balance for user {user_id} not found")))?
            .amount;
        if current < amount {
            return Err(EscrowError::insufficient_funds(format!(
                "Current balance: ${current}, requested withdrawal: ${amount}"
            )));
        }
        state.debit(user_id, amount);
        Ok(state.balances[user_id].clone())
    }

    /// Read the company escrow account
    pub async fn company_balance(&self) -> CompanyBalance {
        self.state.read().await.company_balance.clone()
    }

    // ---- read-only queries ----

    /// Get a gig by id
    pub async fn gig(&self, gig_id: Uuid) -> EscrowResult<Gig> {
        self.state.read().await.gig(gig_id).cloned()
    }

    /// List gigs matching a filter
    pub async fn gigs(&self, filter: &GigFilter) -> Vec<Gig> {
        let state = self.state.read().await;
        let mut gigs: Vec<Gig> = state
            .gigs
            .values()
            .filter(|gig| {
                if let Some(status) = filter.status {
                    if gig.status != status {
                        return false;
                    }
                }
                if let Some(ref title) = filter.title {
                    if !gig.title.to_lowercase().contains(&title.to_lowercase()) {
                        return false;
                    }
                }
                if !filter.skills.iter().all(|s| gig.skills_needed.contains(s)) {
                    return false;
                }
                if let Some(min) = filter.min_payment {
                    if gig.total_payment < min {
                        return false;
                    }
                }
                if let Some(max) = filter.max_payment {
                    if gig.total_payment > max {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        gigs.sort_by_key(|g| g.created_at);
        gigs
    }

    /// List gigs posted by an employer
    pub async fn employer_gigs(&self, employer_id: &str) -> Vec<Gig> {
        let state = self.state.read().await;
        let mut gigs: Vec<Gig> = state
            .gigs
            .values()
            .filter(|g| g.employer_id == employer_id)
            .cloned()
            .collect();
        gigs.sort_by_key(|g| g.created_at);
        gigs
    }

    /// Get a request by id
    pub async fn request(&self, request_id: Uuid) -> EscrowResult<GigRequest> {
        self.state
            .read()
            .await
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| EscrowError::not_found(format!("Gig request {request_id} not found")))
    }

    /// List requests for a gig, optionally filtered by status
    pub async fn requests_for_gig(
        &self,
        gig_id: Uuid,
        status: Option<RequestStatus>,
    ) -> EscrowResult<Vec<GigRequest>> {
        let state = self.state.read().await;
        state.gig(gig_id)?;
        let mut requests: Vec<GigRequest> = state
            .requests
            .values()
            .filter(|r| r.gig_id == gig_id && status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    /// List requests routed to an employer, optionally filtered by status
    pub async fn requests_for_employer(
        &self,
        employer_id: &str,
        status: Option<RequestStatus>,
    ) -> Vec<GigRequest> {
        let state = self.state.read().await;
        let mut requests: Vec<GigRequest> = state
            .requests
            .values()
            .filter(|r| r.employer_id == employer_id && status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        requests
    }

    /// List requests made by a freelancer
    pub async fn requests_for_freelancer(&self, freelancer_id: &str) -> Vec<GigRequest> {
        let state = self.state.read().await;
        let mut requests: Vec<GigRequest> = state
            .requests
            .values()
            .filter(|r| r.freelancer_id == freelancer_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        requests
    }

    /// Get an active gig by id
    pub async fn active_gig(&self, active_gig_id: Uuid) -> EscrowResult<ActiveGig> {
        self.state.read().await.active_gig(active_gig_id).cloned()
    }

    /// Engagement for a gig, if one exists. With `participant` set, only
    /// returned when that user is the employer or freelancer on it.
    pub async fn active_gig_for_gig(
        &self,
        gig_id: Uuid,
        participant: Option<&str>,
    ) -> EscrowResult<Option<ActiveGig>> {
        let state = self.state.read().await;
        state.gig(gig_id)?;
        Ok(state
            .active_gigs
            .values()
            .find(|a| {
                a.gig_id == gig_id
                    && participant
                        .map_or(true, |p| a.employer_id == p || a.freelancer_id == p)
            })
            .cloned())
    }

    /// List engagements where the user is the employer
    pub async fn active_gigs_for_employer(&self, employer_id: &str) -> Vec<ActiveGig> {
        let state = self.state.read().await;
        let mut gigs: Vec<ActiveGig> = state
            .active_gigs
            .values()
            .filter(|a| a.employer_id == employer_id)
            .cloned()
            .collect();
        gigs.sort_by_key(|a| a.created_at);
        gigs
    }

    /// List engagements where the user is the freelancer
    pub async fn active_gigs_for_freelancer(&self, freelancer_id: &str) -> Vec<ActiveGig> {
        let state = self.state.read().await;
        let mut gigs: Vec<ActiveGig> = state
            .active_gigs
            .values()
            .filter(|a| a.freelancer_id == freelancer_id)
            .cloned()
            .collect();
        gigs.sort_by_key(|a| a.created_at);
        gigs
    }

    /// Submission snapshot for an engagement
    pub async fn milestone_links(
        &self,
        active_gig_id: Uuid,
    ) -> EscrowResult<MilestoneLinksReport> {
        let state = self.state.read().await;
        let active = state.active_gig(active_gig_id)?;
        let gig = state.gig(active.gig_id)?;
        Ok(MilestoneLinksReport {
            active_gig_id: active.id,
            gig_id: gig.id,
            gig_title: gig.title.clone(),
            gig_milestones: gig.milestones.clone(),
            milestone_links: active.milestone_links.clone(),
            milestone_status: active.milestone_status.clone(),
            milestone_count: active.milestone_count(),
        })
    }

    /// Best-effort notification; failures are logged, never propagated
    async fn send(&self, profile: &UserProfile, message: String) {
        if !self.notifier.notify(profile.phone.as_deref(), &message).await {
            warn!(user = %profile.user_id, "Notification was not delivered");
        }
    }
}
