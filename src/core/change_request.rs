//! Change-request state machine
//!
//! A factory or operator asks an admin to reopen an order for editing. The
//! lifecycle is:
//!
//! ```text
//! (none) --request--> pending --approve--> approved(unused) --consume--> approved(used)
//!                        \--reject--> rejected
//! ```
//!
//! At most one request per order may be pending, and an approved request
//! drives at most one edit. The functions here check those rules against an
//! in-memory view; the backend applies them under its write lock.

use crate::core::auth::{AuthContext, Operation, authorize};
use crate::core::error::{DyehouseError, Result};
use crate::core::role::Role;
use crate::core::status::ColorTag;
use crate::core::user::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Review status of a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl ChangeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestStatus::Pending => "pending",
            ChangeRequestStatus::Approved => "approved",
            ChangeRequestStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeRequestStatus::Pending => "Pending",
            ChangeRequestStatus::Approved => "Approved",
            ChangeRequestStatus::Rejected => "Rejected",
        }
    }

    pub fn color(&self) -> ColorTag {
        match self {
            ChangeRequestStatus::Pending => ColorTag::Yellow,
            ChangeRequestStatus::Approved => ColorTag::Green,
            ChangeRequestStatus::Rejected => ColorTag::Red,
        }
    }
}

impl fmt::Display for ChangeRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeRequestStatus {
    type Err = DyehouseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ChangeRequestStatus::Pending),
            "approved" => Ok(ChangeRequestStatus::Approved),
            "rejected" => Ok(ChangeRequestStatus::Rejected),
            other => Err(DyehouseError::BadRequest {
                message: format!("unknown change request status '{}'", other),
            }),
        }
    }
}

/// An admin's verdict on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for ChangeRequestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => ChangeRequestStatus::Approved,
            Decision::Rejected => ChangeRequestStatus::Rejected,
        }
    }
}

/// Lifecycle state, folding `is_edit_used` into the approved state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    ApprovedUnused,
    ApprovedUsed,
    Rejected,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::ApprovedUsed | RequestState::Rejected)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestState::Pending => "pending",
            RequestState::ApprovedUnused => "approved",
            RequestState::ApprovedUsed => "approved and used",
            RequestState::Rejected => "rejected",
        })
    }
}

/// A request to reopen an order for editing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: Uuid,
    pub order_id: Uuid,
    pub requester_id: Uuid,
    pub requester_role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<UserSummary>,
    pub status: ChangeRequestStatus,
    #[serde(default)]
    pub is_edit_used: bool,
    #[serde(default)]
    pub approver_id: Option<Uuid>,
    #[serde(default)]
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl ChangeRequest {
    /// Open a new pending request
    ///
    /// Fails with `NotAuthorized` unless the requester is a factory or
    /// operator user.
    pub fn open(order_id: Uuid, requester: &AuthContext, now: DateTime<Utc>) -> Result<Self> {
        authorize(requester, Operation::RequestChange)?;

        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            requester_id: requester.user_id,
            requester_role: requester.role,
            requester: Some(UserSummary {
                id: requester.user_id,
                username: requester.username.clone(),
            }),
            status: ChangeRequestStatus::Pending,
            is_edit_used: false,
            approver_id: None,
            admin_note: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
        })
    }

    pub fn state(&self) -> RequestState {
        match (self.status, self.is_edit_used) {
            (ChangeRequestStatus::Pending, _) => RequestState::Pending,
            (ChangeRequestStatus::Approved, false) => RequestState::ApprovedUnused,
            (ChangeRequestStatus::Approved, true) => RequestState::ApprovedUsed,
            (ChangeRequestStatus::Rejected, _) => RequestState::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == RequestState::Pending
    }

    pub fn is_approved_unused(&self) -> bool {
        self.state() == RequestState::ApprovedUnused
    }

    /// Approve or reject a pending request
    pub fn decide(
        &mut self,
        admin: &AuthContext,
        decision: Decision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        authorize(admin, Operation::ProcessChangeRequest)?;
        if !self.is_pending() {
            return Err(DyehouseError::InvalidState {
                request_id: self.id,
                state: self.state().to_string(),
            });
        }

        self.status = decision.into();
        self.approver_id = Some(admin.user_id);
        self.admin_note = note.filter(|n| !n.trim().is_empty());
        self.processed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Spend an approved request on one edit
    ///
    /// Only the original requester may spend it.
    pub fn consume(&mut self, editor: &AuthContext, now: DateTime<Utc>) -> Result<()> {
        if !self.is_approved_unused() || self.requester_id != editor.user_id {
            return Err(DyehouseError::NoUnusedApprovedRequest {
                order_id: self.order_id,
            });
        }
        self.is_edit_used = true;
        self.updated_at = now;
        Ok(())
    }
}

/// Fail with `DuplicatePendingRequest` if `order_id` already has a pending request
pub fn ensure_no_pending<'a, I>(requests: I, order_id: Uuid) -> Result<()>
where
    I: IntoIterator<Item = &'a ChangeRequest>,
{
    if requests
        .into_iter()
        .any(|r| r.order_id == order_id && r.is_pending())
    {
        Err(DyehouseError::DuplicatePendingRequest { order_id })
    } else {
        Ok(())
    }
}

/// The approved, unused request for `order_id` raised by `requester_id`
///
/// When several qualify the earliest created wins; ties go to the smaller id.
pub fn first_unused_approved<'a, I>(
    requests: I,
    order_id: Uuid,
    requester_id: Uuid,
) -> Option<&'a ChangeRequest>
where
    I: IntoIterator<Item = &'a ChangeRequest>,
{
    requests
        .into_iter()
        .filter(|r| r.order_id == order_id && r.requester_id == requester_id && r.is_approved_unused())
        .min_by_key(|r| (r.created_at, r.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ctx(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: role.as_str().into(),
            role,
        }
    }

    #[test]
    fn test_open_requires_factory_or_operator() {
        let order_id = Uuid::new_v4();
        assert!(ChangeRequest::open(order_id, &ctx(Role::Factory), Utc::now()).is_ok());
        assert!(ChangeRequest::open(order_id, &ctx(Role::Operator), Utc::now()).is_ok());
        for role in [Role::Sales, Role::Admin] {
            assert!(matches!(
                ChangeRequest::open(order_id, &ctx(role), Utc::now()),
                Err(DyehouseError::NotAuthorized { .. })
            ));
        }
    }

    #[test]
    fn test_approve_then_consume_once() {
        let factory = ctx(Role::Factory);
        let admin = ctx(Role::Admin);
        let mut req = ChangeRequest::open(Uuid::new_v4(), &factory, Utc::now()).unwrap();

        req.decide(&admin, Decision::Approved, Some("ok".into()), Utc::now())
            .unwrap();
        assert_eq!(req.state(), RequestState::ApprovedUnused);
        assert_eq!(req.approver_id, Some(admin.user_id));
        assert!(req.processed_at.is_some());

        req.consume(&factory, Utc::now()).unwrap();
        assert_eq!(req.state(), RequestState::ApprovedUsed);
        assert!(req.state().is_terminal());
        assert!(matches!(
            req.consume(&factory, Utc::now()),
            Err(DyehouseError::NoUnusedApprovedRequest { .. })
        ));
    }

    #[test]
    fn test_decide_rejects_non_admin_and_non_pending() {
        let operator = ctx(Role::Operator);
        let mut req = ChangeRequest::open(Uuid::new_v4(), &operator, Utc::now()).unwrap();
        assert!(matches!(
            req.decide(&operator, Decision::Approved, None, Utc::now()),
            Err(DyehouseError::NotAuthorized { .. })
        ));

        let admin = ctx(Role::Admin);
        req.decide(&admin, Decision::Rejected, Some("no".into()), Utc::now())
            .unwrap();
        match req.decide(&admin, Decision::Approved, None, Utc::now()) {
            Err(DyehouseError::InvalidState { state, .. }) => assert_eq!(state, "rejected"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rejected_cannot_be_consumed() {
        let factory = ctx(Role::Factory);
        let mut req = ChangeRequest::open(Uuid::new_v4(), &factory, Utc::now()).unwrap();
        req.decide(&ctx(Role::Admin), Decision::Rejected, None, Utc::now())
            .unwrap();
        assert!(req.consume(&factory, Utc::now()).is_err());
    }

    #[test]
    fn test_only_requester_can_consume() {
        let factory = ctx(Role::Factory);
        let mut req = ChangeRequest::open(Uuid::new_v4(), &factory, Utc::now()).unwrap();
        req.decide(&ctx(Role::Admin), Decision::Approved, None, Utc::now())
            .unwrap();
        assert!(req.consume(&ctx(Role::Factory), Utc::now()).is_err());
        assert!(req.is_approved_unused());
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let mut req = ChangeRequest::open(Uuid::new_v4(), &ctx(Role::Factory), Utc::now()).unwrap();
        req.decide(&ctx(Role::Admin), Decision::Approved, Some("  ".into()), Utc::now())
            .unwrap();
        assert_eq!(req.admin_note, None);
    }

    #[test]
    fn test_ensure_no_pending() {
        let order_id = Uuid::new_v4();
        let factory = ctx(Role::Factory);
        let pending = ChangeRequest::open(order_id, &factory, Utc::now()).unwrap();
        let others = ChangeRequest::open(Uuid::new_v4(), &factory, Utc::now()).unwrap();

        assert!(ensure_no_pending([&others], order_id).is_ok());
        assert!(matches!(
            ensure_no_pending([&others, &pending], order_id),
            Err(DyehouseError::DuplicatePendingRequest { order_id: id }) if id == order_id
        ));
    }

    #[test]
    fn test_earliest_approved_wins() {
        let order_id = Uuid::new_v4();
        let factory = ctx(Role::Factory);
        let admin = ctx(Role::Admin);
        let t0 = Utc::now();

        let mut later = ChangeRequest::open(order_id, &factory, t0 + Duration::seconds(5)).unwrap();
        let mut earlier = ChangeRequest::open(order_id, &factory, t0).unwrap();
        for r in [&mut later, &mut earlier] {
            r.decide(&admin, Decision::Approved, None, t0).unwrap();
        }

        let chosen = first_unused_approved([&later, &earlier], order_id, factory.user_id).unwrap();
        assert_eq!(chosen.id, earlier.id);
        assert!(first_unused_approved([&later], order_id, admin.user_id).is_none());
    }

    #[test]
    fn test_status_badges() {
        assert_eq!(ChangeRequestStatus::Pending.color(), ColorTag::Yellow);
        assert_eq!(ChangeRequestStatus::Approved.label(), "Approved");
        assert_eq!(ChangeRequestStatus::Rejected.color(), ColorTag::Red);
        assert_eq!(
            serde_json::to_string(&Decision::Approved).unwrap(),
            "\"approved\""
        );
    }
}
