//! Access-control policy.
//!
//! `can_perform` is evaluated by the services before every mutation, against
//! the actor profile as currently persisted. Banned and unregistered actors
//! may do nothing.

use uuid::Uuid;

use crate::contract::{Contract, Party};
use crate::error::{DomainError, DomainResult};
use crate::request::Request;
use crate::user::{User, UserType};

/// A mutating operation together with the entity it targets
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    CreateRequest,
    CreateOffer { request: &'a Request },
    DraftContract { request: &'a Request },
    EditContract { contract: &'a Contract },
    SignContract { contract: &'a Contract },
    ReleaseFunds { contract: &'a Contract },
    VerifyContract { contract: &'a Contract },
    ModerateUser { target: &'a User },
    ListUsers,
    TopUp { wallet_owner: Uuid },
    UpgradeSubscription { account: Uuid },
    SubmitReview { contract: &'a Contract },
    RunDiagnostics,
}

impl Action<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Action::CreateRequest => "only active companies can post requests",
            Action::CreateOffer { .. } => "only active engineers can submit offers",
            Action::DraftContract { .. } => "only the company that owns the request can draft a contract",
            Action::EditContract { .. } => "only the contract parties can edit its content",
            Action::SignContract { .. } => "a party can only sign in their own role and only once",
            Action::ReleaseFunds { .. } => "only the contracting company or an admin can release funds",
            Action::VerifyContract { .. } => "only admins can verify contracts",
            Action::ModerateUser { .. } => "only admins can moderate users",
            Action::ListUsers => "only admins can list accounts",
            Action::TopUp { .. } => "users can only top up their own wallet",
            Action::UpgradeSubscription { .. } => "users can only upgrade their own account",
            Action::SubmitReview { .. } => "only the contracting company can review the engineer",
            Action::RunDiagnostics => "only companies can run machine diagnostics",
        }
    }
}

/// Decide whether `actor` may perform `action`.
pub fn can_perform(actor: &User, action: &Action<'_>) -> bool {
    if actor.is_banned() || actor.user_type == UserType::Guest {
        return false;
    }

    let is = |t: UserType| actor.user_type == t;

    match action {
        Action::CreateRequest | Action::RunDiagnostics => is(UserType::Company),
        Action::CreateOffer { .. } => is(UserType::Engineer),
        Action::DraftContract { request } => {
            is(UserType::Company) && request.contact_id == actor.id
        }
        Action::EditContract { contract } => contract.party_of(actor.id).is_some(),
        Action::SignContract { contract } => match Party::for_user_type(actor.user_type) {
            Some(party) => contract.party_of(actor.id) == Some(party) && !contract.has_signed(party),
            None => false,
        },
        Action::ReleaseFunds { contract } => {
            is(UserType::Admin) || (is(UserType::Company) && contract.company_id == actor.id)
        }
        Action::VerifyContract { .. } | Action::ListUsers => is(UserType::Admin),
        Action::ModerateUser { target } => {
            is(UserType::Admin) && !target.is_admin() && target.id != actor.id
        }
        Action::TopUp { wallet_owner } => *wallet_owner == actor.id,
        Action::UpgradeSubscription { account } => *account == actor.id && !is(UserType::Admin),
        Action::SubmitReview { contract } => {
            is(UserType::Company) && contract.company_id == actor.id
        }
    }
}

/// `can_perform` as a result, carrying the reason on denial
pub fn authorize(actor: &User, action: &Action<'_>) -> DomainResult<()> {
    if can_perform(actor, action) {
        Ok(())
    } else if actor.is_banned() {
        Err(DomainError::forbidden("account is banned"))
    } else if actor.user_type == UserType::Guest {
        Err(DomainError::ProfileIncomplete)
    } else if let Some(party) = already_signed_party(actor, action) {
        Err(DomainError::conflict(format!(
            "Contract already signed by the {}",
            party
        )))
    } else {
        Err(DomainError::forbidden(action.describe()))
    }
}

/// The actor's own side when they try to sign it a second time
fn already_signed_party(actor: &User, action: &Action<'_>) -> Option<Party> {
    let Action::SignContract { contract } = action else {
        return None;
    };
    Party::for_user_type(actor.user_type)
        .filter(|party| contract.party_of(actor.id) == Some(*party) && contract.has_signed(*party))
}
