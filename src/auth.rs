//! Authorization resolver for the two trust models
//!
//! Staff actors carry a session identity (id + role). Buyers carry no session
//! at all: possession of the offer id plus the matching buyer email *is* the
//! credential. Each model gets its own [`Authorizer`] implementation.

use crate::listing::Listing;
use crate::offer::Offer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRole {
    Agent,
    RealEstateAdmin,
    Admin,
}

/// Session identity as issued by the external identity provider.
#[derive(Debug, Clone)]
pub struct StaffIdentity {
    pub id: String,
    pub role: StaffRole,
    pub email: String,
}

/// External directory collaborator: answers whether an estate admin manages
/// the agent owning a listing.
pub trait AgentDirectory: Send + Sync {
    fn manages(&self, admin_id: &str, agent_id: &str) -> bool;
}

/// Outcome of an authorization check. The reason is for logs and audit only;
/// callers surface a single generic authorization error so the mutation
/// surface cannot be used to enumerate listings or offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub authorized: bool,
    pub reason: &'static str,
}

impl Decision {
    fn allow(reason: &'static str) -> Self {
        Self {
            authorized: true,
            reason,
        }
    }
    fn deny(reason: &'static str) -> Self {
        Self {
            authorized: false,
            reason,
        }
    }
}

pub trait Authorizer {
    fn authorize(&self, listing: &Listing, offer: Option<&Offer>) -> Decision;
}

/// Session-role strategy: listing agent, managing estate admin, or admin.
pub struct StaffAuthorizer<'a> {
    identity: &'a StaffIdentity,
    directory: &'a dyn AgentDirectory,
}

impl<'a> StaffAuthorizer<'a> {
    pub fn new(identity: &'a StaffIdentity, directory: &'a dyn AgentDirectory) -> Self {
        Self {
            identity,
            directory,
        }
    }
}

impl Authorizer for StaffAuthorizer<'_> {
    fn authorize(&self, listing: &Listing, _offer: Option<&Offer>) -> Decision {
        if self.identity.id == listing.agent_id {
            return Decision::allow("actor is the listing agent");
        }
        match self.identity.role {
            StaffRole::Admin => Decision::allow("actor holds admin rights"),
            StaffRole::RealEstateAdmin
                if self.directory.manages(&self.identity.id, &listing.agent_id) =>
            {
                Decision::allow("actor administers the listing agent")
            }
            _ => Decision::deny("actor neither owns the listing nor administers its agent"),
        }
    }
}

/// Buyer-email capability strategy: the supplied email must match the target
/// offer's buyer email, case-insensitively.
pub struct BuyerAuthorizer<'a> {
    email: &'a str,
}

impl<'a> BuyerAuthorizer<'a> {
    pub fn new(email: &'a str) -> Self {
        Self { email }
    }
}

impl Authorizer for BuyerAuthorizer<'_> {
    fn authorize(&self, _listing: &Listing, offer: Option<&Offer>) -> Decision {
        let Some(offer) = offer else {
            return Decision::deny("buyer capability requires a target offer");
        };
        if offer.buyer_email.eq_ignore_ascii_case(self.email.trim()) {
            Decision::allow("email matches the offer's buyer")
        } else {
            Decision::deny("email does not match the offer's buyer")
        }
    }
}
