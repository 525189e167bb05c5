//! Service layer API for offer negotiation operations
//!
//! Transport agnostic: an HTTP (or any other) boundary calls straight into
//! these methods and maps [`NegotiationError`] onto its response codes.
use crate::auth::{AgentDirectory, Authorizer, BuyerAuthorizer, StaffAuthorizer, StaffIdentity};
use crate::engine::{self, Origin};
use crate::error::NegotiationError;
use crate::listing::{Listing, ListingDraft, ListingStatus};
use crate::notify::{self, NotificationDispatcher, Variables};
use crate::offer::{Offer, OfferDraft, OfferStatus};
use crate::projector;
use crate::store::{CommitPlan, OfferStore};
use crate::utils::{new_prefixed_id, parse_amount};
use std::sync::Arc;

/// Staff mutation payload: the requested status plus optional figures.
/// Amounts arrive raw (currency formatting allowed) and are resolved here.
pub struct StaffOfferUpdate {
    pub status: String,
    pub counter_offer: Option<String>,
    pub notes: Option<String>,
}

/// Buyer response payload. No session: the email is the capability.
pub struct BuyerResponse {
    pub action: String,
    pub buyer_email: String,
    pub counter_amount: Option<String>,
    pub counter_notes: Option<String>,
}

#[derive(Debug)]
pub struct BuyerOutcome {
    pub message: String,
    pub offer: Offer,
    pub listing_status: ListingStatus,
}

pub struct NegotiationConfig {
    /// Server-side guard for "one pending offer per buyer per property".
    pub single_pending_offer_per_buyer: bool,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            single_pending_offer_per_buyer: true,
        }
    }
}

pub struct NegotiationService {
    store: OfferStore,
    directory: Arc<dyn AgentDirectory>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: NegotiationConfig,
}

impl NegotiationService {
    pub fn new(
        db: Arc<sled::Db>,
        directory: Arc<dyn AgentDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store: OfferStore::new(db),
            directory,
            dispatcher,
            config: NegotiationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: NegotiationConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a listing open for offers. Listing management proper lives
    /// outside this core; this is the minimum needed to negotiate against.
    pub fn create_listing(&self, draft: ListingDraft) -> Result<Listing, NegotiationError> {
        let id = new_prefixed_id("listing_")
            .map_err(|e| NegotiationError::Encoding(e.to_string()))?;
        let listing = draft.build(id)?;

        self.store
            .commit(CommitPlan::new().put_listing(&listing)?)?;
        log::info!("listing `{}` created for agent `{}`", listing.id, listing.agent_id);
        Ok(listing)
    }

    pub fn get_listing(&self, listing_id: &str) -> Result<Listing, NegotiationError> {
        self.store.listing(listing_id)
    }

    pub fn get_offer(&self, offer_id: &str) -> Result<Offer, NegotiationError> {
        self.store.offer(offer_id)
    }

    /// All offers on a listing, in submission order.
    pub fn offers(&self, listing_id: &str) -> Result<Vec<Offer>, NegotiationError> {
        let listing = self.store.listing(listing_id)?;
        self.store.offers_for(&listing)
    }

    /// Submit a new offer against a live listing (status becomes `submitted`
    /// with its first audit entry).
    pub fn submit_offer(
        &self,
        listing_id: &str,
        draft: OfferDraft,
    ) -> Result<Offer, NegotiationError> {
        let mut listing = self.store.listing(listing_id)?;
        if listing.status != ListingStatus::Live {
            return Err(NegotiationError::Validation(format!(
                "listing is `{}` and not accepting offers",
                listing.status
            )));
        }

        let id =
            new_prefixed_id("offer_").map_err(|e| NegotiationError::Encoding(e.to_string()))?;
        let offer = draft.build(id, listing.id.clone())?;

        if self.config.single_pending_offer_per_buyer {
            let existing = self.store.offers_for(&listing)?;
            if existing
                .iter()
                .any(|o| o.is_live() && o.buyer_email.eq_ignore_ascii_case(&offer.buyer_email))
            {
                return Err(NegotiationError::Validation(
                    "buyer already has a pending offer on this listing".into(),
                ));
            }
        }

        listing.offer_ids.push(offer.id.clone());
        listing.version += 1;

        self.store.commit(
            CommitPlan::new()
                .put_listing(&listing)?
                .put_offer(&offer)?,
        )?;
        log::info!("offer `{}` submitted on listing `{}`", offer.id, listing.id);

        self.notify(
            "offer_submitted",
            listing.seller_email.clone(),
            offer_variables(&listing, &offer),
        );
        Ok(offer)
    }

    /// Staff-driven status update on one offer. Requires a staff identity and
    /// passes the staff authorization resolver; an acceptance cascades into
    /// the listing and its competing offers in the same commit.
    pub fn staff_update_offer(
        &self,
        listing_id: &str,
        offer_id: &str,
        update: StaffOfferUpdate,
        identity: Option<&StaffIdentity>,
    ) -> Result<Offer, NegotiationError> {
        let listing = self.store.listing(listing_id)?;
        let identity = self.require_staff(identity, &listing)?;

        let mut offer = self.store.offer(offer_id)?;
        if offer.listing_id != listing.id {
            return Err(NegotiationError::not_found("offer", offer_id));
        }

        let requested = OfferStatus::parse(&update.status).ok_or_else(|| {
            NegotiationError::Validation(format!("unknown status `{}`", update.status))
        })?;
        let counter_amount = update
            .counter_offer
            .as_deref()
            .map(parse_amount)
            .transpose()?;

        let actor = identity.id.clone();
        engine::apply(
            &mut offer,
            Origin::Staff,
            requested,
            counter_amount,
            update.notes,
            &actor,
        )?;
        log::info!("offer `{}` -> `{requested}` by staff `{actor}`", offer.id);

        if requested == OfferStatus::Accepted {
            let (_, offer) = self.commit_acceptance(listing, offer, &actor)?;
            return Ok(offer);
        }

        self.store.commit(CommitPlan::new().put_offer(&offer)?)?;
        self.notify(
            buyer_template(requested),
            offer.buyer_email.clone(),
            offer_variables(&listing, &offer),
        );
        Ok(offer)
    }

    /// Erase an offer and its history outright (distinct from `withdrawn`,
    /// which is a recorded transition). Same authorization as a staff update.
    pub fn staff_delete_offer(
        &self,
        listing_id: &str,
        offer_id: &str,
        identity: Option<&StaffIdentity>,
    ) -> Result<(), NegotiationError> {
        let mut listing = self.store.listing(listing_id)?;
        let identity = self.require_staff(identity, &listing)?;

        let offer = self.store.offer(offer_id)?;
        if offer.listing_id != listing.id {
            return Err(NegotiationError::not_found("offer", offer_id));
        }

        listing.offer_ids.retain(|id| id != offer_id);
        listing.version += 1;

        self.store.commit(
            CommitPlan::new()
                .put_listing(&listing)?
                .remove_offer(offer_id, offer.version),
        )?;
        log::info!(
            "offer `{offer_id}` removed from listing `{}` by staff `{}`",
            listing.id,
            identity.id
        );
        Ok(())
    }

    /// Buyer action against a countered offer (withdraw is additionally
    /// allowed while still `submitted`). The supplied email is the
    /// credential; no session is involved.
    pub fn buyer_respond(
        &self,
        offer_id: &str,
        response: BuyerResponse,
    ) -> Result<BuyerOutcome, NegotiationError> {
        let mut offer = self.store.offer(offer_id)?;
        let listing = self.store.listing(&offer.listing_id)?;

        let decision =
            BuyerAuthorizer::new(&response.buyer_email).authorize(&listing, Some(&offer));
        if !decision.authorized {
            log::info!("buyer action on `{offer_id}` denied: {}", decision.reason);
            return Err(NegotiationError::Authorization);
        }

        let requested = match response.action.trim().to_ascii_lowercase().as_str() {
            "accept" => OfferStatus::Accepted,
            "reject" => OfferStatus::Rejected,
            "counter" => OfferStatus::Countered,
            "withdraw" => OfferStatus::Withdrawn,
            other => {
                return Err(NegotiationError::Validation(format!(
                    "unknown action `{other}`"
                )));
            }
        };
        let counter_amount = response
            .counter_amount
            .as_deref()
            .map(parse_amount)
            .transpose()?;

        let actor = offer.buyer_email.clone();
        engine::apply(
            &mut offer,
            Origin::Buyer,
            requested,
            counter_amount,
            response.counter_notes,
            &actor,
        )?;
        log::info!("offer `{}` -> `{requested}` by buyer", offer.id);

        let message = match requested {
            OfferStatus::Accepted => "Offer accepted",
            OfferStatus::Rejected => "Counter offer rejected",
            OfferStatus::Countered => "Counter offer sent",
            OfferStatus::Withdrawn => "Offer withdrawn",
            OfferStatus::Submitted => unreachable!("not a buyer action"),
        }
        .to_string();

        if requested == OfferStatus::Accepted {
            let (listing, offer) = self.commit_acceptance(listing, offer, &actor)?;
            return Ok(BuyerOutcome {
                message,
                listing_status: listing.status,
                offer,
            });
        }

        self.store.commit(CommitPlan::new().put_offer(&offer)?)?;
        self.notify(
            seller_template(requested),
            listing.seller_email.clone(),
            offer_variables(&listing, &offer),
        );
        Ok(BuyerOutcome {
            message,
            listing_status: listing.status,
            offer,
        })
    }

    fn require_staff<'a>(
        &self,
        identity: Option<&'a StaffIdentity>,
        listing: &Listing,
    ) -> Result<&'a StaffIdentity, NegotiationError> {
        let identity = identity.ok_or(NegotiationError::Authentication)?;
        let decision =
            StaffAuthorizer::new(identity, self.directory.as_ref()).authorize(listing, None);
        if !decision.authorized {
            log::info!("staff action by `{}` denied: {}", identity.id, decision.reason);
            return Err(NegotiationError::Authorization);
        }
        Ok(identity)
    }

    // One acceptance, one commit: the accepted offer, the sold listing and
    // every cascaded rejection land together or not at all.
    fn commit_acceptance(
        &self,
        mut listing: Listing,
        accepted: Offer,
        actor: &str,
    ) -> Result<(Listing, Offer), NegotiationError> {
        let all = self.store.offers_for(&listing)?;
        let cascaded = projector::project_acceptance(&mut listing, all, &accepted.id, actor);

        let mut plan = CommitPlan::new()
            .put_listing(&listing)?
            .put_offer(&accepted)?;
        for competitor in &cascaded {
            plan = plan.put_offer(competitor)?;
        }
        self.store.commit(plan)?;
        log::info!(
            "listing `{}` sold via offer `{}`, {} competing offer(s) auto-rejected",
            listing.id,
            accepted.id,
            cascaded.len()
        );

        self.notify(
            "offer_accepted",
            accepted.buyer_email.clone(),
            offer_variables(&listing, &accepted),
        );
        self.notify(
            "listing_sold",
            listing.seller_email.clone(),
            offer_variables(&listing, &accepted),
        );
        for competitor in &cascaded {
            self.notify(
                "offer_rejected",
                competitor.buyer_email.clone(),
                offer_variables(&listing, competitor),
            );
        }

        Ok((listing, accepted))
    }

    fn notify(&self, template: &'static str, recipient: String, variables: Variables) {
        notify::dispatch_detached(Arc::clone(&self.dispatcher), template, recipient, variables);
    }
}

fn buyer_template(action: OfferStatus) -> &'static str {
    match action {
        OfferStatus::Accepted => "offer_accepted",
        OfferStatus::Countered => "offer_countered",
        _ => "offer_rejected",
    }
}

fn seller_template(action: OfferStatus) -> &'static str {
    match action {
        OfferStatus::Countered => "buyer_countered",
        OfferStatus::Withdrawn => "offer_withdrawn",
        _ => "counter_rejected",
    }
}

fn offer_variables(listing: &Listing, offer: &Offer) -> Variables {
    vec![
        ("address".into(), listing.address.clone()),
        ("buyer_name".into(), offer.buyer_name.clone()),
        ("amount".into(), offer.effective_amount().to_string()),
    ]
}
