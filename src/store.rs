//! Persistence adapter over sled
//!
//! Listings and offers are independently addressable records (an arena, not
//! an embedded array): `listing/<id>` and `offer/<id>` keys with minicbor
//! values. Every mutation commits through [`OfferStore::commit`], which
//! writes the whole touched set in one sled transaction and verifies each
//! record's optimistic-lock version on the way in. An accept plus its
//! cascade therefore either lands completely or not at all.

use crate::error::NegotiationError;
use crate::listing::Listing;
use crate::offer::Offer;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::sync::Arc;

const LISTING_PREFIX: &str = "listing/";
const OFFER_PREFIX: &str = "offer/";

fn listing_key(id: &str) -> String {
    format!("{LISTING_PREFIX}{id}")
}

fn offer_key(id: &str) -> String {
    format!("{OFFER_PREFIX}{id}")
}

fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, NegotiationError> {
    minicbor::to_vec(value).map_err(|e| NegotiationError::Encoding(e.to_string()))
}

fn decode<'b, T: minicbor::Decode<'b, ()>>(bytes: &'b [u8]) -> Result<T, NegotiationError> {
    minicbor::decode(bytes).map_err(|e| NegotiationError::Encoding(e.to_string()))
}

#[derive(Clone, Copy)]
enum RecordKind {
    Listing,
    Offer,
}

struct Upsert {
    kind: RecordKind,
    key: String,
    // version the record carried when it was loaded; the stored copy must
    // still match it at commit time. 0 means the record is brand new.
    expected_version: u64,
    bytes: Vec<u8>,
}

/// All writes for one mutation, applied as a single atomic unit.
#[derive(Default)]
pub struct CommitPlan {
    upserts: Vec<Upsert>,
    removals: Vec<(String, u64)>,
}

impl CommitPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_listing(mut self, listing: &Listing) -> Result<Self, NegotiationError> {
        self.upserts.push(Upsert {
            kind: RecordKind::Listing,
            key: listing_key(&listing.id),
            expected_version: listing.version - 1,
            bytes: encode(listing)?,
        });
        Ok(self)
    }

    pub fn put_offer(mut self, offer: &Offer) -> Result<Self, NegotiationError> {
        self.upserts.push(Upsert {
            kind: RecordKind::Offer,
            key: offer_key(&offer.id),
            expected_version: offer.version - 1,
            bytes: encode(offer)?,
        });
        Ok(self)
    }

    /// Remove an offer record outright. `loaded_version` is the version the
    /// caller read before deciding to delete.
    pub fn remove_offer(mut self, offer_id: &str, loaded_version: u64) -> Self {
        self.removals.push((offer_key(offer_id), loaded_version));
        self
    }
}

pub struct OfferStore {
    db: Arc<sled::Db>,
}

impl OfferStore {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    pub fn listing(&self, listing_id: &str) -> Result<Listing, NegotiationError> {
        let bytes = self
            .db
            .get(listing_key(listing_id).as_bytes())?
            .ok_or_else(|| NegotiationError::not_found("listing", listing_id))?;
        decode(&bytes)
    }

    pub fn offer(&self, offer_id: &str) -> Result<Offer, NegotiationError> {
        let bytes = self
            .db
            .get(offer_key(offer_id).as_bytes())?
            .ok_or_else(|| NegotiationError::not_found("offer", offer_id))?;
        decode(&bytes)
    }

    /// Load every offer of a listing, in submission order.
    pub fn offers_for(&self, listing: &Listing) -> Result<Vec<Offer>, NegotiationError> {
        listing
            .offer_ids
            .iter()
            .map(|id| self.offer(id))
            .collect()
    }

    /// Commit the plan atomically. Each touched record is re-read inside the
    /// transaction and its stored version compared against the version the
    /// caller loaded; any mismatch aborts the entire write with
    /// [`NegotiationError::ConcurrentModification`].
    pub fn commit(&self, plan: CommitPlan) -> Result<(), NegotiationError> {
        let result = self.db.transaction(|tx| {
            for upsert in &plan.upserts {
                let stored = tx.get(upsert.key.as_bytes())?;
                match (&stored, upsert.expected_version) {
                    (None, 0) => {}
                    (Some(bytes), expected) if expected > 0 => {
                        let current = stored_version(upsert.kind, bytes)
                            .map_err(ConflictableTransactionError::Abort)?;
                        if current != expected {
                            return Err(ConflictableTransactionError::Abort(
                                NegotiationError::ConcurrentModification,
                            ));
                        }
                    }
                    // new record already present, or existing record vanished
                    _ => {
                        return Err(ConflictableTransactionError::Abort(
                            NegotiationError::ConcurrentModification,
                        ));
                    }
                }
                tx.insert(upsert.key.as_bytes(), upsert.bytes.clone())?;
            }

            for (key, loaded_version) in &plan.removals {
                let stored = tx.get(key.as_bytes())?;
                let Some(bytes) = stored else {
                    return Err(ConflictableTransactionError::Abort(
                        NegotiationError::ConcurrentModification,
                    ));
                };
                let current = stored_version(RecordKind::Offer, &bytes)
                    .map_err(ConflictableTransactionError::Abort)?;
                if current != *loaded_version {
                    return Err(ConflictableTransactionError::Abort(
                        NegotiationError::ConcurrentModification,
                    ));
                }
                tx.remove(key.as_bytes())?;
            }

            Ok(())
        });

        match result {
            Ok(()) => {
                log::debug!(
                    "committed {} upsert(s), {} removal(s)",
                    plan.upserts.len(),
                    plan.removals.len()
                );
                Ok(())
            }
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(NegotiationError::Storage(err)),
        }
    }
}

fn stored_version(kind: RecordKind, bytes: &[u8]) -> Result<u64, NegotiationError> {
    match kind {
        RecordKind::Listing => decode::<Listing>(bytes).map(|l| l.version),
        RecordKind::Offer => decode::<Offer>(bytes).map(|o| o.version),
    }
}
