//! Listing status projector
//!
//! Cascades an acceptance into the listing and its competing offers. Fires
//! only on acceptance; reject, counter and withdraw leave the listing alone.

use crate::engine;
use crate::listing::{Listing, ListingStatus};
use crate::offer::Offer;

/// Apply the acceptance of `accepted_id` to the rest of the aggregate:
/// the listing goes `sold` and every other offer still live gets a
/// system-authored rejection credited to the accepting actor.
///
/// Returns the offers the cascade actually touched, which must land in the
/// same commit as the acceptance itself.
pub(crate) fn project_acceptance(
    listing: &mut Listing,
    offers: Vec<Offer>,
    accepted_id: &str,
    accepting_actor: &str,
) -> Vec<Offer> {
    listing.status = ListingStatus::Sold;
    listing.version += 1;

    let mut touched = Vec::new();
    for mut offer in offers {
        if offer.id == accepted_id || !offer.is_live() {
            continue;
        }
        engine::force_reject(&mut offer, accepting_actor);
        touched.push(offer);
    }
    touched
}
