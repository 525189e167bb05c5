//! State transition engine for offer negotiation
//!
//! The whole lifecycle lives here: which (origin, current status, requested
//! status) combinations are legal, what each one does to the record, and the
//! one history entry every applied transition appends. Callers resolve
//! authorization *before* asking the engine to move anything.

use crate::error::NegotiationError;
use crate::offer::{CounterParty, HistoryEntry, Offer, OfferStatus, TimeStamp};

/// Fixed agent note stamped onto competing offers when one is accepted.
pub const AUTO_REJECT_NOTE: &str = "Automatically rejected - another offer was accepted";

/// Which side of the negotiation is driving the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Staff,
    Buyer,
}

/// Validate and apply a single status change.
///
/// Legal moves:
/// - staff, from `submitted`: accept, reject, or counter (sets the agent as
///   the counter author);
/// - buyer, from `countered`: accept, reject, or re-counter (unlimited
///   alternating rounds);
/// - buyer, from `submitted` or `countered`: withdraw.
///
/// Anything else, including any move out of a terminal status, is an
/// [`NegotiationError::InvalidState`]. A `countered` request must carry a
/// pre-parsed strictly positive amount.
pub fn apply(
    offer: &mut Offer,
    origin: Origin,
    requested: OfferStatus,
    counter_amount: Option<u64>,
    notes: Option<String>,
    actor: &str,
) -> Result<(), NegotiationError> {
    let current = offer.status;

    if current.is_terminal() {
        return Err(NegotiationError::InvalidState { current, requested });
    }

    let legal = matches!(
        (origin, current, requested),
        (
            Origin::Staff,
            OfferStatus::Submitted,
            OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Countered
        ) | (
            Origin::Buyer,
            OfferStatus::Countered,
            OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Countered
        ) | (
            Origin::Buyer,
            OfferStatus::Submitted | OfferStatus::Countered,
            OfferStatus::Withdrawn
        )
    );
    if !legal {
        return Err(NegotiationError::InvalidState { current, requested });
    }

    match requested {
        OfferStatus::Countered => {
            let amount = counter_amount.ok_or_else(|| {
                NegotiationError::Validation("a counter requires an amount".into())
            })?;
            if amount == 0 {
                return Err(NegotiationError::Validation(
                    "counter amount must be greater than zero".into(),
                ));
            }

            let author = match origin {
                Origin::Staff => CounterParty::Agent,
                Origin::Buyer => CounterParty::Buyer,
            };
            let original = offer.amount;
            record(offer, requested, original, Some(amount), notes.clone(), actor);
            offer.counter_offer = Some(amount);
            offer.counter_offer_by = Some(author);
            match origin {
                Origin::Staff => offer.agent_notes = notes,
                Origin::Buyer => offer.notes = notes,
            }
        }
        OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Withdrawn => {
            // the figure the decision applied to: a standing counter wins
            let decided_on = offer.effective_amount();
            record(offer, requested, decided_on, None, notes, actor);
        }
        // unreachable given the legality table, kept for exhaustiveness
        OfferStatus::Submitted => {
            return Err(NegotiationError::InvalidState { current, requested });
        }
    }

    Ok(())
}

/// System-authored rejection fired by the cascade when a competing offer is
/// accepted. Not reachable through the public mutation surface and bypasses
/// per-offer authorization, since no actor initiated it.
pub(crate) fn force_reject(offer: &mut Offer, accepting_actor: &str) {
    let decided_on = offer.effective_amount();
    record(
        offer,
        OfferStatus::Rejected,
        decided_on,
        None,
        Some(AUTO_REJECT_NOTE.to_string()),
        accepting_actor,
    );
    offer.agent_notes = Some(AUTO_REJECT_NOTE.to_string());
}

// Stamps the new status onto the record and appends exactly one audit entry.
fn record(
    offer: &mut Offer,
    action: OfferStatus,
    amount: u64,
    counter_amount: Option<u64>,
    notes: Option<String>,
    actor: &str,
) {
    let now = TimeStamp::new();
    offer.history.push(HistoryEntry {
        action,
        amount,
        counter_amount,
        notes,
        timestamp: now.clone(),
        updated_by: actor.to_string(),
    });
    offer.status = action;
    offer.status_updated_at = now;
    offer.updated_by = actor.to_string();
    offer.version += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{FundingType, OfferDraft};

    fn submitted_offer() -> Offer {
        OfferDraft::new()
            .set_buyer_name("Jo Bloggs")
            .set_buyer_email("jo@example.com")
            .set_amount("£300,000")
            .set_funding_type(FundingType::Mortgage)
            .build("offer_1x".into(), "listing_1x".into())
            .unwrap()
    }

    #[test]
    fn staff_counter_then_buyer_accept() {
        let mut offer = submitted_offer();

        apply(
            &mut offer,
            Origin::Staff,
            OfferStatus::Countered,
            Some(310_000),
            None,
            "user_1agent",
        )
        .unwrap();
        assert_eq!(offer.status, OfferStatus::Countered);
        assert_eq!(offer.counter_offer, Some(310_000));
        assert_eq!(offer.counter_offer_by, Some(CounterParty::Agent));
        assert_eq!(offer.history.len(), 2);

        apply(
            &mut offer,
            Origin::Buyer,
            OfferStatus::Accepted,
            None,
            None,
            "jo@example.com",
        )
        .unwrap();
        assert_eq!(offer.status, OfferStatus::Accepted);
        // the acceptance applied to the countered figure
        assert_eq!(offer.history.last().unwrap().amount, 310_000);
    }

    #[test]
    fn alternating_counter_rounds_are_unbounded() {
        let mut offer = submitted_offer();

        apply(
            &mut offer,
            Origin::Staff,
            OfferStatus::Countered,
            Some(310_000),
            None,
            "user_1agent",
        )
        .unwrap();

        for round in 0..5u64 {
            let buyer_amount = 302_000 + round * 1_000;
            apply(
                &mut offer,
                Origin::Buyer,
                OfferStatus::Countered,
                Some(buyer_amount),
                None,
                "jo@example.com",
            )
            .unwrap();
            assert_eq!(offer.counter_offer, Some(buyer_amount));
            assert_eq!(offer.counter_offer_by, Some(CounterParty::Buyer));
        }

        assert_eq!(offer.history.len(), 7);
        assert_eq!(offer.status, OfferStatus::Countered);
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        let mut offer = submitted_offer();
        apply(
            &mut offer,
            Origin::Staff,
            OfferStatus::Accepted,
            None,
            None,
            "user_1agent",
        )
        .unwrap();

        let before = offer.clone();
        let err = apply(
            &mut offer,
            Origin::Buyer,
            OfferStatus::Countered,
            Some(305_000),
            None,
            "jo@example.com",
        )
        .unwrap_err();

        assert!(matches!(
            err,
            NegotiationError::InvalidState {
                current: OfferStatus::Accepted,
                requested: OfferStatus::Countered,
            }
        ));
        // a rejected transition changes no fields
        assert_eq!(offer, before);
    }

    #[test]
    fn buyer_cannot_act_on_submitted_except_withdraw() {
        let mut offer = submitted_offer();
        let err = apply(
            &mut offer,
            Origin::Buyer,
            OfferStatus::Accepted,
            None,
            None,
            "jo@example.com",
        )
        .unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidState { .. }));

        apply(
            &mut offer,
            Origin::Buyer,
            OfferStatus::Withdrawn,
            None,
            None,
            "jo@example.com",
        )
        .unwrap();
        assert_eq!(offer.status, OfferStatus::Withdrawn);
    }

    #[test]
    fn staff_cannot_drive_buyer_side_moves() {
        let mut offer = submitted_offer();
        apply(
            &mut offer,
            Origin::Staff,
            OfferStatus::Countered,
            Some(310_000),
            None,
            "user_1agent",
        )
        .unwrap();

        // countered offers belong to the buyer now
        for requested in [
            OfferStatus::Accepted,
            OfferStatus::Rejected,
            OfferStatus::Withdrawn,
        ] {
            let err = apply(
                &mut offer,
                Origin::Staff,
                requested,
                None,
                None,
                "user_1agent",
            )
            .unwrap_err();
            assert!(matches!(err, NegotiationError::InvalidState { .. }));
        }
    }

    #[test]
    fn counter_requires_positive_amount() {
        let mut offer = submitted_offer();

        let missing = apply(
            &mut offer,
            Origin::Staff,
            OfferStatus::Countered,
            None,
            None,
            "user_1agent",
        );
        assert!(matches!(missing, Err(NegotiationError::Validation(_))));

        let zero = apply(
            &mut offer,
            Origin::Staff,
            OfferStatus::Countered,
            Some(0),
            None,
            "user_1agent",
        );
        assert!(matches!(zero, Err(NegotiationError::Validation(_))));

        // nothing was applied
        assert_eq!(offer.status, OfferStatus::Submitted);
        assert_eq!(offer.history.len(), 1);
    }

    #[test]
    fn force_reject_stamps_the_fixed_note() {
        let mut offer = submitted_offer();
        force_reject(&mut offer, "user_1agent");

        assert_eq!(offer.status, OfferStatus::Rejected);
        assert_eq!(offer.agent_notes.as_deref(), Some(AUTO_REJECT_NOTE));
        assert_eq!(offer.updated_by, "user_1agent");
        assert_eq!(offer.history.last().unwrap().action, OfferStatus::Rejected);
    }
}
