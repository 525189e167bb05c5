//! Property-based tests for the offer transition engine
//!
//! proptest drives the state machine with arbitrary (origin, requested
//! status, amount) sequences. The transition logic is critical - bugs here
//! corrupt every negotiation - and random sequences catch edge cases manual
//! case selection misses.
//!
//! Covered properties:
//!
//! 1. Terminal absorption - a decided offer never moves again
//! 2. Audit growth - exactly one history entry per applied transition,
//!    its action always equal to the new status
//! 3. Failed transitions are side-effect free
//! 4. A countered offer always carries a positive counter amount
//! 5. The optimistic-lock version counts applied transitions
//! 6. Amount parsing is stable under currency formatting

use offer_negotiation::engine::{self, Origin};
use offer_negotiation::offer::{FundingType, Offer, OfferDraft, OfferStatus};
use offer_negotiation::utils::parse_amount;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Step {
    origin: Origin,
    requested: OfferStatus,
    amount: Option<u64>,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    (
        prop_oneof![Just(Origin::Staff), Just(Origin::Buyer)],
        prop_oneof![
            Just(OfferStatus::Submitted),
            Just(OfferStatus::Countered),
            Just(OfferStatus::Accepted),
            Just(OfferStatus::Rejected),
            Just(OfferStatus::Withdrawn),
        ],
        prop::option::of(0u64..1_000_000),
    )
        .prop_map(|(origin, requested, amount)| Step {
            origin,
            requested,
            amount,
        })
}

fn fresh_offer() -> Offer {
    OfferDraft::new()
        .set_buyer_name("A. Hart")
        .set_buyer_email("hart@example.com")
        .set_amount("300000")
        .set_funding_type(FundingType::Mortgage)
        .build("offer_1prop".into(), "listing_1prop".into())
        .unwrap()
}

fn actor(origin: Origin) -> &'static str {
    match origin {
        Origin::Staff => "user_1agent",
        Origin::Buyer => "hart@example.com",
    }
}

proptest! {
    /// Every applied transition appends exactly one entry whose action is the
    /// new status; every refused transition leaves the record untouched.
    #[test]
    fn prop_audit_trail_tracks_applied_transitions(
        steps in prop::collection::vec(step_strategy(), 1..20)
    ) {
        let mut offer = fresh_offer();
        let mut applied = 1usize; // the submit entry

        for step in steps {
            let before = offer.clone();
            let result = engine::apply(
                &mut offer,
                step.origin,
                step.requested,
                step.amount,
                None,
                actor(step.origin),
            );

            match result {
                Ok(()) => {
                    applied += 1;
                    prop_assert_eq!(offer.history.len(), applied);
                    prop_assert_eq!(offer.status, step.requested);
                    prop_assert_eq!(offer.history.last().unwrap().action, step.requested);
                }
                Err(_) => prop_assert_eq!(&offer, &before, "failed transition mutated the offer"),
            }
        }
    }

    /// Once a terminal status is reached, no sequence of further requests
    /// moves the offer or grows its history.
    #[test]
    fn prop_terminal_states_absorb(
        steps in prop::collection::vec(step_strategy(), 1..24)
    ) {
        let mut offer = fresh_offer();
        let mut decided: Option<Offer> = None;

        for step in steps {
            let result = engine::apply(
                &mut offer,
                step.origin,
                step.requested,
                step.amount,
                None,
                actor(step.origin),
            );

            if let Some(snapshot) = &decided {
                prop_assert!(result.is_err());
                prop_assert_eq!(&offer, snapshot);
            } else if offer.status.is_terminal() {
                decided = Some(offer.clone());
            }
        }
    }

    /// A countered offer always carries a strictly positive standing amount
    /// and names its author.
    #[test]
    fn prop_countered_offers_carry_positive_counters(
        steps in prop::collection::vec(step_strategy(), 1..20)
    ) {
        let mut offer = fresh_offer();

        for step in steps {
            let _ = engine::apply(
                &mut offer,
                step.origin,
                step.requested,
                step.amount,
                None,
                actor(step.origin),
            );

            if offer.status == OfferStatus::Countered {
                prop_assert!(offer.counter_offer.unwrap() > 0);
                prop_assert!(offer.counter_offer_by.is_some());
            }
        }
    }

    /// version == history length, always: both count applied transitions.
    #[test]
    fn prop_version_counts_applied_transitions(
        steps in prop::collection::vec(step_strategy(), 1..20)
    ) {
        let mut offer = fresh_offer();

        for step in steps {
            let _ = engine::apply(
                &mut offer,
                step.origin,
                step.requested,
                step.amount,
                None,
                actor(step.origin),
            );
            prop_assert_eq!(offer.version as usize, offer.history.len());
        }
    }

    /// Any positive integer survives being rendered with a currency symbol
    /// and thousands separators.
    #[test]
    fn prop_amount_parsing_is_stable_under_formatting(value in 1u64..=u64::MAX / 2) {
        let plain = value.to_string();

        // group digits into thousands: 1234567 -> "1,234,567"
        let digits: Vec<char> = plain.chars().rev().collect();
        let mut grouped = String::new();
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && i % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(*c);
        }
        let grouped: String = grouped.chars().rev().collect();
        let formatted = format!("£{grouped}");

        prop_assert_eq!(parse_amount(&plain).unwrap(), value);
        prop_assert_eq!(parse_amount(&formatted).unwrap(), value);
    }
}
