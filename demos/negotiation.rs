//! Walks one negotiation end to end: submit two offers, counter one,
//! accept the counter, watch the cascade close the other.
//!
//! Run with `cargo run --example negotiation`.

use std::sync::Arc;

use offer_negotiation::{
    auth::{AgentDirectory, StaffIdentity, StaffRole},
    listing::ListingDraft,
    notify::NoopDispatcher,
    offer::{FundingType, OfferDraft},
    service::{BuyerResponse, NegotiationService, StaffOfferUpdate},
};

struct EmptyDirectory;

impl AgentDirectory for EmptyDirectory {
    fn manages(&self, _: &str, _: &str) -> bool {
        false
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let db = sled::open("negotiation-demo.db")?;
    if !db.is_empty() {
        db.clear()?;
    }

    let service = NegotiationService::new(
        Arc::new(db),
        Arc::new(EmptyDirectory),
        Arc::new(NoopDispatcher),
    );

    let agent = StaffIdentity {
        id: "user_1agent".into(),
        role: StaffRole::Agent,
        email: "agent@example.com".into(),
    };

    let listing = service.create_listing(
        ListingDraft::new()
            .set_address("14 Birch Grove, York")
            .set_seller_name("R. Whitfield")
            .set_seller_email("whitfield@example.com")
            .set_listed_price(320_000)
            .set_agent_id(&agent.id)
            .set_seller_code("SC-4417"),
    )?;

    let offer_a = service.submit_offer(
        &listing.id,
        OfferDraft::new()
            .set_buyer_name("A. Hart")
            .set_buyer_email("hart@example.com")
            .set_amount("£300,000")
            .set_funding_type(FundingType::Mortgage)
            .set_aip_present(true),
    )?;

    let offer_b = service.submit_offer(
        &listing.id,
        OfferDraft::new()
            .set_buyer_name("B. Lane")
            .set_buyer_email("lane@example.com")
            .set_amount("£280,000")
            .set_funding_type(FundingType::Cash),
    )?;

    service.staff_update_offer(
        &listing.id,
        &offer_a.id,
        StaffOfferUpdate {
            status: "countered".into(),
            counter_offer: Some("£310,000".into()),
            notes: Some("Seller wants closer to asking".into()),
        },
        Some(&agent),
    )?;

    let outcome = service.buyer_respond(
        &offer_a.id,
        BuyerResponse {
            action: "accept".into(),
            buyer_email: "hart@example.com".into(),
            counter_amount: None,
            counter_notes: None,
        },
    )?;

    println!("{}", outcome.message);
    println!("listing status: {}", outcome.listing_status);
    println!("{:#?}", outcome.offer);
    println!("{:#?}", service.get_offer(&offer_b.id)?);

    Ok(())
}
