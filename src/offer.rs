//! Offer record, its status vocabulary and the append-only audit trail
use crate::error::NegotiationError;
use crate::utils::parse_amount;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferStatus {
    #[n(0)]
    Submitted,
    #[n(1)]
    Countered,
    #[n(2)]
    Accepted,
    #[n(3)]
    Rejected,
    #[n(4)]
    Withdrawn,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingType {
    #[n(0)]
    Cash,
    #[n(1)]
    Mortgage,
    #[n(2)]
    Chain,
}

/// Who authored the counter-offer amount currently on the table.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterParty {
    #[n(0)]
    Agent,
    #[n(1)]
    Seller,
    #[n(2)]
    Buyer,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

/// One immutable line of provenance. Current state is always read from the
/// offer's top-level fields, never reconstructed from these entries.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    #[n(0)]
    pub action: OfferStatus,
    /// The monetary figure the decision applied to. Accepting or rejecting a
    /// standing counter records the counter amount, not the original offer.
    #[n(1)]
    pub amount: u64,
    #[n(2)]
    pub counter_amount: Option<u64>,
    #[n(3)]
    pub notes: Option<String>,
    #[n(4)]
    pub timestamp: TimeStamp<Utc>,
    #[n(5)]
    pub updated_by: String,
}

/// A buyer's proposal against a listing. Independently addressable record,
/// keyed by its own id; `listing_id` points back at the owning listing.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Offer {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub listing_id: String,
    #[n(2)]
    pub buyer_name: String,
    #[n(3)]
    pub buyer_email: String,
    #[n(4)]
    pub amount: u64,
    #[n(5)]
    pub funding_type: FundingType,
    #[n(6)]
    pub chain: bool,
    #[n(7)]
    pub aip_present: bool,
    #[n(8)]
    pub status: OfferStatus,
    #[n(9)]
    pub counter_offer: Option<u64>,
    #[n(10)]
    pub counter_offer_by: Option<CounterParty>,
    #[n(11)]
    pub agent_notes: Option<String>,
    #[n(12)]
    pub notes: Option<String>,
    #[n(13)]
    pub status_updated_at: TimeStamp<Utc>,
    #[n(14)]
    pub updated_by: String,
    #[n(15)]
    pub history: Vec<HistoryEntry>,
    // optimistic lock, bumped on every applied mutation
    #[n(16)]
    pub version: u64,
}

impl OfferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Withdrawn)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            "countered" => Some(Self::Countered),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submitted => "submitted",
            Self::Countered => "countered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        };
        write!(f, "{name}")
    }
}

impl Offer {
    /// The figure a decision on this offer applies to right now: the standing
    /// counter if one exists, otherwise the original offer amount.
    pub fn effective_amount(&self) -> u64 {
        self.counter_offer.unwrap_or(self.amount)
    }

    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }
}

// Used for constructing offer submissions before they are committed.
#[derive(Default)]
pub struct OfferDraft {
    buyer_name: Option<String>,
    buyer_email: Option<String>,
    amount: Option<String>,
    funding_type: Option<FundingType>,
    chain: bool,
    aip_present: bool,
    notes: Option<String>,
}

impl OfferDraft {
    /// Construct a new draft, the basis of an offer submission
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_buyer_name(mut self, name: &str) -> Self {
        self.buyer_name = Some(name.to_string());
        self
    }
    pub fn set_buyer_email(mut self, email: &str) -> Self {
        self.buyer_email = Some(email.to_string());
        self
    }
    /// Raw amount as submitted, currency formatting allowed
    pub fn set_amount(mut self, raw: &str) -> Self {
        self.amount = Some(raw.to_string());
        self
    }
    pub fn set_funding_type(mut self, funding: FundingType) -> Self {
        self.funding_type = Some(funding);
        self
    }
    pub fn set_chain(mut self, chain: bool) -> Self {
        self.chain = chain;
        self
    }
    pub fn set_aip_present(mut self, aip: bool) -> Self {
        self.aip_present = aip;
        self
    }
    pub fn set_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    /// Checks fields and resolves the raw amount, producing the initial
    /// `Submitted` record with its first history entry.
    pub fn build(self, id: String, listing_id: String) -> Result<Offer, NegotiationError> {
        let buyer_name = self
            .buyer_name
            .ok_or_else(|| NegotiationError::Validation("buyer name is not set".into()))?;
        let buyer_email = self
            .buyer_email
            .ok_or_else(|| NegotiationError::Validation("buyer email is not set".into()))?;
        let funding_type = self
            .funding_type
            .ok_or_else(|| NegotiationError::Validation("funding type is not set".into()))?;
        let raw_amount = self
            .amount
            .ok_or_else(|| NegotiationError::Validation("amount is not set".into()))?;
        let amount = parse_amount(&raw_amount)?;

        let now = TimeStamp::new();
        let submit = HistoryEntry {
            action: OfferStatus::Submitted,
            amount,
            counter_amount: None,
            notes: self.notes.clone(),
            timestamp: now.clone(),
            updated_by: buyer_email.clone(),
        };

        Ok(Offer {
            id,
            listing_id,
            buyer_name,
            buyer_email: buyer_email.clone(),
            amount,
            funding_type,
            chain: self.chain,
            aip_present: self.aip_present,
            status: OfferStatus::Submitted,
            counter_offer: None,
            counter_offer_by: None,
            agent_notes: None,
            notes: self.notes,
            status_updated_at: now,
            updated_by: buyer_email,
            history: vec![submit],
            version: 1,
        })
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
