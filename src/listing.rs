//! Listing record and its status projection
use crate::error::NegotiationError;
use crate::offer::TimeStamp;
use chrono::Utc;
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Live,
    #[n(2)]
    Archive,
    #[n(3)]
    Sold,
}

/// The property record offers are negotiated against.
///
/// Offers are not embedded here. Each offer lives as its own record and the
/// listing keeps only the ordered id list, so unrelated offers on a busy
/// listing never race on a whole-aggregate rewrite.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Listing {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub address: String,
    #[n(2)]
    pub seller_name: String,
    #[n(3)]
    pub seller_email: String,
    #[n(4)]
    pub listed_price: u64,
    #[n(5)]
    pub status: ListingStatus,
    #[n(6)]
    pub agent_id: String,
    #[n(7)]
    pub seller_code: String,
    #[n(8)]
    pub offer_ids: Vec<String>,
    #[n(9)]
    pub created_at: TimeStamp<Utc>,
    // optimistic lock, bumped whenever the listing itself changes
    #[n(10)]
    pub version: u64,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Live => "live",
            Self::Archive => "archive",
            Self::Sold => "sold",
        };
        write!(f, "{name}")
    }
}

// Used for constructing listings before they are committed.
#[derive(Default)]
pub struct ListingDraft {
    address: Option<String>,
    seller_name: Option<String>,
    seller_email: Option<String>,
    listed_price: u64,
    agent_id: Option<String>,
    seller_code: Option<String>,
}

impl ListingDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }
    pub fn set_seller_name(mut self, name: &str) -> Self {
        self.seller_name = Some(name.to_string());
        self
    }
    pub fn set_seller_email(mut self, email: &str) -> Self {
        self.seller_email = Some(email.to_string());
        self
    }
    pub fn set_listed_price(mut self, price: u64) -> Self {
        self.listed_price = price;
        self
    }
    pub fn set_agent_id(mut self, agent_id: &str) -> Self {
        self.agent_id = Some(agent_id.to_string());
        self
    }
    pub fn set_seller_code(mut self, code: &str) -> Self {
        self.seller_code = Some(code.to_string());
        self
    }

    pub fn build(self, id: String) -> Result<Listing, NegotiationError> {
        let address = self
            .address
            .ok_or_else(|| NegotiationError::Validation("address is not set".into()))?;
        let seller_name = self
            .seller_name
            .ok_or_else(|| NegotiationError::Validation("seller name is not set".into()))?;
        let seller_email = self
            .seller_email
            .ok_or_else(|| NegotiationError::Validation("seller email is not set".into()))?;
        let agent_id = self
            .agent_id
            .ok_or_else(|| NegotiationError::Validation("agent id is not set".into()))?;
        if self.listed_price == 0 {
            return Err(NegotiationError::Validation(
                "listed price must be greater than zero".into(),
            ));
        }

        Ok(Listing {
            id,
            address,
            seller_name,
            seller_email,
            listed_price: self.listed_price,
            status: ListingStatus::Live,
            agent_id,
            seller_code: self.seller_code.unwrap_or_default(),
            offer_ids: vec![],
            created_at: TimeStamp::new(),
            version: 1,
        })
    }
}
