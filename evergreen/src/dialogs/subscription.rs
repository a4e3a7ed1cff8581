//! Upgrade dialog: collects a payment method and runs the subscription.

use crate::client::SubscriptionGateway;
use crate::error::{EvergreenError, Result};
use crate::models::{FamilyMember, PaymentMethod, SubscriptionRequest};

/// Card fields as typed. Checked for shape only and never sent anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvc: String,
}

impl CardDetails {
    pub fn validate(&self) -> Result<()> {
        let digits: String = self.number.chars().filter(|c| !c.is_whitespace()).collect();
        if !(12..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(EvergreenError::Validation(
                "Card number must be 12 to 19 digits".to_string(),
            ));
        }
        if self.holder.trim().is_empty() {
            return Err(EvergreenError::Validation(
                "Cardholder name is required".to_string(),
            ));
        }
        validate_expiry(&self.expiry)?;
        let cvc = self.cvc.trim();
        if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
            return Err(EvergreenError::Validation(
                "Security code must be 3 or 4 digits".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_expiry(expiry: &str) -> Result<()> {
    let invalid = || EvergreenError::Validation(format!("Expiry '{expiry}' must be MM/YY"));
    let (month, year) = expiry.trim().split_once('/').ok_or_else(invalid)?;
    if month.len() != 2 || year.len() != 2 {
        return Err(invalid());
    }
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let _year: u32 = year.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SubscriptionForm {
    memorial_id: String,
    member_id: String,
    member_name: String,
    pub method: PaymentMethod,
    pub card: CardDetails,
    /// Opaque token from a processor-side tokenizer, when one is in use.
    pub payment_token: Option<String>,
    in_flight: bool,
}

impl SubscriptionForm {
    pub fn new(member: &FamilyMember) -> Self {
        Self {
            memorial_id: member.memorial_id.clone(),
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            method: PaymentMethod::default(),
            card: CardDetails::default(),
            payment_token: None,
            in_flight: false,
        }
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn title(&self) -> String {
        format!("Upgrade {} to premium", self.member_name)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Card fields only matter when paying by card.
    pub fn request(&self) -> Result<SubscriptionRequest> {
        if self.method == PaymentMethod::Card {
            self.card.validate()?;
        }
        Ok(SubscriptionRequest {
            memorial_id: self.memorial_id.clone(),
            member_id: self.member_id.clone(),
            method: self.method,
            payment_token: self.payment_token.clone(),
        })
    }

    /// Run the subscription. A second call while one is outstanding fails
    /// with [`EvergreenError::InFlight`] and never reaches the gateway.
    pub async fn submit(&mut self, gateway: &dyn SubscriptionGateway) -> Result<FamilyMember> {
        if self.in_flight {
            return Err(EvergreenError::InFlight);
        }
        let request = self.request()?;
        self.in_flight = true;

        tracing::debug!(
            member_id = %request.member_id,
            method = %request.method,
            "Submitting subscription"
        );
        let result = gateway
            .subscribe(
                &request.memorial_id,
                &request.member_id,
                request.method,
                request.payment_token,
            )
            .await;

        self.in_flight = false;
        result
    }
}
