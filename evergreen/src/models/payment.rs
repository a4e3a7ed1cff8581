use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Paypal,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Paypal => write!(f, "paypal"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "card" | "credit_card" => Ok(PaymentMethod::Card),
            "paypal" => Ok(PaymentMethod::Paypal),
            other => Err(format!("unknown payment method '{other}'")),
        }
    }
}

/// What a payment boundary needs to confirm a premium subscription.
///
/// Raw card fields never appear here; `payment_token` is an opaque value
/// issued by the processor's own client-side tokenization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub memorial_id: String,
    pub member_id: String,
    pub method: PaymentMethod,
    pub payment_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub reference: String,
    pub method: PaymentMethod,
    pub confirmed_at: DateTime<Utc>,
}

/// Stored record of a confirmed subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub memorial_id: String,
    pub member_id: String,
    pub method: PaymentMethod,
    pub reference: String,
    pub confirmed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_round_trips_through_strings() {
        assert_eq!("card".parse::<PaymentMethod>(), Ok(PaymentMethod::Card));
        assert_eq!("PayPal".parse::<PaymentMethod>(), Ok(PaymentMethod::Paypal));
        assert_eq!("credit_card".parse::<PaymentMethod>(), Ok(PaymentMethod::Card));
        assert!("cash".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::Paypal.to_string(), "paypal");
    }

    #[test]
    fn payment_method_serializes_lowercase() {
        let json = serde_json::to_value(PaymentMethod::Card).unwrap();
        assert_eq!(json, "card");
    }
}
