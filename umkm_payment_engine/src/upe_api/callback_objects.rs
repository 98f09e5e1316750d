use std::{collections::HashSet, fmt::Display, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{
    db_types::OrderId,
    traits::{OrderPaymentOutcome, PaymentGatewayError},
};

/// A payment notification, as posted by the gateway.
///
/// Only the fields the ledger consumes are modelled. Everything else in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCallback {
    /// The gateway-side transaction id (`TRX-...`). One gateway transaction can pay for several orders.
    pub order_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub status_code: String,
    #[serde(deserialize_with = "string_or_number")]
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    /// JSON-encoded array of the internal order ids this transaction covers.
    #[serde(default)]
    pub custom_field1: Option<String>,
}

/// Accepts `"200"` as well as `200`, keeping the exact textual form, since the signature is computed over it.
/// Fractional numbers are rejected: their original text cannot be recovered once parsed.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct Visitor;

    impl<'de> de::Visitor<'de> for Visitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Err(E::invalid_type(de::Unexpected::Float(v), &"a string or an integer"))
        }
    }

    deserializer.deserialize_any(Visitor)
}

//--------------------------------------    GatewayOutcome     ---------------------------------------------------------
/// What a gateway `transaction_status` means for the orders it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayOutcome {
    Paid,
    Failed,
    /// Acknowledged, but not applied.
    Pending,
}

impl GatewayOutcome {
    /// Maps the gateway vocabulary onto an outcome. A `capture` that the gateway's fraud screening flagged as
    /// `challenge` is still pending until the gateway follows up with a settlement or a denial.
    pub fn from_status(transaction_status: &str, fraud_status: Option<&str>) -> Self {
        match (transaction_status, fraud_status) {
            ("capture", Some("challenge")) => GatewayOutcome::Pending,
            ("capture", Some("deny")) => GatewayOutcome::Failed,
            ("capture" | "settlement", _) => GatewayOutcome::Paid,
            ("deny" | "cancel" | "expire", _) => GatewayOutcome::Failed,
            _ => GatewayOutcome::Pending,
        }
    }
}

impl Display for GatewayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayOutcome::Paid => write!(f, "paid"),
            GatewayOutcome::Failed => write!(f, "failed"),
            GatewayOutcome::Pending => write!(f, "pending"),
        }
    }
}

//--------------------------------------      OrderIdList      ---------------------------------------------------------
/// The validated list of internal order ids carried in a callback's `custom_field1`.
///
/// The wire format is a JSON array whose elements are positive integers or numeric strings, e.g. `[12, "13"]`.
/// Duplicates are dropped, keeping the first occurrence. An absent field, `null` and `[]` all parse to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderIdList(Vec<OrderId>);

impl OrderIdList {
    pub fn ids(&self) -> &[OrderId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for OrderIdList {
    type Err = PaymentGatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let raw: Option<Vec<serde_json::Value>> =
            serde_json::from_str(s).map_err(|e| PaymentGatewayError::MalformedOrderIds(e.to_string()))?;
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for value in raw.unwrap_or_default() {
            let id = match &value {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .filter(|id| *id > 0)
            .ok_or_else(|| PaymentGatewayError::MalformedOrderIds(format!("{value} is not a valid order id")))?;
            if seen.insert(id) {
                ids.push(OrderId(id));
            }
        }
        Ok(Self(ids))
    }
}

//--------------------------------------  ReconciliationReport ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct OrderFailure {
    pub order_id: OrderId,
    pub error: PaymentGatewayError,
}

/// The per-order results of processing one gateway callback.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub transaction_id: String,
    pub outcome: GatewayOutcome,
    pub applied: Vec<OrderPaymentOutcome>,
    /// Ids in the callback that do not refer to an existing order.
    pub missing: Vec<OrderId>,
    pub failures: Vec<OrderFailure>,
}

impl ReconciliationReport {
    pub fn new(transaction_id: &str, outcome: GatewayOutcome) -> Self {
        Self { transaction_id: transaction_id.to_string(), outcome, applied: vec![], missing: vec![], failures: vec![] }
    }

    pub fn credited(&self) -> usize {
        self.applied.iter().filter(|o| o.is_credit()).count()
    }

    /// True if any order failed for a reason that a redelivery of the same callback could fix.
    pub fn needs_retry(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_internal())
    }
}
