//! Payment intent entity: one gateway session tied to an order.

use common::{OrderId, PaymentIntentId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Money;

/// Lifecycle of a payment intent.
///
/// ```text
/// Created ──┬──► Captured
///           └──► Failed
/// ```
/// Both `Captured` and `Failed` are terminal; there is no transition
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    /// Gateway session opened, awaiting the signed callback.
    #[default]
    Created,

    /// Signature verified, funds captured (terminal state).
    Captured,

    /// Verification failed (terminal state).
    Failed,
}

impl IntentStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IntentStatus::Captured | IntentStatus::Failed)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Created => "created",
            IntentStatus::Captured => "captured",
            IntentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IntentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(IntentStatus::Created),
            "captured" => Ok(IntentStatus::Captured),
            "failed" => Ok(IntentStatus::Failed),
            other => Err(format!("unknown intent status '{other}'")),
        }
    }
}

/// Record of one payment-gateway session tied to an order.
///
/// Created when the gateway session is opened and mutated exactly once at
/// reconciliation; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Unique intent identifier.
    pub id: PaymentIntentId,

    /// The order this session settles.
    pub order_id: OrderId,

    /// Gateway-issued session reference; unique across all intents.
    pub gateway_order_id: String,

    /// Gateway payment identifier, set at capture.
    pub gateway_payment_id: Option<String>,

    /// Verified callback signature, set at capture.
    pub signature: Option<String>,

    /// Amount this session settles, in minor units.
    pub amount: Money,

    /// Deployment-fixed currency code.
    pub currency: String,

    /// Lifecycle state.
    pub status: IntentStatus,
}

impl PaymentIntent {
    /// Opens a new intent for a gateway session.
    pub fn open(
        order_id: OrderId,
        gateway_order_id: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: PaymentIntentId::new(),
            order_id,
            gateway_order_id: gateway_order_id.into(),
            gateway_payment_id: None,
            signature: None,
            amount,
            currency: currency.into(),
            status: IntentStatus::Created,
        }
    }

    /// Marks the intent captured with the verified callback data.
    pub fn capture(
        &mut self,
        gateway_payment_id: impl Into<String>,
        signature: impl Into<String>,
    ) -> Result<(), DomainError> {
        if self.status != IntentStatus::Created {
            return Err(DomainError::IllegalIntentTransition {
                from: self.status,
                to: IntentStatus::Captured,
            });
        }
        self.gateway_payment_id = Some(gateway_payment_id.into());
        self.signature = Some(signature.into());
        self.status = IntentStatus::Captured;
        Ok(())
    }

    /// Marks the intent failed.
    pub fn fail(&mut self) -> Result<(), DomainError> {
        if self.status != IntentStatus::Created {
            return Err(DomainError::IllegalIntentTransition {
                from: self.status,
                to: IntentStatus::Failed,
            });
        }
        self.status = IntentStatus::Failed;
        Ok(())
    }

    /// Returns true if this capture matches an already-captured intent,
    /// making a repeated verify call a no-op.
    pub fn is_repeat_capture(&self, gateway_payment_id: &str) -> bool {
        self.status == IntentStatus::Captured
            && self.gateway_payment_id.as_deref() == Some(gateway_payment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent() -> PaymentIntent {
        PaymentIntent::open(OrderId::new(), "pg_order_1", Money::from_minor(5000), "INR")
    }

    #[test]
    fn test_open_starts_created() {
        let intent = intent();
        assert_eq!(intent.status, IntentStatus::Created);
        assert!(intent.gateway_payment_id.is_none());
        assert!(intent.signature.is_none());
    }

    #[test]
    fn test_capture_sets_callback_fields() {
        let mut intent = intent();
        intent.capture("pay_1", "sig_1").unwrap();

        assert_eq!(intent.status, IntentStatus::Captured);
        assert_eq!(intent.gateway_payment_id.as_deref(), Some("pay_1"));
        assert_eq!(intent.signature.as_deref(), Some("sig_1"));
    }

    #[test]
    fn test_capture_is_once_only() {
        let mut intent = intent();
        intent.capture("pay_1", "sig_1").unwrap();

        let err = intent.capture("pay_2", "sig_2").unwrap_err();
        assert!(matches!(err, DomainError::IllegalIntentTransition { .. }));
        assert_eq!(intent.gateway_payment_id.as_deref(), Some("pay_1"));
    }

    #[test]
    fn test_no_transition_between_terminal_states() {
        let mut failed = intent();
        failed.fail().unwrap();
        assert!(failed.capture("pay_1", "sig_1").is_err());

        let mut captured = intent();
        captured.capture("pay_1", "sig_1").unwrap();
        assert!(captured.fail().is_err());
    }

    #[test]
    fn test_repeat_capture_detection() {
        let mut intent = intent();
        intent.capture("pay_1", "sig_1").unwrap();

        assert!(intent.is_repeat_capture("pay_1"));
        assert!(!intent.is_repeat_capture("pay_2"));
    }
}
