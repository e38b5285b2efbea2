//! Payment gateway adapter and callback reconciler.

use std::time::Duration;

use common::OrderId;
use domain::{signature, Identity, Money, Order, PaymentIntent, PaymentStatus};
use store::{CaptureCommit, FailIntentOutcome, Store};

use crate::error::CheckoutError;
use crate::gateway::{CreateIntentRequest, GatewayError, PaymentGateway};

/// Deployment-fixed payment settings.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// ISO currency code every session settles in.
    pub currency: String,

    /// Shared secret the gateway signs callbacks with.
    pub gateway_secret: String,

    /// Upper bound on a gateway call.
    pub gateway_timeout: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            gateway_secret: "dev_gateway_secret".to_string(),
            gateway_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle returned to the client for driving the gateway's checkout UI.
#[derive(Debug, Clone)]
pub struct OpenedPayment {
    /// Gateway-issued session reference.
    pub gateway_order_id: String,

    /// Amount the session settles, in minor units.
    pub amount: Money,

    /// Currency code.
    pub currency: String,
}

/// Opens gateway sessions and reconciles their signed callbacks.
///
/// The gateway is an injected capability; no trusted call is ever made to
/// confirm a payment. Confirmation rests entirely on the HMAC signature
/// the gateway computes and the client relays.
#[derive(Clone)]
pub struct PaymentService<S, G> {
    store: S,
    gateway: G,
    config: PaymentConfig,
}

impl<S: Store, G: PaymentGateway> PaymentService<S, G> {
    /// Creates a payment service over the given store and gateway.
    pub fn new(store: S, gateway: G, config: PaymentConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// Opens a gateway payment session for an order the caller owns.
    ///
    /// The supplied amount must equal the order total; the client never
    /// dictates what is charged. The gateway call runs under a bounded
    /// timeout, and the intent is persisted before the session reference
    /// is handed back.
    #[tracing::instrument(skip(self, requester), fields(requester = %requester.subject))]
    pub async fn open_payment(
        &self,
        requester: Identity,
        order_id: OrderId,
        amount: Money,
    ) -> Result<OpenedPayment, CheckoutError> {
        let order = self.owned_order(order_id, requester).await?;

        if order.payment_status != PaymentStatus::Pending {
            return Err(CheckoutError::Conflict(format!(
                "order {} payment is already {}",
                order.id, order.payment_status
            )));
        }
        if amount != order.total_amount {
            return Err(CheckoutError::AmountMismatch {
                expected: order.total_amount,
                supplied: amount,
            });
        }

        let request = CreateIntentRequest {
            amount: order.total_amount,
            currency: self.config.currency.clone(),
            receipt: format!("order_{}", order.id),
        };

        let created = tokio::time::timeout(
            self.config.gateway_timeout,
            self.gateway.create_intent(request),
        )
        .await
        .map_err(|_| {
            CheckoutError::GatewayUnavailable(format!(
                "create_intent timed out after {:?}",
                self.config.gateway_timeout
            ))
        })?
        .map_err(|err| match err {
            GatewayError::Unavailable(msg) => CheckoutError::GatewayUnavailable(msg),
            GatewayError::Rejected(msg) => {
                CheckoutError::Internal(format!("gateway rejected session: {msg}"))
            }
        })?;

        let intent = PaymentIntent::open(
            order.id,
            created.gateway_order_id,
            order.total_amount,
            self.config.currency.clone(),
        );
        self.store
            .insert_intent(&intent)
            .await
            .map_err(CheckoutError::from_store("open_payment"))?;

        metrics::counter!("payment_intents_opened_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            gateway_order_id = %intent.gateway_order_id,
            "payment session opened"
        );

        Ok(OpenedPayment {
            gateway_order_id: intent.gateway_order_id,
            amount: intent.amount,
            currency: intent.currency,
        })
    }

    /// Reconciles a client-relayed gateway callback.
    ///
    /// Everything in the callback is untrusted except what the signature
    /// proves. A verified signature commits the intent capture and the
    /// order's payment completion as one unit; a mismatch fails only the
    /// intent and leaves the order open for another attempt. Repeating a
    /// verified callback returns the settled order unchanged.
    #[tracing::instrument(
        skip(self, requester, gateway_payment_id, supplied_signature),
        fields(requester = %requester.subject)
    )]
    pub async fn verify_payment(
        &self,
        requester: Identity,
        order_id: OrderId,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        supplied_signature: &str,
    ) -> Result<Order, CheckoutError> {
        let order = self.owned_order(order_id, requester).await?;

        let intent = self
            .store
            .get_intent(gateway_order_id)
            .await
            .map_err(CheckoutError::from_store("verify_payment"))?;
        let Some(intent) = intent else {
            // An unknown reference gets the same answer as a bad
            // signature, so a prober learns nothing about issued ids.
            metrics::counter!("payments_failed_total").increment(1);
            return Err(CheckoutError::VerificationFailed);
        };
        if intent.order_id != order.id {
            return Err(CheckoutError::Conflict(format!(
                "payment session {gateway_order_id} does not belong to order {order_id}"
            )));
        }

        if !signature::verify(
            &self.config.gateway_secret,
            gateway_order_id,
            gateway_payment_id,
            supplied_signature,
        ) {
            let outcome = self
                .store
                .fail_intent(gateway_order_id)
                .await
                .map_err(CheckoutError::from_store("verify_payment"))?;
            if outcome == FailIntentOutcome::Applied {
                metrics::counter!("payments_failed_total").increment(1);
                tracing::warn!(
                    order_id = %order.id,
                    gateway_order_id,
                    "callback signature mismatch, intent failed"
                );
            }
            return Err(CheckoutError::VerificationFailed);
        }

        let commit = self
            .store
            .commit_capture(gateway_order_id, gateway_payment_id, supplied_signature)
            .await
            .map_err(CheckoutError::from_store("verify_payment"))?;

        if let CaptureCommit::Applied { ref order, .. } = commit {
            metrics::counter!("payments_captured_total").increment(1);
            tracing::info!(
                order_id = %order.id,
                gateway_order_id,
                "payment captured"
            );
        }

        Ok(commit.into_order())
    }

    async fn owned_order(
        &self,
        order_id: OrderId,
        requester: Identity,
    ) -> Result<Order, CheckoutError> {
        let order = self
            .store
            .get_order(order_id)
            .await
            .map_err(CheckoutError::from_store("get_order"))?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !order.is_owned_by(requester.subject) {
            return Err(CheckoutError::Forbidden(order_id));
        }

        Ok(order)
    }
}
