//! Payment gateway capability and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::Money;
use thiserror::Error;

/// Errors returned by a payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached (retryable).
    #[error("gateway unreachable: {0}")]
    Unavailable(String),

    /// The gateway refused the request.
    #[error("gateway rejected request: {0}")]
    Rejected(String),
}

/// Request to open a gateway payment session.
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    /// Amount to settle, in minor units.
    pub amount: Money,

    /// Deployment-fixed currency code.
    pub currency: String,

    /// Merchant receipt reference.
    pub receipt: String,
}

/// Reference to an opened gateway session.
///
/// No further trusted call is made to the gateway; confirmation arrives
/// only via the client-relayed signed callback.
#[derive(Debug, Clone)]
pub struct GatewayIntent {
    /// Gateway-issued session reference.
    pub gateway_order_id: String,
}

/// Capability for opening payment sessions with the external gateway.
///
/// Injected explicitly into `PaymentService` so tests can substitute it;
/// there is no ambient gateway client.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment session for the given amount.
    async fn create_intent(&self, request: CreateIntentRequest)
    -> Result<GatewayIntent, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<String, CreateIntentRequest>,
    next_id: u32,
    fail_on_create: bool,
    create_delay: Option<Duration>,
}

/// In-memory gateway for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the gateway to stall create calls for `delay`.
    pub fn set_create_delay(&self, delay: Duration) {
        self.state.write().unwrap().create_delay = Some(delay);
    }

    /// Returns the number of opened sessions.
    pub fn session_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// Returns true if a session exists with the given reference.
    pub fn has_session(&self, gateway_order_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .sessions
            .contains_key(gateway_order_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<GatewayIntent, GatewayError> {
        // Read the delay before locking; the guard must not live across
        // the await point.
        let delay = self.state.read().unwrap().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }

        state.next_id += 1;
        let gateway_order_id = format!("pg_order_{:04}", state.next_id);
        state.sessions.insert(gateway_order_id.clone(), request);

        Ok(GatewayIntent { gateway_order_id })
    }
}
