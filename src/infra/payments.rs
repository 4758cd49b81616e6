//! HTTP client for the payment gateway's order API.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::payments::{
    PaymentError, PaymentGateway, PaymentOrder, PaymentOrderRequest,
};
use crate::config::PaymentsSettings;

use super::error::InfraError;

const ORDERS_PATH: &str = "/v1/orders";

#[derive(Debug, Clone)]
struct Credentials {
    key_id: String,
    key_secret: String,
}

/// Creates orders with `POST {base_url}/v1/orders`, authenticating with HTTP
/// basic auth (key id / key secret).
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    endpoint: Url,
    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
struct GatewayOrder {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    status: String,
}

impl HttpPaymentGateway {
    pub fn new(settings: &PaymentsSettings) -> Result<Self, InfraError> {
        let endpoint = settings.base_url.join(ORDERS_PATH).map_err(|err| {
            InfraError::configuration(format!("invalid payments.base_url: {err}"))
        })?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;

        let credentials = match (&settings.key_id, &settings.key_secret) {
            (Some(key_id), Some(key_secret)) => Some(Credentials {
                key_id: key_id.clone(),
                key_secret: key_secret.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            client,
            endpoint,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn user_agent() -> &'static str {
        concat!("larder/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        request: PaymentOrderRequest,
    ) -> Result<PaymentOrder, PaymentError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(PaymentError::NotConfigured)?;

        debug!(
            target = "larder::payments",
            amount = request.amount,
            currency = %request.currency,
            "Creating gateway order"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&credentials.key_id, Some(&credentials.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes).into_owned();
            warn!(
                target = "larder::payments",
                status = status.as_u16(),
                body = %message,
                "Gateway rejected order"
            );
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let order: GatewayOrder = serde_json::from_slice(&bytes)
            .map_err(|err| PaymentError::Decode(err.to_string()))?;

        Ok(PaymentOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            status: order.status,
        })
    }
}
