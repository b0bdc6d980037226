use std::{fmt, sync::Arc, time::Duration};

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::adapter::{ReqwestTransport, RestRequest, RestResponse, RestTransport, SharedRestTransport};
use crate::config::ClientConfig;
use crate::error::{ApiError, RestError, RestResult};
use crate::payment::{
    PAYMENT_HEADER, PAYMENT_REQUIRED_STATUS, PAYMENT_RESPONSE_HEADER, Paid, PaymentRequiredBody,
    PaymentSigner, SettlementReceipt,
};
use crate::request::RequestSpec;

fn json_mime() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// Typed JSON client bound to one base URL.
///
/// Cloning is cheap and clones share the transport. A client holds no
/// per-request state, so one instance can serve any number of concurrent
/// callers.
#[derive(Clone)]
pub struct RestClient {
    config: Arc<ClientConfig>,
    transport: SharedRestTransport,
    signer: Option<Arc<dyn PaymentSigner>>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .field("payment_signer", &self.signer.is_some())
            .finish()
    }
}

impl RestClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> RestResult<Self> {
        let mut builder = ClientConfig::builder(base_url).maybe_api_key(api_key);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::from_config(builder.build()?))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_transport(config, ReqwestTransport::new())
    }

    pub fn with_transport<T>(config: ClientConfig, transport: T) -> Self
    where
        T: RestTransport + 'static,
    {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            signer: None,
        }
    }

    /// Answers `402 Payment Required` with one signed retry.
    pub fn with_payment_signer<S>(mut self, signer: S) -> Self
    where
        S: PaymentSigner + 'static,
    {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `spec` and decodes a success body as `T`.
    pub async fn request<T>(&self, spec: RequestSpec) -> RestResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.request_response(spec).await?;
        decode(&response)
    }

    /// Like [`request`](Self::request), also returning the settlement receipt
    /// when the call was paid for.
    pub async fn request_with_receipt<T>(&self, spec: RequestSpec) -> RestResult<Paid<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.request_response(spec).await?;
        let value = decode(&response)?;
        let receipt = response
            .header(PAYMENT_RESPONSE_HEADER)
            .and_then(SettlementReceipt::from_header);
        Ok(Paid { value, receipt })
    }

    pub async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> RestResult<T>
    where
        T: DeserializeOwned,
    {
        let spec = RequestSpec::get(path).with_query_pairs(query.iter().copied());
        self.request(spec).await
    }

    pub async fn post_json<T, B>(&self, path: &str, payload: &B) -> RestResult<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let spec = RequestSpec::post(path).with_json_body(payload)?;
        self.request(spec).await
    }

    /// Sends `spec` and returns the raw success response, running the
    /// payment flow on a 402 when a signer is configured.
    pub async fn request_response(&self, spec: RequestSpec) -> RestResult<RestResponse> {
        let request = self.build_request(&spec)?;
        let response = self.send(request.clone()).await?;

        if response.status == PAYMENT_REQUIRED_STATUS {
            if let Some(signer) = self.signer.as_deref() {
                return self.pay_and_retry(signer, request, response).await;
            }
        }

        ensure_success(response)
    }

    fn build_request(&self, spec: &RequestSpec) -> RestResult<RestRequest> {
        let url = spec.url(self.config.base_url())?;
        let mut request = RestRequest::new(spec.method.clone(), url)
            .with_header(ACCEPT, json_mime())
            .with_timeout(self.config.timeout());

        if let Some((name, value)) = self.config.api_key_header() {
            request = request.with_header(name.clone(), value.clone());
        }
        if let Some(agent) = self.config.user_agent() {
            request = request.with_header(USER_AGENT, agent.clone());
        }
        if let Some(body) = &spec.body {
            request = request
                .with_header(CONTENT_TYPE, json_mime())
                .with_body(body.clone());
        }

        Ok(request)
    }

    async fn send(&self, request: RestRequest) -> RestResult<RestResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        match self.transport.execute(request).await {
            Ok(response) => {
                debug!(
                    %method,
                    %url,
                    status = response.status,
                    elapsed_ms = response.elapsed.as_millis() as u64,
                    "rest request completed"
                );
                Ok(response)
            }
            Err(err) => {
                warn!(%method, %url, error = %err, "rest request failed");
                Err(err)
            }
        }
    }

    async fn pay_and_retry(
        &self,
        signer: &dyn PaymentSigner,
        request: RestRequest,
        response: RestResponse,
    ) -> RestResult<RestResponse> {
        let required = PaymentRequiredBody::parse(response.body())?;
        let requirements = required.select(signer)?;
        let token = signer
            .sign(requirements)
            .await
            .map_err(|err| RestError::protocol(format!("payment signing failed: {err}")))?;
        let token = HeaderValue::try_from(token)
            .map_err(|_| RestError::protocol("payment token is not a valid header value"))?;

        info!(
            url = %request.url,
            scheme = %requirements.scheme,
            network = %requirements.network,
            amount = %requirements.amount,
            "payment required, retrying once with signed payment"
        );

        let paid = request.with_header(HeaderName::from_static(PAYMENT_HEADER), token);
        let response = self.send(paid).await?;
        ensure_success(response)
    }
}

fn ensure_success(response: RestResponse) -> RestResult<RestResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_status(response.status, response.body).into())
    }
}

fn decode<T: DeserializeOwned>(response: &RestResponse) -> RestResult<T> {
    sonic_rs::from_slice(response.body()).map_err(|err| {
        ApiError::decode_failure(response.status, err, response.body.clone()).into()
    })
}
