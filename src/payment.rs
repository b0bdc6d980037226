//! x402 payment-required handling.
//!
//! A server that wants payment answers `402` with a [`PaymentRequiredBody`]
//! listing the requirements it accepts. The client hands one of them to a
//! [`PaymentSigner`], which returns an opaque token, and then repeats the
//! request once with that token in the [`PAYMENT_HEADER`]. How the token is
//! produced (EIP-712, EIP-3009, anything else) is the signer's business.

use std::{future::Future, pin::Pin};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{RestError, RestResult};

pub const PAYMENT_REQUIRED_STATUS: u16 = 402;
/// Header names are matched case-insensitively; these are the lowercase
/// wire forms.
pub const PAYMENT_HEADER: &str = "x-payment";
pub const PAYMENT_RESPONSE_HEADER: &str = "x-payment-response";

/// One way of paying for the resource, as advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    #[serde(alias = "maxAmountRequired")]
    pub amount: String,
    pub pay_to: String,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<sonic_rs::Value>,
}

/// The 402 response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    #[serde(default = "default_x402_version")]
    pub x402_version: u32,
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_x402_version() -> u32 {
    1
}

impl PaymentRequiredBody {
    /// Parses a 402 body. An unparsable body or an empty `accepts` list is a
    /// protocol error.
    pub fn parse(body: &[u8]) -> RestResult<Self> {
        let parsed: Self = sonic_rs::from_slice(body)
            .map_err(|err| RestError::protocol(format!("malformed payment requirements: {err}")))?;
        if parsed.accepts.is_empty() {
            return Err(RestError::protocol(
                "payment required but no accepted payment requirements were offered",
            ));
        }
        Ok(parsed)
    }

    /// First requirement the signer is willing to pay.
    pub fn select(&self, signer: &dyn PaymentSigner) -> RestResult<&PaymentRequirements> {
        self.accepts
            .iter()
            .find(|requirements| signer.supports(requirements))
            .ok_or_else(|| {
                let offered: Vec<String> = self
                    .accepts
                    .iter()
                    .map(|r| format!("{}/{}", r.scheme, r.network))
                    .collect();
                RestError::protocol(format!("no supported payment scheme in {offered:?}"))
            })
    }
}

pub type SignFuture<'a> = Pin<Box<dyn Future<Output = RestResult<String>> + Send + 'a>>;

/// Produces the opaque token sent in [`PAYMENT_HEADER`].
pub trait PaymentSigner: Send + Sync {
    /// Whether this signer can pay `requirements`. Defaults to any.
    fn supports(&self, requirements: &PaymentRequirements) -> bool {
        let _ = requirements;
        true
    }

    fn sign<'a>(&'a self, requirements: &'a PaymentRequirements) -> SignFuture<'a>;
}

/// Signer that always returns the same token. Useful against test servers
/// that only check the header is present.
#[derive(Clone, Debug)]
pub struct StaticTokenSigner {
    token: String,
}

impl StaticTokenSigner {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl PaymentSigner for StaticTokenSigner {
    fn sign<'a>(&'a self, _requirements: &'a PaymentRequirements) -> SignFuture<'a> {
        Box::pin(async move { Ok(self.token.clone()) })
    }
}

/// Settlement details a server may attach to the paid response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl SettlementReceipt {
    /// Decodes a `X-PAYMENT-RESPONSE` header value, base64 JSON first and
    /// plain JSON second. Anything else yields `None`.
    pub fn from_header(value: &[u8]) -> Option<Self> {
        let value = std::str::from_utf8(value).ok()?.trim();
        base64::engine::general_purpose::STANDARD
            .decode(value)
            .ok()
            .and_then(|bytes| sonic_rs::from_slice::<Self>(&bytes).ok())
            .or_else(|| sonic_rs::from_str::<Self>(value).ok())
    }
}

/// A decoded value together with the settlement receipt, if the request was
/// paid for and the server sent one.
#[derive(Debug, Clone)]
pub struct Paid<T> {
    pub value: T,
    pub receipt: Option<SettlementReceipt>,
}
