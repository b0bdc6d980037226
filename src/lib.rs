//! Typed JSON-over-HTTP client core.
//!
//! A [`RestClient`] is bound to one base URL. It turns a [`RequestSpec`] into a
//! single HTTP exchange and decodes the success body into the caller's type.
//! Transport, API and payment-protocol failures all come back as one
//! [`RestError`]. A `402 Payment Required` answer can be paid through a
//! [`PaymentSigner`], with exactly one retry. The transport is pluggable, and
//! [`MockRestAdapter`] makes tests fully deterministic.

pub mod adapter;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod mock;
pub mod news;
pub mod payment;
pub mod request;

pub use reqwest::Method;

pub use adapter::{
    ReqwestTransport, RestBytes, RestFuture, RestRequest, RestResponse, RestTransport,
    SharedRestTransport,
};
pub use client::RestClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_API_KEY_HEADER, DEFAULT_TIMEOUT};
pub use endpoint::{EndpointDescriptor, EndpointMethod};
pub use error::{ApiError, RestError, RestResult, TransportErrorKind};
pub use mock::{MockBehavior, MockBehaviorPlan, MockResponse, MockRestAdapter};
pub use news::NewsClient;
pub use payment::{
    PAYMENT_HEADER, PAYMENT_REQUIRED_STATUS, PAYMENT_RESPONSE_HEADER, Paid, PaymentRequiredBody,
    PaymentRequirements, PaymentSigner, SettlementReceipt, SignFuture, StaticTokenSigner,
};
pub use request::{RequestSpec, build_url, encode_query};
