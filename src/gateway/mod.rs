//! WeCom gateway clients.
//!
//! Two calls make up a notification, always in this order:
//! - [`token::TokenExchanger`]: `GET /cgi-bin/gettoken`, corp id + secret to access token
//! - [`message::MessageSender`]: `POST /cgi-bin/message/send`, text message to recipients
//!
//! Both go through the [`transport::HttpTransport`] seam and neither retries.
//! The token is handed from one to the other as a plain value; nothing is
//! cached between invocations.

pub mod endpoints;
pub mod message;
pub mod token;
pub mod transport;

pub use endpoints::{EndpointError, Endpoints, DEFAULT_BASE_URL};
pub use message::{MessageSender, Recipients, SendError, SendReceipt, TextMessage, ALL_USERS};
pub use token::{AccessToken, AuthError, TokenExchanger};
pub use transport::{HttpReply, HttpTransport, ReqwestTransport, TransportError};
