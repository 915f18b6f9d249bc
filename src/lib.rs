//! wechat-notify: send a text notification through the WeCom (Qiye WeChat)
//! enterprise gateway.
//!
//! One invocation is one stateless round trip pair: exchange the corp id and
//! secret for an access token, then post a text message to users,
//! departments, or tags. The result is a JSON report for the calling task
//! runner.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod gateway;
pub mod invocation;
pub mod logging;
pub mod redactor;
