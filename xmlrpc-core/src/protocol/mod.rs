//! Request and response envelopes
//!
//! - [`Request`]: `<methodCall>` with a method name and ordered parameters
//! - [`Response`]: `<methodResponse>` with a return value or a fault
//!
//! Both wrap a [`Message`], which owns the parsed document.

pub mod message;
pub mod request;
pub mod response;

pub use message::Message;
pub use request::{Request, RequestOptions};
pub use response::{Response, ResponseOptions};
