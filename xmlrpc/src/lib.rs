//! XML-RPC for Rust
//!
//! Re-exports the value codec, message layer, dispatcher and client from
//! `xmlrpc-core` under a single crate name.
//!
//! ```
//! use xmlrpc::{Request, Value};
//!
//! let request = Request::new("add", vec![Value::Int(1), Value::Int(2)]).unwrap();
//! assert_eq!(request.method_name().unwrap(), "add");
//! ```

pub use xmlrpc_core::*;
