//! Transport implementations.
//!
//! - `http` - streams transfers over HTTP(S) with `reqwest`

mod http;

pub use http::{HttpTransport, HttpTransportConfig, file_name_for};
