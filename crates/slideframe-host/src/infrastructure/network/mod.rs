//! Network adapters.
//!
//! - **`dispatcher`**     – retrying delivery of settings to remote frames.
//! - **`http_transport`** – the `reqwest` transport underneath it.
//! - **`self_identify`**  – local interface enumeration for operator display.

pub mod dispatcher;
pub mod http_transport;
pub mod self_identify;
