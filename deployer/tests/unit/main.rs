//! Integration tests against the public API

mod test_checkout;
mod test_server;
