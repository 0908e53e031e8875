//! Property-based tests

mod retry_proptest;
mod store_proptest;
