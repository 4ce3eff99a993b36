//! Realtime layer integration tests

mod broadcast_test;
mod registry_test;
