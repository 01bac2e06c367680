//! Integration Tests
//!
//! End-to-end runs of the analysis service against a scripted provider.
//!
//! ## Test Organization
//!
//! - `coordinator_test` - Event sequences for completed and failed analyses
//! - `cancellation_test` - Cancellation, shutdown and consumer disconnect
//! - `service_test` - Result replay and provider health

mod support;

mod cancellation_test;
mod coordinator_test;
mod service_test;
