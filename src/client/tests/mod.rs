//! Unit tests for the hub client.

mod helpers;
mod tracing;
