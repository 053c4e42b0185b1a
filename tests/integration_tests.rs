//! Integration tests for the weave perspectives runtime

mod integration;
