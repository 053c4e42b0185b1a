//! Integration tests for the weave perspectives runtime

mod capability_bridge;
mod perspective_links;
mod registry_persistence;
mod remote_dispatch;
mod support;
