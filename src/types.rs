//! Core types shared across the crate.

/// Address of a link language, as found in a neighbourhood binding.
pub type LanguageAddress = String;

/// Content address produced by the host hasher (hex-encoded blake3).
pub type ContentAddress = String;

/// Identifier of a perspective.
pub type PerspectiveId = uuid::Uuid;
