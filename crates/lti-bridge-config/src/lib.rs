// crates/lti-bridge-config/src/lib.rs
// ============================================================================
// Module: LTI Bridge Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for lti-bridge.toml semantics.
// Dependencies: lti-bridge-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `lti-bridge-config` defines the configuration model for the standalone
//! LTI bridge service: server binding, audit output, course passports, tool
//! placements, and the anonymous-id user directory. Validation is strict and
//! fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
