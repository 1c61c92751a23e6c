// crates/lti-bridge-core/tests/score_properties.rs
// ============================================================================
// Module: Score Property Tests
// Description: Property checks for weighted grade application.
// ============================================================================
//! ## Overview
//! For any valid raw score and weight, the cached score equals the product
//! and the ledger sees the same value before the cache does.

#![allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "Test-only assertions."
)]

mod common;

use lti_bridge_core::RawScore;
use lti_bridge_core::RealUser;
use lti_bridge_core::runtime::GradeKeeper;
use proptest::prelude::*;

proptest! {
    #[test]
    fn applied_score_equals_raw_times_weight(raw in 0.0f64 ..= 1.0, weight in 0.0f64 .. 1000.0) {
        let fixture = common::Fixture::build(common::component(true, weight), &[]);
        let user = RealUser::new(common::USER);
        let state = GradeKeeper::new(&fixture.ledger, &fixture.store)
            .set_user_module_score(&fixture.component, &user, RawScore::new(raw).unwrap(), "")
            .unwrap();
        prop_assert_eq!(state.module_score, Some(raw * weight));
        prop_assert_eq!(fixture.state().module_score, Some(raw * weight));
        prop_assert_eq!(fixture.ledger.events()[0].value, Some(raw * weight));
        prop_assert_eq!(fixture.ledger.events()[0].max_value, Some(weight));
    }

    #[test]
    fn scores_outside_unit_interval_are_rejected(raw in prop_oneof![-1000.0f64 .. -1e-9, 1.000_001f64 .. 1000.0]) {
        prop_assert!(RawScore::new(raw).is_err());
    }
}
