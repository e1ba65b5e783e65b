//! Fixtures and assertions for testing analyses.
//!
//! - **Fixtures**: a sample retail CSV with known cleaning outcomes and
//!   builders for canonical transactions
//! - **Assertions**: float comparison with a tolerance and ordering checks
//!   for sorted results
//!
//! # Quick Start
//!
//! ```
//! use ironcart::basket::{BasketParams, mine_rules};
//! use ironcart::testing::*;
//!
//! let params = BasketParams { min_support: 0.5, min_confidence: 0.5, min_lift: 1.0 };
//! let res = mine_rules(&bread_milk_transactions(), &params);
//!
//! assert_rules_sorted(&res.rules);
//! assert_close(res.rules[0].confidence, 1.0, EPSILON);
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
