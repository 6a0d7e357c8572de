//! skillup-core: question model, normalizer, exam state machine and scoring.
//!
//! Everything here is synchronous apart from the [`driver`], which ties a
//! [`traits::TestSource`] stream, a countdown and user commands together.

pub mod driver;
pub mod exam;
pub mod model;
pub mod normalize;
pub mod questions;
pub mod scoring;
pub mod session;
pub mod store;
pub mod traits;
