//! the test_utils folder here shares helpers between unit tests
mod common;

pub use common::*;
