// tests/common/mod.rs

#![allow(dead_code)]

pub use runboard_test_utils::builders;
pub use runboard_test_utils::fake_backend;
pub use runboard_test_utils::{eventually, init_tracing, with_timeout};
