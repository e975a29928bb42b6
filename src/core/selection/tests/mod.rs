//! Selection tests

mod selector_tests;
