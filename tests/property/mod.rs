//! Property-based tests for mirror naming and projection

mod naming;
