//! Test doubles shared across the workspace (feature `test-utils`).

pub mod mocks;
