#![allow(dead_code)]

pub mod config;
pub mod mock_backend;
pub mod server;

/// Token the default test configuration accepts
pub const API_KEY: &str = "test-key";

pub const DEFAULT_MODEL: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";
pub const FALLBACK_MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";
