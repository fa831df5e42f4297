//! Service tests for the generation capability

mod api_keys;
