//! Shared test utilities for docket-db tests.
