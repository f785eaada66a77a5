//! Shared test utilities for consult-db unit tests.
