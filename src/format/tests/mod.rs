//! Unit tests for the persistence formats.
//!
//! These cover byte-level round-trips, the version gate, and file-backed
//! package flows that the in-module tests leave out.

mod roundtrip_tests;
mod stream_file_tests;
