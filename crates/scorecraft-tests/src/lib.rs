//! End-to-end integration tests for the score compiler and voice engine.
//!
//! No public API of its own — see `tests/` for the actual test suites:
//! `parser_conformance`, `sequencer_properties`, and `render_scenarios`.
