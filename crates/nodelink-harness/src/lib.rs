//! Cross-component integration tests for the nodelink workspace.
//!
//! This crate carries no library code of its own; it exists so the
//! end-to-end scenarios under `tests/` can depend on every other
//! `nodelink-*` crate as ordinary dev-dependencies, exercising them wired
//! together the way a real slave or server process would rather than in
//! isolation.
