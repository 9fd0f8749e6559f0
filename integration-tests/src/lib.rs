//! Test-only member; the actual tests live under `tests/`.
