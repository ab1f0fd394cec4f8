//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no real GPIO or
//! thermal zone required.

mod control_tests;
mod runtime_tests;
mod scenario_tests;
