//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! the mock ports in `mock_ports`.  No camera agent or network needed.

mod mock_ports;
mod record_store_tests;
mod sequencer_tests;
