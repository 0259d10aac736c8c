//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the dispatcher against the
//! recording mock node.  All tests run on the host with no radio, flash or
//! sensor attached.

mod acquisition_tests;
mod dispatcher_tests;
mod mock_node;
mod node_adapter_tests;
mod provisioning_flow_tests;
