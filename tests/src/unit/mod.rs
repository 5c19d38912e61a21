mod adapter_tests;
mod state_tests;
