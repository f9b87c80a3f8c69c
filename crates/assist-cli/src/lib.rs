//! Library wrapper around the `spring-assist` CLI implementation.
//!
//! The CLI is exercised through its binary (`src/main.rs`) and the integration tests.
//! Compiling the binary root as a module here keeps `cargo test -p assist-cli --lib`
//! a fast typecheck of the CLI code.

#[allow(dead_code)]
#[path = "main.rs"]
mod main_bin;
