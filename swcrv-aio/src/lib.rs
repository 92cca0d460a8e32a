// swcrv-aio/src/lib.rs
//! IO operations for swcrv (filesystem, json, checksums, processes)

pub mod checksum;
pub mod fs;
pub mod json_io;
pub mod process;

pub use checksum::{digests_match, sha256_file};
pub use fs::*;
pub use json_io::{read_json, to_json_bytes};
pub use process::{run_command_async, run_command_streaming};
