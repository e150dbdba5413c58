//! Fuzz test for the module reader
//!
//! Feeds arbitrary bytes to the reader looking for panics. Anything the
//! reader accepts must survive a write/read round trip with a stable encoding.
//!
//! Run with: cargo +nightly fuzz run module_reader_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use registrar_bytecode::{read_module, write_module};

fuzz_target!(|data: &[u8]| {
    let Ok(module) = read_module(data) else {
        return;
    };

    // Accepted input may still carry code the writer rejects (for example
    // unbalanced stacks); only successful writes are checked further.
    let Ok(first) = write_module(&module) else {
        return;
    };
    let reread = read_module(&first).expect("writer output must be readable");
    let second = write_module(&reread).expect("re-read module must be writable");
    assert_eq!(first, second, "writer output must be a fixed point");
});
