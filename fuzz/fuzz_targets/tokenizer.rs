#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{LineIndex, Tokenizer};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let index = LineIndex::new(source);
    let (eager, eager_diagnostics) = Tokenizer::new(source, &index).tokenize_all();

    let mut lazy_tokenizer = Tokenizer::new(source, &index);
    let mut lazy = Vec::new();
    while let Some(token) = lazy_tokenizer.next_token() {
        lazy.push(token);
    }
    assert_eq!(eager, lazy);
    assert_eq!(eager_diagnostics, lazy_tokenizer.take_diagnostics());
});
