#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{format, FormatOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let options = FormatOptions::default();
    let (once, _) = format(source, &options);
    let (twice, _) = format(&once, &options);
    assert_eq!(once, twice);
});
