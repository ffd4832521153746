#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{
    emit, parse, validate, EmitOptions, Node, ParseOptions, StrictStrategy, ValidateOptions,
};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let outcome = parse(source, &ParseOptions::default());
    assert!(matches!(outcome.root, Node::Root { .. }));
    let _ = validate(&outcome.root, &ValidateOptions::default());
    for strategy in [
        StrictStrategy::CustomTag,
        StrictStrategy::DataAttribute,
        StrictStrategy::Passthrough,
        StrictStrategy::Strip,
    ] {
        let options = EmitOptions {
            strategy,
            source_map: true,
            ..EmitOptions::default()
        };
        let _ = emit(&outcome.root, &options);
    }
});
