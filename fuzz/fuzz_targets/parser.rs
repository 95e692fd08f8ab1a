#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|source: &str| {
    if let Ok(sexps) = vulcan::read_all(source) {
        // Printing what was read and reading it again must give the same forms
        let printed = sexps.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        let reread = vulcan::read_all(&printed).expect("printed forms should read back");
        assert_eq!(sexps, reread);
    }
    let _ = vulcan::parse(source);
});
