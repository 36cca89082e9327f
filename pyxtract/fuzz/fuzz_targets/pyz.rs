#![no_main]
use libfuzzer_sys::fuzz_target;

use pyxtract_core::{marshal, PyzToc};

fuzz_target!(|data: &[u8]| {
    let _ = marshal::loads(data);

    if let Ok((_, toc)) = PyzToc::parse(data) {
        for entry in toc.entries() {
            let _ = entry.end();
        }
    }
});
