#![no_main]
use libfuzzer_sys::fuzz_target;

use pyxtract_core::{find_cookie, parse_toc, CookieLayout, Overlay, COOKIE_SIZE};

fuzz_target!(|data: &[u8]| {
    // Random tables decode or fail, but never past the data they were given
    if let Ok(entries) = parse_toc(data, 0, 0) {
        assert!(entries.len() <= data.len() / pyxtract_core::ENTRY_HEAD_SIZE);
    }

    let mut src = data;
    if let Ok(cookie_pos) = find_cookie(&mut src) {
        let cookie = &data[cookie_pos as usize..];
        let layout = CookieLayout::detect(cookie.get(COOKIE_SIZE..).unwrap_or_default());
        if let Ok(overlay) = Overlay::new(cookie, layout, cookie_pos, data.len() as u64) {
            assert!(overlay.toc_pos + overlay.toc_len <= data.len() as u64);
            let toc = &data[overlay.toc_pos as usize..][..overlay.toc_len as usize];
            let _ = overlay.entries(toc);
        }
    }
});
