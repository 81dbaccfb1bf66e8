#![no_main]

use blocking_http11::{Method, ResponseHead};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok((head, consumed)) = ResponseHead::parse(data, 100) {
        assert!(consumed <= data.len());
        let _ = head.version();
        let _ = head.reason();
        let _ = head.keep_alive();
        let _ = head.is_close();
        let _ = head.content_length();
        let _ = head.content_range();
        let _ = head.body_kind(Method::Get);
        assert!((100..=599).contains(&head.status()));
        for (name, _) in head.headers().iter() {
            assert!(head.header(name).is_some());
        }
    }
});
