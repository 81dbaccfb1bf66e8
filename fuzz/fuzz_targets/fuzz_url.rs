#![no_main]

use blocking_http11::UrlComponents;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // UTF-8 文字列として解釈できる場合のみテスト
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(url) = UrlComponents::parse(s) {
            let _ = url.effective_port();
            let target = url.request_target();
            assert!(target.starts_with('/'));
            assert!(!target.contains('#'));

            // 再構成した URL は同じ内容にパースされる
            let reparsed =
                UrlComponents::parse(&url.to_string()).expect("reserialized URL must parse");
            assert_eq!(reparsed.host(), url.host());
            assert_eq!(reparsed.port(), url.port());
            assert_eq!(reparsed.path(), url.path());
            assert_eq!(reparsed.query(), url.query());
        }
    }
});
