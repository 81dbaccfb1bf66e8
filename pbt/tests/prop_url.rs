//! URL パースのプロパティテスト

use blocking_http11::{ErrorKind, UrlComponents};
use pbt::{fragment, host, path, port, query};
use proptest::prelude::*;

fn build(host: &str, port: u16, path: &str, query: &str) -> String {
    let mut url = format!("http://{}", host);
    if port != 0 {
        url.push_str(&format!(":{}", port));
    }
    url.push_str(path);
    if !query.is_empty() {
        url.push('?');
        url.push_str(query);
    }
    url
}

// パースして再構成すると (フラグメントを除いて) 元に戻る
proptest! {
    #[test]
    fn url_reserialize(
        host in host(),
        port in port(),
        path in path(),
        query in prop_oneof![Just(String::new()), query()],
        fragment in prop_oneof![Just(String::new()), fragment()],
    ) {
        let base = build(&host, port, &path, &query);
        let input = if fragment.is_empty() {
            base.clone()
        } else {
            format!("{}#{}", base, fragment)
        };

        let url = UrlComponents::parse(&input).unwrap();
        prop_assert_eq!(url.host(), host.as_str());
        prop_assert_eq!(url.port(), port);
        prop_assert_eq!(url.path(), path.as_str());
        prop_assert_eq!(url.query(), query.as_str());
        prop_assert_eq!(url.fragment(), fragment.as_str());
        prop_assert_eq!(url.to_string(), base);
        prop_assert!(!url.request_target().contains('#'));
    }
}

// 既定ポートへの読み替え
proptest! {
    #[test]
    fn url_effective_port(host in host(), port in port()) {
        let url = UrlComponents::parse(&build(&host, port, "/", "")).unwrap();
        let expected = if port == 0 { 80 } else { port };
        prop_assert_eq!(url.effective_port(), expected);
    }
}

// http 以外のスキームは拒否
proptest! {
    #[test]
    fn url_other_scheme_rejected(scheme in "[a-z][a-z0-9+.-]{0,8}", host in host()) {
        prop_assume!(!scheme.eq_ignore_ascii_case("http"));
        let err = UrlComponents::parse(&format!("{}://{}/x", scheme, host)).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::UnsupportedScheme);
    }
}

// 範囲外のポートや数字以外を含むポートは拒否
proptest! {
    #[test]
    fn url_bad_port_rejected(host in host(), port in prop_oneof![
        Just("0".to_string()),
        (65536u32..1_000_000).prop_map(|p| p.to_string()),
        "[0-9]{1,4}[a-z]{1,3}",
    ]) {
        let err = UrlComponents::parse(&format!("http://{}:{}/x", host, port)).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::MalformedUrl);
    }
}

// 任意の文字列でパニックしない
proptest! {
    #[test]
    fn url_parse_never_panics(input in "\\PC{0,64}") {
        let _ = UrlComponents::parse(&input);
    }
}

#[test]
fn url_malformed_examples() {
    assert_eq!(
        UrlComponents::parse("ftp://host/x").unwrap_err().kind(),
        ErrorKind::UnsupportedScheme
    );
    assert_eq!(
        UrlComponents::parse("http:/host").unwrap_err().kind(),
        ErrorKind::MalformedUrl
    );
    assert_eq!(
        UrlComponents::parse("http://").unwrap_err().kind(),
        ErrorKind::MalformedUrl
    );
    assert_eq!(
        UrlComponents::parse("host:0/path").unwrap_err().kind(),
        ErrorKind::MalformedUrl
    );
}
