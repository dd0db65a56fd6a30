//! Property tests for headers, URIs and the identity rules of `with_*` operations.

use micro_message::protocol::{HeaderCollection, HttpMessage, Request, Response};
use micro_message::uri::Uri;
use proptest::prelude::*;

fn init_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}

fn arb_header_name() -> impl Strategy<Value = String> {
    "x-[a-zA-Z][a-zA-Z0-9-]{0,12}"
}

fn arb_header_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/;=.,]{1,24}"
}

fn arb_uri() -> impl Strategy<Value = String> {
    "(http|https|ftp|ws)://[a-zA-Z][a-zA-Z0-9.-]{0,10}(:[0-9]{1,5})?(/[a-zA-Z0-9%._~ -]{0,8}){0,3}(\\?[a-z0-9=&% ]{0,12})?(#[a-z]{0,6})?"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Lookups ignore the casing used on insertion and on lookup.
    #[test]
    fn header_lookup_is_case_insensitive(name in arb_header_name(), value in arb_header_value()) {
        let headers = HeaderCollection::new().with(&name, value.as_str());

        prop_assert!(headers.has(&name.to_uppercase()));
        prop_assert_eq!(headers.get(&name.to_lowercase()), [value.clone()]);
        prop_assert_eq!(headers.line(&name.to_uppercase()), value);
    }

    /// Adding then removing a header yields an equal message, leaving the original untouched.
    #[test]
    fn with_then_without_restores(name in arb_header_name(), value in arb_header_value()) {
        init_test_logging();
        let response = Response::builder().header("Content-Type", "text/plain").build().unwrap();

        let added = response.with_header(&name, value.as_str()).unwrap();
        let removed = added.without_header(&name.to_uppercase());

        prop_assert!(added.has_header(&name));
        prop_assert!(!response.has_header(&name));
        prop_assert_eq!(removed.headers(), response.headers());
    }

    /// Setting a header to its current values keeps the same instance.
    #[test]
    fn unchanged_header_keeps_instance(name in arb_header_name(), value in arb_header_value()) {
        let request = Request::new("GET", "http://example.com/").unwrap().with_header(&name, value.as_str()).unwrap();
        let again = request.with_header(&name.to_uppercase(), value.as_str()).unwrap();
        prop_assert!(Request::ptr_eq(&request, &again));
    }

    /// Serializing a parsed URI and parsing it again is a fixed point.
    #[test]
    fn uri_serialization_is_stable(input in arb_uri()) {
        let Ok(uri) = Uri::parse(&input) else {
            return Ok(());
        };

        let reparsed = Uri::parse(uri.as_str()).unwrap();
        prop_assert_eq!(reparsed.as_str(), uri.as_str());
        prop_assert_eq!(reparsed.host(), uri.host());
        prop_assert_eq!(reparsed.port(), uri.port());
        prop_assert_eq!(reparsed.path(), uri.path());
        prop_assert_eq!(reparsed.query(), uri.query());
    }

    /// The port is reported only when it differs from the scheme's default.
    #[test]
    fn default_port_is_elided(port in 1u32..=65535) {
        for (scheme, default) in [("http", 80u32), ("https", 443)] {
            let uri = Uri::parse(&format!("{scheme}://example.com/")).unwrap().with_port(Some(port)).unwrap();
            let expected = if port == default { None } else { u16::try_from(port).ok() };
            prop_assert_eq!(uri.port(), expected);
        }
    }
}

#[test]
fn host_header_follows_uri_changes() {
    init_test_logging();
    let request = Request::new("GET", "http://one.example/").unwrap();

    let moved = request.with_uri("https://two.example:8443/x", false).unwrap();
    assert_eq!(moved.header("host"), ["two.example:8443"]);
    assert_eq!(moved.headers().iter().next().map(|(name, _)| name), Some("host"));

    let preserved = request.with_uri("https://two.example/", true).unwrap();
    assert_eq!(preserved.header("host"), ["one.example"]);
}
