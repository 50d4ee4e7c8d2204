//! Redirect policies against the mock server's redirect endpoints.
#![cfg(feature = "ureq-transport")]

mod common;

use rest_core::{DomainCheckRedirect, Error, FlexibleRedirect, HttpMethod, Mode};

#[test]
fn rest_mode_refuses_redirects() {
    let client = common::client();
    assert_eq!(client.mode(), Mode::Rest);
    let err = client.request().get("/redirect/1").unwrap_err();
    assert_eq!(err.to_string(), "GET /redirect/2: auto redirect is disabled");
}

#[test]
fn flexible_policy_stops_after_n_hops() {
    let mut client = common::client();
    client.set_redirect_policy(FlexibleRedirect::new(20));
    let err = client.request().get("/redirect/1").unwrap_err();
    match err {
        Error::RedirectRejected { method, path, reason } => {
            assert_eq!(method, HttpMethod::Get);
            assert_eq!(path, "/redirect/22");
            assert_eq!(reason, "stopped after 20 redirects");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn domain_check_rejects_foreign_host() {
    let mut client = common::client();
    client
        .set_redirect_policy(FlexibleRedirect::new(20))
        .add_redirect_policy(DomainCheckRedirect::new(["127.0.0.1"]));
    let err = client.request().get("/redirect-host-check").unwrap_err();
    // A transport error would mean the foreign host was contacted.
    assert!(matches!(err, Error::RedirectRejected { ref path, .. } if path == "/landing"));
}

#[test]
fn same_host_hops_pass_domain_check() {
    let mut client = common::client();
    client
        .set_redirect_policy(FlexibleRedirect::new(2))
        .add_redirect_policy(DomainCheckRedirect::new(["127.0.0.1"]));
    let err = client.request().get("/redirect/1").unwrap_err();
    assert!(err.to_string().ends_with("stopped after 2 redirects"));
}

#[test]
fn custom_policy_closure() {
    let mut client = common::client();
    client.set_redirect_policy(
        |_: &rest_core::HttpRequest, via: &[rest_core::HttpRequest]| -> Result<(), String> {
            if via.len() >= 3 {
                return Err("sample test redirect".to_string());
            }
            Ok(())
        },
    );
    let err = client.request().get("/redirect/1").unwrap_err();
    assert_eq!(err.to_string(), "GET /redirect/4: sample test redirect");
}
