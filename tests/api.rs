//! Public API tests: generator/parser round trips, tracker sharing, and
//! configuration-driven setups.

mod common;

use std::sync::Arc;

use uuid::Uuid;

use common::*;
use hashback::*;

const TEST_ID: &str = "372F758B-8EAE-4505-A150-586D4B64803E";

// ── Generator round trip ────────────────────────────────────

#[test]
fn generator_round_trip() {
    let mut gen = Generator::new();
    gen.set_verify_by_query_string("https://example.com/", "id").unwrap();
    let auth = gen.generate_for_host("server.example").unwrap();

    let (parser, captured) = capturing_parser();
    let result = parser.parse(&auth.auth_header);

    assert_eq!(result.expected_hash(), Some(auth.verification_hash.as_str()));

    let c = captured.lock().unwrap();
    assert_eq!(c.host.as_deref(), Some("server.example"));
    assert_eq!(c.rounds, Some(1));
    assert_eq!(
        c.verify.as_ref().unwrap().as_str(),
        format!(
            "https://example.com/?id={}",
            auth.verification_id.hyphenated().to_string().to_uppercase()
        )
    );
}

#[test]
fn generated_header_is_prefixed_base64() {
    let gen = Generator::new()
        .with_host("server.example")
        .with_verify(VerifyUrlStrategy::file_in_folder("https://client.example/hb", "txt").unwrap());
    let auth = gen.generate().unwrap();

    let payload = auth.auth_header.strip_prefix("HashBack ").unwrap();
    let bytes = flex_base64_decode(payload).unwrap();
    let header: AuthHeader = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(header.version, VERSION);
    assert_eq!(header.host, "server.example");
    assert_eq!(header.rounds, 1);
    assert_eq!(flex_base64_decode(&header.unus).unwrap().len(), 16);
    assert_eq!(
        header.verify,
        format!(
            "https://client.example/hb/{}.txt",
            auth.verification_id.hyphenated().to_string().to_uppercase()
        )
    );
    assert_eq!(auth.verification_hash, compute_hash(&bytes, 1));
}

#[test]
fn generator_uses_supplied_id_clock_and_rounds() {
    let id = Uuid::parse_str(TEST_ID).unwrap();
    let mut gen = Generator::new()
        .with_clock(fixed_clock(529297200))
        .with_rounds(7);
    gen.set_host("server.example");
    gen.set_verify_by_query_string("https://client.example/auth?x=y", "id").unwrap();

    let auth = gen.generate_with_id(id).unwrap();
    assert_eq!(auth.verification_id, id);

    let (mut parser, captured) = capturing_parser();
    parser.set_clock(fixed_clock(529297205), 9);
    let result = parser.parse(&auth.auth_header);

    assert!(result.is_valid(), "{:?}", result.error());
    assert_eq!(result.expected_hash(), Some(auth.verification_hash.as_str()));
    assert_eq!(
        result.verify_url().unwrap().as_str(),
        format!("https://client.example/auth?x=y&id={}", TEST_ID)
    );
    assert_eq!(captured.lock().unwrap().rounds, Some(7));
}

#[test]
fn two_generations_differ() {
    let gen = Generator::new()
        .with_host("server.example")
        .with_verify(VerifyUrlStrategy::query_string("https://client.example/", "id").unwrap());
    let id = Uuid::parse_str(TEST_ID).unwrap();
    let a = gen.generate_with_id(id).unwrap();
    let b = gen.generate_with_id(id).unwrap();
    // Fresh Unus each time.
    assert_ne!(a.auth_header, b.auth_header);
    assert_ne!(a.verification_hash, b.verification_hash);
}

#[test]
fn zero_rounds_generator_is_config_error() {
    let gen = Generator::new()
        .with_host("server.example")
        .with_rounds(0)
        .with_verify(VerifyUrlStrategy::query_string("https://client.example/", "id").unwrap());
    assert_eq!(gen.generate().unwrap_err().code, ERR_CONFIG);
}

// ── Full Issuer setup ───────────────────────────────────────

#[test]
fn configured_issuer_accepts_configured_caller() {
    let caller = CallerConfig::from_json_str(
        r#"{"host":"server.example","rounds":2,
            "verify":{"type":"query_string","base_url":"https://client.example/hashback","name":"id"}}"#,
    )
    .unwrap()
    .build_generator()
    .unwrap();

    let issuer = IssuerConfig::from_json_str(
        r#"{"host":"server.example","accept_any_verify":true}"#,
    )
    .unwrap()
    .build_parser()
    .unwrap();

    let auth = caller.generate().unwrap();
    let result = issuer.parse(&auth.auth_header);
    assert!(result.is_valid(), "{:?}", result.error());
    assert_eq!(result.expected_hash(), Some(auth.verification_hash.as_str()));

    // Same header again is a replay.
    assert_eq!(issuer.parse(&auth.auth_header).error().unwrap().code, ERR_REPLAY);
}

#[test]
fn configured_issuer_rejects_other_host() {
    let gen = Generator::new()
        .with_host("elsewhere.example")
        .with_verify(VerifyUrlStrategy::query_string("https://client.example/", "id").unwrap());
    let issuer = IssuerConfig {
        host: Some("server.example".into()),
        accept_any_verify: true,
        ..IssuerConfig::default()
    }
    .build_parser()
    .unwrap();

    let result = issuer.parse(&gen.generate().unwrap().auth_header);
    assert_eq!(
        result.error_text(),
        Some("Host property must be \"server.example\".")
    );
}

#[test]
fn verify_allow_list_policy() {
    let gen = Generator::new()
        .with_host("server.example")
        .with_verify(VerifyUrlStrategy::query_string("http://client.example/", "id").unwrap());

    let mut parser = Parser::new();
    parser.set_required_host("server.example");
    parser.set_verify_policy(VerifyPolicy::from_fn(|url| {
        if url.scheme() == "https" {
            Ok(())
        } else {
            Err("Verify property must use https.".to_string())
        }
    }));

    let result = parser.parse(&gen.generate().unwrap().auth_header);
    assert_eq!(result.error_text(), Some("Verify property must use https."));
    assert_eq!(result.error().unwrap().code, ERR_POLICY);
}

// ── Tracker sharing ─────────────────────────────────────────

#[test]
fn parsers_sharing_a_tracker_share_replay_state() {
    let tracker = Arc::new(UnusTracker::new());
    let mut policies = Policies::default();
    policies.host = HostPolicy::accept_all();
    policies.verify = VerifyPolicy::accept_all();

    let a = Parser::with_tracker(policies.clone(), Arc::clone(&tracker));
    let b = Parser::with_tracker(policies, Arc::clone(&tracker));

    let auth = Generator::new()
        .with_host("server.example")
        .with_verify(VerifyUrlStrategy::query_string("https://client.example/", "id").unwrap())
        .generate()
        .unwrap();

    assert!(a.parse(&auth.auth_header).is_valid());
    assert_eq!(b.parse(&auth.auth_header).error().unwrap().code, ERR_REPLAY);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn free_function_parses_with_explicit_state() {
    let tracker = UnusTracker::new();
    let mut policies = Policies::default();
    policies.host = HostPolicy::required("server.example");
    policies.verify = VerifyPolicy::accept_all();

    let auth = Generator::new()
        .with_host("server.example")
        .with_verify(VerifyUrlStrategy::query_string("https://client.example/", "id").unwrap())
        .generate()
        .unwrap();

    let result = parse_auth_header(&auth.auth_header, &policies, &tracker);
    assert_eq!(result.expected_hash(), Some(auth.verification_hash.as_str()));
    assert!(!tracker.is_empty());
}

#[test]
fn concurrent_parsers_accept_a_header_once() {
    let (parser, _) = capturing_parser();
    let parser = Arc::new(parser);
    let obj = header_object(&repeatable_unus(5), &[]);
    let header = Arc::new(encode_header(&obj));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let parser = Arc::clone(&parser);
            let header = Arc::clone(&header);
            std::thread::spawn(move || parser.parse(&header).is_valid())
        })
        .collect();
    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&ok| ok)
        .count();
    assert_eq!(accepted, 1);
}

#[test]
fn version_constant() {
    assert_eq!(VERSION, "BILLPG_DRAFT_4.0");
    assert_eq!(SCHEME, "HashBack");
}
