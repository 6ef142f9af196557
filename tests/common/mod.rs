//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use url::Url;

use hashback::*;

/// Values the parser handed to its policies.
#[derive(Debug, Default, Clone)]
pub struct Captured {
    pub host: Option<String>,
    pub now: Option<i64>,
    pub rounds: Option<i64>,
    pub verify: Option<Url>,
}

/// A parser whose policies accept everything and record what they saw.
pub fn capturing_parser() -> (Parser, Arc<Mutex<Captured>>) {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let mut parser = Parser::new();

    let c = Arc::clone(&captured);
    parser.set_host_policy(HostPolicy::from_fn(move |host| {
        c.lock().unwrap().host = Some(host.to_string());
        Ok(())
    }));
    let c = Arc::clone(&captured);
    parser.set_now_policy(NowPolicy::from_fn(move |now| {
        c.lock().unwrap().now = Some(now);
        Ok(())
    }));
    let c = Arc::clone(&captured);
    parser.set_rounds_policy(RoundsPolicy::from_fn(move |rounds| {
        c.lock().unwrap().rounds = Some(rounds);
        Ok(())
    }));
    let c = Arc::clone(&captured);
    parser.set_verify_policy(VerifyPolicy::from_fn(move |verify| {
        c.lock().unwrap().verify = Some(verify.clone());
        Ok(())
    }));

    (parser, captured)
}

/// Deterministic 16-byte Unus number `n`, standard base64.
pub fn repeatable_unus(n: usize) -> String {
    let digest = Sha256::digest(format!("RepeatableUnus{}", n).as_bytes());
    STANDARD.encode(&digest[..16])
}

/// A well-formed header object with the given overrides applied.
pub fn header_object(unus: &str, overrides: &[(&str, Value)]) -> Map<String, Value> {
    let mut obj = match json!({
        "Version": VERSION,
        "Host": "host.example",
        "Now": 100,
        "Unus": unus,
        "Rounds": 1,
        "Verify": "https://verify.example/",
    }) {
        Value::Object(m) => m,
        _ => unreachable!(),
    };
    for (k, v) in overrides {
        obj.insert((*k).to_string(), v.clone());
    }
    obj
}

/// `"HashBack " + base64(compact json)`.
pub fn encode_header(obj: &Map<String, Value>) -> String {
    let bytes = serde_json::to_vec(obj).unwrap();
    format!("HashBack {}", STANDARD.encode(bytes))
}
