//! Integration tests for the canonical error module
//!
//! Exercises the error algebra (chain-aware kind equality, warnings), the
//! text codec round-trip, and the HTTP status mapping as one surface, the
//! way downstream crates consume them together.

#![cfg(feature = "foundation")]

use groundwork_common::error::{codec, relates_to, status, Error, ErrorKind};

/// A foreign error type standing in for a third-party library failure.
#[derive(Debug)]
struct DiskError(&'static str);

impl std::fmt::Display for DiskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "disk error: {}", self.0)
    }
}

impl std::error::Error for DiskError {}

#[test]
fn kind_equality_holds_across_deep_chains() {
    let root = Error::wrap(ErrorKind::NotFound, DiskError("sector gone"), "reading block");
    let middle = Error::wrap(ErrorKind::Failed, root, "loading artifact");
    let outer = Error::wrap(ErrorKind::Unexpected, middle, "serving request");

    // any(E, K1..Kn) iff exists i such that is(E, Ki)
    assert!(outer.is(ErrorKind::Unexpected));
    assert!(outer.is(ErrorKind::Failed));
    assert!(outer.is(ErrorKind::NotFound));
    assert!(outer.is_any(&[ErrorKind::Invalid, ErrorKind::NotFound]));
    assert!(outer.is_none_of(&[ErrorKind::Invalid, ErrorKind::Conflict]));

    // the foreign cause text survives in the rendered chain
    assert!(outer.to_string().contains("sector gone"));
}

#[test]
fn warning_invariants() {
    let base = Error::new(ErrorKind::Unavailable, "upstream flapping");
    let warned = Error::warning(base);
    assert!(warned.is_warning());
    assert_eq!(warned.kind(), ErrorKind::Unavailable);

    // warning-of-warning equals the inner warning
    let text = warned.to_string();
    let twice = Error::warning(warned);
    assert_eq!(twice.to_string(), text);

    let recovered = Error::parse_warning(twice);
    assert!(!recovered.is_warning());
    assert_eq!(recovered, Error::new(ErrorKind::Unavailable, "upstream flapping"));
}

#[test]
fn codec_round_trip_for_every_kind() {
    for kind in ErrorKind::ALL {
        let original = Error::new(kind, "reason text");
        let decoded = codec::deserialise(&codec::serialise(&original));
        assert_eq!(decoded.len(), 1, "kind {kind}");
        assert_eq!(decoded[0], original, "kind {kind}");
    }
}

#[test]
fn codec_parses_external_multi_error_payload() {
    let payload = "not-found: manifest missing\nunavailable: upstream 503\nwhat-is-this: ???";
    let decoded = codec::deserialise(payload);

    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[0].kind(), ErrorKind::NotFound);
    assert_eq!(decoded[1].kind(), ErrorKind::Unavailable);
    assert_eq!(decoded[2].kind(), ErrorKind::Unknown);
    assert_eq!(decoded[2].message(), "what-is-this: ???");
}

#[test]
fn relates_to_classifies_stringly_errors() {
    // errors returned as plain strings by external systems
    let remote = "conflict: row version changed";
    assert!(relates_to(remote, &[ErrorKind::Conflict, ErrorKind::Locked]));
    assert!(!relates_to(remote, &[ErrorKind::NotFound]));
}

#[test]
fn status_mapping_boundary() {
    // mapStatus(s) = nil iff s < 400
    for s in 100..400 {
        assert_eq!(status::kind_for_status(s), None, "status {s}");
    }
    for s in 400..600 {
        assert!(status::kind_for_status(s).is_some(), "status {s}");
    }
}

#[test]
fn api_error_composition_reads_like_a_sentence() {
    let transport = Error::new(ErrorKind::Timeout, "request deadline");
    let err =
        status::api_error("syncing calendar", 429, Some("slow down"), Some(transport));
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    let text = err.to_string();
    assert!(text.contains("syncing calendar (429)"));
    assert!(text.contains(": slow down"));
    assert!(text.contains("; timeout"));
}

#[test]
fn ignore_supports_silent_success_paths() {
    let evict = |present: bool| -> Result<(), Error> {
        if present {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::NotFound, "no such entry"))
        }
    };

    // a missing key is a silent success for eviction-style operations
    let outcome = evict(false).err().and_then(|e| e.ignore(&[ErrorKind::NotFound]));
    assert!(outcome.is_none());

    let kept = Error::new(ErrorKind::Unexpected, "backing path busy")
        .ignore(&[ErrorKind::NotFound])
        .map(|e| e.kind());
    assert_eq!(kept, Some(ErrorKind::Unexpected));
}
