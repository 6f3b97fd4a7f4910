//! Integration tests for validation rules
//!
//! Exercises the port and base64 validators through the same entry points
//! config and boundary code use, including the error kinds callers match on.

#![cfg(feature = "foundation")]

use groundwork_common::error::ErrorKind;
use groundwork_common::validation::{decode_base64, is_base64, is_port};

#[test]
fn port_validation_across_input_forms() {
    // integers of every width
    assert_eq!(is_port(80_u8).expect("u8"), 80);
    assert_eq!(is_port(8080_i16).expect("i16"), 8080);
    assert_eq!(is_port(65535_u64).expect("u64"), 65535);

    // strings and byte slices as they arrive from env/config parsing
    assert_eq!(is_port("5432").expect("str"), 5432);
    assert_eq!(is_port(String::from("6379")).expect("string"), 6379);
    assert_eq!(is_port(b"27017".as_slice()).expect("bytes"), 27017);
}

#[test]
fn port_validation_error_kinds() {
    // range violations are invalid
    assert_eq!(is_port(0_i32).expect_err("zero").kind(), ErrorKind::Invalid);
    assert_eq!(is_port(-443_i32).expect_err("negative").kind(), ErrorKind::Invalid);
    assert_eq!(is_port(70_000_u32).expect_err("too big").kind(), ErrorKind::Invalid);

    // type mismatches are unserialisable
    assert_eq!(is_port("http").expect_err("text").kind(), ErrorKind::Unserialisable);
    assert_eq!(is_port("").expect_err("empty").kind(), ErrorKind::Unserialisable);
}

#[test]
fn base64_validation_accepts_the_four_alphabets() {
    // same payload, four encodings
    let cases = [
        "aGVsbG8+d29ybGQ/IQ==", // standard, padded
        "aGVsbG8+d29ybGQ/IQ",   // standard, unpadded
        "aGVsbG8-d29ybGQ_IQ==", // url-safe, padded
        "aGVsbG8-d29ybGQ_IQ",   // url-safe, unpadded
    ];
    for case in cases {
        assert!(is_base64(case).is_ok(), "case {case}");
        assert_eq!(decode_base64(case).expect("decode"), b"hello>world?!", "case {case}");
    }

    assert!(is_base64("").is_ok(), "empty string is valid");
    assert_eq!(is_base64("!!!").expect_err("garbage").kind(), ErrorKind::Invalid);
}
