//! # Cross-Producer Digest Equality Tests
//!
//! Existing issuers and verifiers compute credential hashes as
//! `keccak256(utf8(JSON.stringify(sortKeysDeep(vc))))`. These vectors pin the
//! Rust pipeline (`CredentialValue::parse` → `CanonicalBytes` →
//! `keccak256_digest`) to byte-identical output for documents without
//! integer-like keys. If any of them fail, hashes already anchored on the
//! ledger stop verifying.
//!
//! Integer-like keys are the one place the two producers part ways: a
//! JavaScript engine enumerates them first in numeric order, the Rust
//! canonicalizer sorts every key by code point. That order is pinned
//! separately below.

use credchain_core::{credential_hash, keccak256_digest, CanonicalBytes, CredentialHash, CredentialValue};

struct Vector {
    input: &'static str,
    canonical: &'static str,
    hash: &'static str,
}

const TEST_VECTORS: &[Vector] = &[
    Vector {
        input: r#"{"b":1,"a":{"y":2,"x":1}}"#,
        canonical: r#"{"a":{"x":1,"y":2},"b":1}"#,
        hash: "0x57e779029376358fd3549fdc6945b751ba3e8cc36a25c7dc10920f06a5fa0ae4",
    },
    Vector {
        input: "{}",
        canonical: "{}",
        hash: "0xb48d38f93eaa084033fc5970bf96e559c33c4cdc07d889ab00b4d63f9590739d",
    },
    Vector {
        input: r#"{"gpa":9.0,"name":"Asha"}"#,
        canonical: r#"{"gpa":9,"name":"Asha"}"#,
        hash: "0xcc800da5352bb232f4b526c8da8b3f19d4f5635942c1f17c6a831abd7bb7f3f0",
    },
    Vector {
        input: r#"{"z":[3,{"b":null,"a":true}],"n":-0.5,"e":1e21,"s":"é\n\"q\""}"#,
        canonical: r#"{"e":1e+21,"n":-0.5,"s":"é\n\"q\"","z":[3,{"a":true,"b":null}]}"#,
        hash: "0x8b5b4c951133c0ddb8e99c81288aa05aed057a0f5c0aa28911a4e20882df9b8d",
    },
    Vector {
        input: r#"{
            "@context": ["https://www.w3.org/ns/credentials/v2"],
            "type": ["VerifiableCredential", "DegreeCredential"],
            "issuer": "did:web:university.example",
            "issuanceDate": "2024-05-01T00:00:00Z",
            "credentialSubject": {
                "id": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
                "givenName": "Asha",
                "familyName": "Rao",
                "degree": {"name": "B.Tech", "major": "Computer Science", "dateAwarded": "2024-05-01"},
                "gpa": 8.75
            }
        }"#,
        canonical: r#"{"@context":["https://www.w3.org/ns/credentials/v2"],"credentialSubject":{"degree":{"dateAwarded":"2024-05-01","major":"Computer Science","name":"B.Tech"},"familyName":"Rao","givenName":"Asha","gpa":8.75,"id":"0x70997970c51812dc3a010c7d01b50e0d17dc79c8"},"issuanceDate":"2024-05-01T00:00:00Z","issuer":"did:web:university.example","type":["VerifiableCredential","DegreeCredential"]}"#,
        hash: "0x0992510ca0fa9cc6d5ed4745fa0d2b568198bb284eb45f4fb6b58e6a34c7fb45",
    },
];

#[test]
fn canonical_forms_match_vectors() {
    for v in TEST_VECTORS {
        let value = CredentialValue::parse(v.input).expect("vector input parses");
        let cb = CanonicalBytes::new(&value).expect("vector canonicalizes");
        assert_eq!(cb.as_str(), v.canonical, "canonical mismatch for {}", v.input);
    }
}

#[test]
fn hashes_match_vectors() {
    for v in TEST_VECTORS {
        let value = CredentialValue::parse(v.input).unwrap();
        let (_, hash) = credential_hash(&value).unwrap();
        assert_eq!(hash.to_string(), v.hash, "hash mismatch for {}", v.input);
    }
}

#[test]
fn canonical_form_is_a_fixed_point() {
    for v in TEST_VECTORS {
        let value = CredentialValue::parse(v.canonical).unwrap();
        let cb = CanonicalBytes::new(&value).unwrap();
        assert_eq!(cb.as_str(), v.canonical);
        assert_eq!(keccak256_digest(&cb).to_string(), v.hash);
    }
}

#[test]
fn vector_hashes_parse_back() {
    for v in TEST_VECTORS {
        let parsed: CredentialHash = v.hash.parse().unwrap();
        assert!(parsed.matches_hex(&v.hash.to_uppercase().replacen("0X", "0x", 1)));
    }
}

#[test]
fn integer_like_keys_sort_by_code_point() {
    let value = CredentialValue::parse(r#"{"b":1,"10":1,"2":1,"a":{"y":2,"x":1}}"#).unwrap();
    let (canonical, hash) = credential_hash(&value).unwrap();
    // A JavaScript producer would emit {"2":1,"10":1,...} here.
    assert_eq!(canonical.as_str(), r#"{"10":1,"2":1,"a":{"x":1,"y":2},"b":1}"#);
    assert_eq!(
        hash.to_string(),
        "0x278147e6ef657d1763202a144cd8ee8e5a55db9038f4d14d6da34f2c28c47114"
    );
}
