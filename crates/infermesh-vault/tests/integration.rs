//! Integration tests for the infermesh-vault crate.
//!
//! These exercise the full onboarding → re-open → unlock lifecycle through
//! the public API, plus the cross-module properties (canonical encoding fed
//! into the validator scheme).

use infermesh_vault::{
    RootKey, Vault, derive_root_key, encrypt_validator, generate_salt, verify_key, verify_pin,
};

#[test]
fn onboarding_then_unlock_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.json");

    // Session 1: onboarding.
    let (_, original_key) = Vault::create(&path, "7391").unwrap();

    // Session 2: a fresh process re-opens the file and unlocks by PIN.
    let vault = Vault::open(&path).unwrap();
    let unlocked = vault.unlock("7391").unwrap().expect("correct pin unlocks");
    assert_eq!(unlocked.encoded(), original_key.encoded());

    // A cached session key stays consistent with the stored vault.
    assert!(vault.verify_session_key(&unlocked.encoded()));
}

#[test]
fn derived_key_validator_negative_round_trip() {
    let salt = generate_salt().unwrap();
    let key = derive_root_key("0000", &salt).unwrap();
    let validator = encrypt_validator(&key.encoded()).unwrap();

    // Every wrong PIN must come back as None, not as an error.
    for wrong in ["0001", "9999", "00000", "000"] {
        assert!(
            verify_pin(wrong, &salt, &validator).unwrap().is_none(),
            "pin {wrong} must not unlock"
        );
    }
    assert!(
        verify_pin("0000", &salt, &validator).unwrap().is_some(),
        "correct pin must unlock"
    );
}

#[test]
fn canonical_case_is_mandatory_end_to_end() {
    let salt = generate_salt().unwrap();
    let key = derive_root_key("31337", &salt).unwrap();
    let validator = encrypt_validator(&key.encoded()).unwrap();

    let lowered = key.encoded().to_lowercase();
    assert!(lowered.parse::<RootKey>().is_err());
    assert!(!verify_key(&lowered, &validator));
    assert!(encrypt_validator(&lowered).is_err());
}
