//! Property-based tests for connection-profile construction and
//! serialization

use proptest::prelude::*;
use snowlens_core::{Account, AuthMethod, ConnectMode, ConnectionProfile};

// ========== Generators ==========

fn arb_account() -> impl Strategy<Value = Account> {
    "[a-z][a-z0-9]{2,12}".prop_map(|s| Account::parse(&s).unwrap())
}

fn arb_user() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

fn arb_auth() -> impl Strategy<Value = AuthMethod> {
    prop_oneof![
        "[!-~]{1,24}".prop_map(|p| AuthMethod::password(p)),
        Just(AuthMethod::ExternalBrowser),
        prop::collection::vec(any::<u8>(), 1..64).prop_map(|der| AuthMethod::KeyPair { der }),
    ]
}

// Optional fields are sometimes absent, sometimes blank, sometimes set
fn arb_optional_field() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        "[A-Z][A-Z0-9_]{0,12}".prop_map(|s| s),
    ]
}

fn arb_profile() -> impl Strategy<Value = ConnectionProfile> {
    (
        arb_account(),
        arb_user(),
        arb_auth(),
        arb_optional_field(),
        arb_optional_field(),
        arb_optional_field(),
        arb_optional_field(),
    )
        .prop_map(|(account, user, auth, role, warehouse, database, schema)| {
            ConnectionProfile::new(account, user, auth)
                .with_role(role)
                .with_warehouse(warehouse)
                .with_database(database)
                .with_schema(schema)
        })
}

/// Returns which of the mutually exclusive auth keys the serialized
/// form carries
fn auth_keys(profile: &ConnectionProfile) -> Vec<&'static str> {
    let value = serde_json::to_value(profile).unwrap();
    let object = value.as_object().unwrap();
    ["password", "authenticator", "private_key"]
        .into_iter()
        .filter(|key| object.contains_key(*key))
        .collect()
}

proptest! {
    // Exactly one authentication field is present, and it matches the mode
    #[test]
    fn exactly_one_auth_field_matching_mode(profile in arb_profile()) {
        let keys = auth_keys(&profile);
        prop_assert_eq!(keys.len(), 1);
        let expected = match profile.mode() {
            ConnectMode::Password => "password",
            ConnectMode::Sso => "authenticator",
            ConnectMode::KeyPair => "private_key",
            ConnectMode::Saved => unreachable!("profiles are never built in Saved mode"),
        };
        prop_assert_eq!(keys[0], expected);
    }

    // Blank optional fields never appear in the serialized parameter set
    #[test]
    fn blank_optionals_are_absent(profile in arb_profile()) {
        let value = serde_json::to_value(&profile).unwrap();
        let object = value.as_object().unwrap();
        for (field, present) in [
            ("role", profile.role.is_some()),
            ("warehouse", profile.warehouse.is_some()),
            ("database", profile.database.is_some()),
            ("schema", profile.schema.is_some()),
        ] {
            prop_assert_eq!(object.contains_key(field), present);
            if let Some(v) = object.get(field) {
                prop_assert!(!v.as_str().unwrap().trim().is_empty());
            }
        }
    }

    // The composite key is {mode}_{account}_{user}
    #[test]
    fn storage_key_is_mode_account_user(profile in arb_profile()) {
        let expected = format!(
            "{}_{}_{}",
            profile.mode().key_prefix(),
            profile.account.as_str(),
            profile.user
        );
        prop_assert_eq!(profile.storage_key(), expected);
    }

    // Serialization round-trips through TOML with every field intact
    #[test]
    fn toml_round_trip_preserves_profile(profile in arb_profile()) {
        let text = toml::to_string(&profile).unwrap();
        let parsed: ConnectionProfile = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed, profile);
    }

    // Fingerprints are stable and collision-free across differing fields
    #[test]
    fn fingerprint_is_stable(profile in arb_profile()) {
        prop_assert_eq!(profile.fingerprint(), profile.clone().fingerprint());
        let changed = profile.clone().with_role("FINGERPRINT_PROBE");
        if changed != profile {
            prop_assert_ne!(profile.fingerprint(), changed.fingerprint());
        }
    }
}
