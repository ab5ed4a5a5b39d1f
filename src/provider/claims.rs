// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Conversion of provider JSON claims into a claims identity

use serde_json::{Map, Value};

use crate::auth::claims::{Claim, ClaimsIdentity, OIDC_AUTHENTICATION_TYPE};
use crate::config::TokenValidationConfig;

const BOOLEAN_VALUE_TYPE: &str = "http://www.w3.org/2001/XMLSchema#boolean";
const INTEGER_VALUE_TYPE: &str = "http://www.w3.org/2001/XMLSchema#integer64";
const DOUBLE_VALUE_TYPE: &str = "http://www.w3.org/2001/XMLSchema#double";
const JSON_VALUE_TYPE: &str = "JSON";

/// Protocol claims dropped from the identity; they describe the token, not the user
const PROTOCOL_CLAIMS: &[&str] = &[
    "nonce", "aud", "azp", "acr", "iss", "iat", "nbf", "exp", "at_hash", "c_hash", "ipaddr",
    "platf", "ver", "jti", "auth_time", "amr", "idp",
];

/// Merge userinfo claims into id token claims; id token values win on conflicts
pub fn merge_claims(mut id_token: Map<String, Value>, userinfo: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in userinfo {
        id_token.entry(key).or_insert(value);
    }
    id_token
}

/// Build the provider identity from a JSON claims object
///
/// Returns `None` when no `sub` claim is present.
pub fn identity_from_claims(
    claims: &Map<String, Value>,
    policy: &TokenValidationConfig,
) -> Option<ClaimsIdentity> {
    if !claims.get("sub").is_some_and(|s| s.is_string()) {
        return None;
    }

    let mut identity = ClaimsIdentity::authenticated(
        OIDC_AUTHENTICATION_TYPE,
        Vec::new(),
        policy.name_claim_type.clone(),
        policy.role_claim_type.clone(),
    );
    for (claim_type, value) in claims {
        if PROTOCOL_CLAIMS.contains(&claim_type.as_str()) {
            continue;
        }
        push_claims(&mut identity, claim_type, value);
    }
    Some(identity)
}

fn push_claims(identity: &mut ClaimsIdentity, claim_type: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => identity.add_claim(Claim::new(claim_type, s.clone())),
        Value::Bool(b) => identity.add_claim(Claim::with_value_type(
            claim_type,
            b.to_string(),
            BOOLEAN_VALUE_TYPE,
        )),
        Value::Number(n) => {
            let value_type = if n.is_f64() {
                DOUBLE_VALUE_TYPE
            } else {
                INTEGER_VALUE_TYPE
            };
            identity.add_claim(Claim::with_value_type(claim_type, n.to_string(), value_type));
        }
        Value::Array(items) => {
            for item in items {
                push_claims(identity, claim_type, item);
            }
        }
        Value::Object(_) => identity.add_claim(Claim::with_value_type(
            claim_type,
            value.to_string(),
            JSON_VALUE_TYPE,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_identity_requires_subject() {
        let claims = as_map(json!({ "name": "Jane" }));
        assert!(identity_from_claims(&claims, &TokenValidationConfig::default()).is_none());
    }

    #[test]
    fn test_identity_flattens_arrays_and_drops_protocol_claims() {
        let claims = as_map(json!({
            "sub": "00u1",
            "name": "Jane Editor",
            "email_verified": true,
            "groups": ["Everyone", "Editors"],
            "nonce": "n-123",
            "iss": "https://dev-1.okta.com/oauth2/default",
            "updated_at": 1_700_000_000,
            "address": { "country": "FR" }
        }));

        let identity = identity_from_claims(&claims, &TokenValidationConfig::default()).unwrap();

        assert!(identity.is_authenticated());
        assert_eq!(identity.name(), Some("Jane Editor"));
        assert!(identity.has_claim("groups", "Everyone"));
        assert!(identity.has_claim("groups", "Editors"));
        assert!(identity.has_claim("email_verified", "true"));
        assert!(identity.find_first("nonce").is_none());
        assert!(identity.find_first("iss").is_none());
        assert_eq!(identity.find_first("updated_at"), Some("1700000000"));
        assert_eq!(identity.find_first("address"), Some(r#"{"country":"FR"}"#));
    }

    #[test]
    fn test_merge_keeps_id_token_values() {
        let merged = merge_claims(
            as_map(json!({ "sub": "00u1", "name": "From token" })),
            as_map(json!({ "sub": "00u1", "name": "From userinfo", "email": "jane@example.com" })),
        );
        assert_eq!(merged["name"], "From token");
        assert_eq!(merged["email"], "jane@example.com");
    }
}
