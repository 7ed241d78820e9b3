//! Tests for identity tokens.

use wordduel::IdentityClass;
use wordduel_server::{TOKEN_ISSUER, TokenIssuer};

#[test]
fn test_issued_token_verifies() {
    let issuer = TokenIssuer::new(b"secret");
    let identity = issuer.issue(IdentityClass::Anon).expect("Issue failed");

    let token = identity.token().as_deref().expect("Fresh identity carries a token");
    let claims = issuer.verify(token).expect("Verify failed");

    assert_eq!(claims.sub(), identity.player_id());
    assert_eq!(*claims.class(), IdentityClass::Anon);
    assert_eq!(claims.iss(), TOKEN_ISSUER);
    assert_eq!(claims.aud(), TOKEN_ISSUER);
    assert!(claims.exp() > claims.iat());
}

#[test]
fn test_resolve_keeps_verified_identity() {
    let issuer = TokenIssuer::new(b"secret");
    let token = issuer
        .issue_for("alice", IdentityClass::Verified)
        .expect("Sign failed");

    let identity = issuer.resolve(Some(&token)).expect("Resolve failed");
    assert_eq!(identity.player_id(), "alice");
    assert_eq!(*identity.class(), IdentityClass::Verified);
    assert!(identity.token().is_none(), "Known players keep their token");
}

#[test]
fn test_foreign_token_gets_fresh_anonymous_identity() {
    let other = TokenIssuer::new(b"other-secret");
    let token = other
        .issue_for("mallory", IdentityClass::Verified)
        .expect("Sign failed");

    let issuer = TokenIssuer::new(b"secret");
    assert!(issuer.verify(&token).is_err());

    let identity = issuer.resolve(Some(&token)).expect("Resolve failed");
    assert_ne!(identity.player_id(), "mallory");
    assert_eq!(*identity.class(), IdentityClass::Anon);
    assert!(identity.token().is_some());
}

#[test]
fn test_garbage_and_missing_tokens_get_distinct_identities() {
    let issuer = TokenIssuer::new(b"secret");
    let first = issuer.resolve(Some("not-a-jwt")).expect("Resolve failed");
    let second = issuer.resolve(None).expect("Resolve failed");

    assert_eq!(*first.class(), IdentityClass::Anon);
    assert_ne!(first.player_id(), second.player_id());
}
