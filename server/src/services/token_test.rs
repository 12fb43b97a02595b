use super::*;

fn secret(tag: char) -> SigningSecret {
    SigningSecret::new(std::iter::repeat_n(tag, 32).collect::<String>())
}

fn issuer() -> TokenIssuer {
    TokenIssuer::new(secret('a'), Vec::new(), Duration::from_secs(3600))
}

// =============================================================================
// issue / decode
// =============================================================================

#[test]
fn issued_token_decodes_to_same_identity() {
    let issuer = issuer();
    let user_id = Uuid::new_v4();
    for role in [Role::User, Role::Admin] {
        let issued = issuer.issue(user_id, role).unwrap();
        let claims = issuer.decode(&issued.token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, role);
        assert_eq!(claims.exp, issued.expires_at);
    }
}

#[test]
fn expiry_is_one_ttl_after_issue() {
    let issuer = issuer();
    let issued_at = OffsetDateTime::now_utc();
    let issued = issuer.issue_at(Uuid::new_v4(), Role::User, issued_at).unwrap();
    let claims = issuer.decode(&issued.token).unwrap();
    assert_eq!(claims.iat, issued_at.unix_timestamp());
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[test]
fn token_rejected_after_expiry() {
    let issuer = issuer();
    let two_hours_ago = OffsetDateTime::now_utc() - time::Duration::hours(2);
    let issued = issuer.issue_at(Uuid::new_v4(), Role::User, two_hours_ago).unwrap();
    assert!(matches!(issuer.decode(&issued.token), Err(TokenError::Expired)));
}

#[test]
fn token_rejected_just_past_expiry() {
    let issuer = TokenIssuer::new(secret('a'), Vec::new(), Duration::from_secs(60));
    let issued_at = OffsetDateTime::now_utc() - time::Duration::seconds(65);
    let issued = issuer.issue_at(Uuid::new_v4(), Role::User, issued_at).unwrap();
    assert!(matches!(issuer.decode(&issued.token), Err(TokenError::Expired)));
}

#[test]
fn token_signed_with_other_secret_is_invalid() {
    let other = TokenIssuer::new(secret('b'), Vec::new(), Duration::from_secs(3600));
    let issued = other.issue(Uuid::new_v4(), Role::User).unwrap();
    assert!(matches!(issuer().decode(&issued.token), Err(TokenError::Invalid(_))));
}

#[test]
fn garbage_token_is_invalid() {
    assert!(matches!(issuer().decode("not.a.jwt"), Err(TokenError::Invalid(_))));
    assert!(matches!(issuer().decode(""), Err(TokenError::Invalid(_))));
}

#[test]
fn tampered_token_is_invalid() {
    let issuer = issuer();
    let issued = issuer.issue(Uuid::new_v4(), Role::User).unwrap();
    let mut parts: Vec<&str> = issued.token.split('.').collect();
    let forged_claims = issuer.issue(Uuid::new_v4(), Role::Admin).unwrap();
    let forged_payload = forged_claims.token.split('.').nth(1).unwrap().to_owned();
    parts[1] = &forged_payload;
    let tampered = parts.join(".");
    assert!(matches!(issuer.decode(&tampered), Err(TokenError::Invalid(_))));
}

// =============================================================================
// rotation
// =============================================================================

#[test]
fn previous_secret_still_verifies() {
    let old = TokenIssuer::new(secret('a'), Vec::new(), Duration::from_secs(3600));
    let issued = old.issue(Uuid::new_v4(), Role::User).unwrap();

    let rotated = TokenIssuer::new(secret('b'), vec![secret('a')], Duration::from_secs(3600));
    let claims = rotated.decode(&issued.token).unwrap();
    assert_eq!(claims.role, Role::User);
}

#[test]
fn rotated_issuer_signs_with_current_secret() {
    let rotated = TokenIssuer::new(secret('b'), vec![secret('a')], Duration::from_secs(3600));
    let issued = rotated.issue(Uuid::new_v4(), Role::User).unwrap();

    let only_old = TokenIssuer::new(secret('a'), Vec::new(), Duration::from_secs(3600));
    assert!(matches!(only_old.decode(&issued.token), Err(TokenError::Invalid(_))));
    let only_new = TokenIssuer::new(secret('b'), Vec::new(), Duration::from_secs(3600));
    assert!(only_new.decode(&issued.token).is_ok());
}

#[test]
fn expired_token_under_previous_secret_reports_expired() {
    let old = TokenIssuer::new(secret('a'), Vec::new(), Duration::from_secs(3600));
    let issued = old
        .issue_at(Uuid::new_v4(), Role::User, OffsetDateTime::now_utc() - time::Duration::hours(3))
        .unwrap();
    let rotated = TokenIssuer::new(secret('b'), vec![secret('a')], Duration::from_secs(3600));
    assert!(matches!(rotated.decode(&issued.token), Err(TokenError::Expired)));
}

// =============================================================================
// Debug
// =============================================================================

#[test]
fn secret_debug_is_redacted() {
    let debug = format!("{:?}", secret('z'));
    assert!(!debug.contains("zzzz"));
    assert!(debug.contains("redacted"));
}

#[test]
fn issuer_debug_shows_key_count() {
    let rotated = TokenIssuer::new(secret('b'), vec![secret('a')], Duration::from_secs(3600));
    let debug = format!("{rotated:?}");
    assert!(debug.contains("keys: 2"));
    assert!(!debug.contains("aaaa"));
    assert_eq!(rotated.ttl_secs(), 3600);
}
