use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde_json::Value;

/// Sign an arbitrary payload with HS256. The document server expects the
/// complete editor config as claims, so no registered claims are added.
pub fn sign_payload<T: Serialize>(
    payload: &T,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify an HS256 token and return its claims. `exp` is honoured when
/// present but not required; audience is not checked.
pub fn verify_token(token: &str, secret: &str) -> Result<Value, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_aud = false;

    let token_data = decode::<Value>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}
