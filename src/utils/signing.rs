//! Firma HMAC del token di sessione

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, token: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accetta chiavi di qualsiasi lunghezza");
    mac.update(token.as_bytes());
    mac
}

/// Valore del cookie: `<token>.<base64(hmac)>`, URL-encoded
pub fn sign_session_token(token: &str, secret: &str) -> String {
    let signature = STANDARD.encode(mac_for(secret, token).finalize().into_bytes());
    urlencoding::encode(&format!("{}.{}", token, signature)).into_owned()
}

/// Verifica la firma e restituisce il token in chiaro
pub fn verify_signed_token(cookie_value: &str, secret: &str) -> Option<String> {
    let decoded = urlencoding::decode(cookie_value).ok()?;
    let (token, signature) = decoded.rsplit_once('.')?;
    if token.is_empty() {
        return None;
    }

    let signature = STANDARD.decode(signature).ok()?;
    mac_for(secret, token).verify_slice(&signature).ok()?;

    Some(token.to_string())
}
