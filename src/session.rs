use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

// Tokens the auth service minted for this user, carried in the signed
// session cookie. Read-only here: decoded fresh on every request, never
// cached, never written into a response.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

// The auth service owns signing, verification and refresh. The proxy needs
// exactly one capability from it: turn request headers into a credential.
// Injectable so tests can substitute their own decoder.
pub trait SessionDecoder: Send + Sync {
    // None means anonymous - the request is forwarded without Authorization
    fn decode(&self, headers: &HeaderMap) -> Option<SessionCredential>;
}

// Claim layout shared with the auth service
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub exp: usize,
}

// Decodes the HS256-signed session cookie the auth service sets at login.
pub struct JwtSessionDecoder {
    cookie_name: String,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionDecoder {
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    fn session_cookie<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, token)| token)
    }
}

impl SessionDecoder for JwtSessionDecoder {
    fn decode(&self, headers: &HeaderMap) -> Option<SessionCredential> {
        let token = self.session_cookie(headers)?;

        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(SessionCredential {
                access_token: data.claims.access_token,
                refresh_token: data.claims.refresh_token,
            }),
            Err(err) => {
                tracing::debug!(error = %err, "session cookie rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn mint(secret: &str, exp_offset: i64) -> String {
        let claims = SessionClaims {
            access_token: "upstream-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn decodes_a_valid_session_cookie() {
        let decoder = JwtSessionDecoder::new(SECRET, "readmigo_session");
        let token = mint(SECRET, 3600);
        let headers =
            headers_with_cookie(&format!("theme=dark; readmigo_session={token}; lang=en"));

        let credential = decoder.decode(&headers).unwrap();
        assert_eq!(credential.access_token, "upstream-token");
        assert_eq!(credential.refresh_token.as_deref(), Some("refresh-token"));
    }

    #[test]
    fn no_cookie_means_anonymous() {
        let decoder = JwtSessionDecoder::new(SECRET, "readmigo_session");
        assert!(decoder.decode(&HeaderMap::new()).is_none());

        let headers = headers_with_cookie("theme=dark");
        assert!(decoder.decode(&headers).is_none());
    }

    #[test]
    fn rejects_a_foreign_signature() {
        let decoder = JwtSessionDecoder::new(SECRET, "readmigo_session");
        let token = mint("some-other-secret-also-32-characters!!", 3600);
        let headers = headers_with_cookie(&format!("readmigo_session={token}"));

        assert!(decoder.decode(&headers).is_none());
    }

    #[test]
    fn rejects_an_expired_session() {
        let decoder = JwtSessionDecoder::new(SECRET, "readmigo_session");
        let token = mint(SECRET, -3600);
        let headers = headers_with_cookie(&format!("readmigo_session={token}"));

        assert!(decoder.decode(&headers).is_none());
    }
}
