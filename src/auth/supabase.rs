use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AuthError, AuthUser, Factor, IdentityProvider, TotpEnrollment};
use crate::config::{ConfigError, IdentityConfig};

/// Claims carried by Supabase access tokens
#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnrollResponse {
    id: String,
    totp: TotpPayload,
}

#[derive(Debug, Deserialize)]
struct TotpPayload {
    qr_code: String,
    secret: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    id: String,
}

/// Supabase GoTrue client
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: Client,
    base_url: String,
    service_key: String,
    jwt_secret: Option<String>,
}

impl SupabaseIdentity {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        jwt_secret: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            jwt_secret,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self, ConfigError> {
        let url = config
            .supabase_url
            .clone()
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let key = config
            .service_key
            .clone()
            .ok_or(ConfigError::Missing("SUPABASE_SERVICE_KEY"))?;
        Ok(Self::new(url, key, config.jwt_secret.clone()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    /// Request made on behalf of the signed-in user
    fn user_request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
    }

    /// Request made with the privileged service key
    fn admin_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn verify_locally(secret: &str, token: &str) -> Result<AuthUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);

        let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;

        Ok(AuthUser {
            id: data.claims.sub,
            email: data.claims.email,
            access_token: token.to_string(),
        })
    }
}

async fn send(request: RequestBuilder) -> Result<Response, AuthError> {
    let response = request
        .send()
        .await
        .map_err(|e| AuthError::Provider(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .unwrap_or("request failed")
        .to_string();

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthError::InvalidCredential(message),
        s if s.is_client_error() => AuthError::Rejected(message),
        s => AuthError::Provider(format!("{}: {}", s, message)),
    })
}

async fn read<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, AuthError> {
    send(request)
        .await?
        .json::<T>()
        .await
        .map_err(|e| AuthError::Provider(format!("unexpected response: {}", e)))
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        if let Some(secret) = &self.jwt_secret {
            return Self::verify_locally(secret, token);
        }

        let user: UserResponse = read(self.user_request(Method::GET, "/user", token))
            .await
            .map_err(|e| match e {
                AuthError::Rejected(msg) => AuthError::InvalidCredential(msg),
                other => other,
            })?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            access_token: token.to_string(),
        })
    }

    async fn list_factors(&self, user: &AuthUser) -> Result<Vec<Factor>, AuthError> {
        let path = format!("/admin/users/{}/factors", user.id);
        read(self.admin_request(Method::GET, &path)).await
    }

    async fn enroll_totp(
        &self,
        user: &AuthUser,
        friendly_name: Option<&str>,
    ) -> Result<TotpEnrollment, AuthError> {
        let mut body = json!({ "factor_type": "totp" });
        if let Some(name) = friendly_name {
            body["friendly_name"] = json!(name);
        }

        let enrolled: EnrollResponse =
            read(self.user_request(Method::POST, "/factors", &user.access_token).json(&body)).await?;

        Ok(TotpEnrollment {
            factor_id: enrolled.id,
            qr_code: enrolled.totp.qr_code,
            secret: enrolled.totp.secret,
            uri: enrolled.totp.uri,
        })
    }

    async fn verify_enrollment(
        &self,
        user: &AuthUser,
        factor_id: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let challenge: ChallengeResponse = read(self.user_request(
            Method::POST,
            &format!("/factors/{}/challenge", factor_id),
            &user.access_token,
        ))
        .await?;

        send(
            self.user_request(
                Method::POST,
                &format!("/factors/{}/verify", factor_id),
                &user.access_token,
            )
            .json(&json!({ "challenge_id": challenge.id, "code": code })),
        )
        .await?;
        Ok(())
    }

    async fn unenroll(&self, user: &AuthUser, factor_id: &str) -> Result<(), AuthError> {
        let path = format!("/admin/users/{}/factors/{}", user.id, factor_id);
        send(self.admin_request(Method::DELETE, &path)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: Uuid,
        email: String,
        aud: String,
        exp: i64,
    }

    fn token(secret: &str, aud: &str, exp_offset: i64) -> String {
        let claims = TestClaims {
            sub: Uuid::nil(),
            email: "dev@example.com".into(),
            aud: aud.into(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn local_verification_accepts_valid_tokens() {
        let identity = SupabaseIdentity::new("http://unused", "key", Some("s3cret".into()));
        let user = identity.verify_token(&token("s3cret", "authenticated", 600)).await.unwrap();
        assert_eq!(user.id, Uuid::nil());
        assert_eq!(user.email.as_deref(), Some("dev@example.com"));
    }

    #[tokio::test]
    async fn local_verification_rejects_bad_tokens() {
        let identity = SupabaseIdentity::new("http://unused", "key", Some("s3cret".into()));

        for bad in [
            token("other", "authenticated", 600),
            token("s3cret", "anon", 600),
            token("s3cret", "authenticated", -600),
            "not-a-jwt".to_string(),
        ] {
            let err = identity.verify_token(&bad).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredential(_)), "{:?}", err);
        }
    }

    #[test]
    fn from_config_requires_url_and_key() {
        let config = IdentityConfig {
            supabase_url: Some("https://proj.supabase.co/".into()),
            service_key: None,
            jwt_secret: None,
        };
        assert!(SupabaseIdentity::from_config(&config).is_err());

        let config = IdentityConfig { service_key: Some("k".into()), ..config };
        let identity = SupabaseIdentity::from_config(&config).unwrap();
        assert_eq!(identity.url("/user"), "https://proj.supabase.co/auth/v1/user");
    }
}
