//! REST implementation of the warehouse client.
//!
//! Speaks the warehouse's v1 session API: `login-request` to open a
//! session (password, JWT key-pair, or external-browser token),
//! `authenticator-request` plus a loopback redirect listener for the
//! SSO flow, and `query-request` for statement execution.

use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ConnectError, ConnectResult, QueryError, QueryResult};
use crate::keypair;
use crate::models::{AuthMethod, ConnectionProfile};

use super::{Bind, Session, Table, WarehouseClient};

/// Server error code for an expired session token
const SESSION_EXPIRED_CODE: &str = "390112";

/// Lifetime of a key-pair JWT; the server caps it at one hour
const JWT_LIFETIME_SECS: i64 = 59 * 60;

/// REST-based warehouse client
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
}

/// Envelope shared by all v1 gateway responses
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    success: bool,
    message: Option<String>,
    code: Option<String>,
    data: Option<Value>,
}

/// Claims of the key-pair authentication JWT
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

impl RestClient {
    /// Creates a client with default HTTP settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Returns the deployment base URL for an account locator
    fn base_url(profile: &ConnectionProfile) -> String {
        format!("https://{}.snowflakecomputing.com", profile.account)
    }

    /// Runs the external-browser SSO flow and returns (token, proof key)
    ///
    /// Asks the gateway for the identity provider URL, opens it in the
    /// user's browser, and waits on a loopback listener for the
    /// redirect carrying the one-time token.
    async fn browser_login(
        &self,
        base: &str,
        profile: &ConnectionProfile,
    ) -> ConnectResult<(String, String)> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| ConnectError::Browser(format!("could not bind redirect port: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| ConnectError::Browser(e.to_string()))?
            .port();

        let body = json!({
            "data": {
                "ACCOUNT_NAME": profile.account.as_str().to_uppercase(),
                "LOGIN_NAME": profile.user,
                "AUTHENTICATOR": "EXTERNALBROWSER",
                "BROWSER_MODE_REDIRECT_PORT": port.to_string(),
            }
        });
        let response: GatewayResponse = self
            .http
            .post(format!("{base}/session/authenticator-request"))
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if !response.success {
            return Err(ConnectError::AuthFailed(
                response.message.unwrap_or_else(|| "SSO rejected".to_string()),
            ));
        }
        let data = response
            .data
            .ok_or_else(|| ConnectError::BadResponse("authenticator response has no data".into()))?;
        let sso_url = field_str(&data, "ssoUrl")?;
        let proof_key = field_str(&data, "proofKey")?;

        info!("Open this URL in your browser to continue sign-in: {sso_url}");
        open_browser(&sso_url);

        let token = wait_for_redirect(&listener).await?;
        Ok((token, proof_key))
    }

    /// Builds the RS256 JWT for key-pair authentication
    fn keypair_jwt(profile: &ConnectionProfile, der: &[u8]) -> ConnectResult<String> {
        let fingerprint = keypair::public_key_fingerprint(der)
            .map_err(|e| ConnectError::AuthFailed(e.to_string()))?;
        let qualified = format!(
            "{}.{}",
            profile.account.as_str().to_uppercase(),
            profile.user.to_uppercase()
        );
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: format!("{qualified}.SHA256:{fingerprint}"),
            sub: qualified,
            iat: now,
            exp: now + JWT_LIFETIME_SECS,
        };
        let pkcs1 =
            keypair::pkcs1_der(der).map_err(|e| ConnectError::AuthFailed(e.to_string()))?;
        jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_der(&pkcs1),
        )
        .map_err(|e| ConnectError::AuthFailed(format!("JWT signing failed: {e}")))
    }
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WarehouseClient for RestClient {
    async fn connect(&self, profile: &ConnectionProfile) -> ConnectResult<Arc<dyn Session>> {
        let base = Self::base_url(profile);

        let mut data = Map::new();
        data.insert(
            "ACCOUNT_NAME".into(),
            json!(profile.account.as_str().to_uppercase()),
        );
        data.insert("LOGIN_NAME".into(), json!(profile.user));
        data.insert("CLIENT_APP_ID".into(), json!("Snowlens"));
        data.insert("CLIENT_APP_VERSION".into(), json!(env!("CARGO_PKG_VERSION")));

        match &profile.auth {
            AuthMethod::Password(_) => {
                data.insert("PASSWORD".into(), json!(profile.auth.expose_password()));
            }
            AuthMethod::KeyPair { der } => {
                data.insert("AUTHENTICATOR".into(), json!("SNOWFLAKE_JWT"));
                data.insert("TOKEN".into(), json!(Self::keypair_jwt(profile, der)?));
            }
            AuthMethod::ExternalBrowser => {
                let (token, proof_key) = self.browser_login(&base, profile).await?;
                data.insert("AUTHENTICATOR".into(), json!("EXTERNALBROWSER"));
                data.insert("TOKEN".into(), json!(token));
                data.insert("PROOF_KEY".into(), json!(proof_key));
            }
        }

        // Session context goes in the login URL, and only when present.
        let mut query: Vec<(&str, String)> =
            vec![("requestId", uuid::Uuid::new_v4().to_string())];
        if let Some(role) = &profile.role {
            query.push(("roleName", role.clone()));
        }
        if let Some(warehouse) = &profile.warehouse {
            query.push(("warehouse", warehouse.clone()));
        }
        if let Some(database) = &profile.database {
            query.push(("databaseName", database.clone()));
        }
        if let Some(schema) = &profile.schema {
            query.push(("schemaName", schema.clone()));
        }

        debug!(account = %profile.account, user = %profile.user, mode = %profile.mode(), "opening session");
        let response: GatewayResponse = self
            .http
            .post(format!("{base}/session/v1/login-request"))
            .query(&query)
            .json(&json!({ "data": Value::Object(data) }))
            .send()
            .await?
            .json()
            .await?;

        if !response.success {
            return Err(ConnectError::AuthFailed(
                response
                    .message
                    .unwrap_or_else(|| "login rejected".to_string()),
            ));
        }
        let data = response
            .data
            .ok_or_else(|| ConnectError::BadResponse("login response has no data".into()))?;
        let token = field_str(&data, "token")?;

        Ok(Arc::new(RestSession {
            http: self.http.clone(),
            base,
            token,
        }))
    }
}

/// A live session over the v1 query endpoint
struct RestSession {
    http: reqwest::Client,
    base: String,
    token: String,
}

#[async_trait]
impl Session for RestSession {
    async fn execute(&self, sql: &str, binds: &[Bind]) -> QueryResult<Table> {
        let mut body = Map::new();
        body.insert("sqlText".into(), json!(sql));
        if !binds.is_empty() {
            // The v1 API numbers positional bindings from "1".
            let bindings: Map<String, Value> = binds
                .iter()
                .enumerate()
                .map(|(i, bind)| {
                    (
                        (i + 1).to_string(),
                        json!({ "type": "TEXT", "value": bind.0 }),
                    )
                })
                .collect();
            body.insert("bindings".into(), Value::Object(bindings));
        }

        let response: GatewayResponse = self
            .http
            .post(format!("{}/queries/v1/query-request", self.base))
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .header(
                "Authorization",
                format!("Snowflake Token=\"{}\"", self.token),
            )
            .json(&Value::Object(body))
            .send()
            .await?
            .json()
            .await?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "query rejected".to_string());
            if response.code.as_deref() == Some(SESSION_EXPIRED_CODE) {
                return Err(QueryError::SessionExpired(message));
            }
            return Err(QueryError::Execution(message));
        }
        let data = response
            .data
            .ok_or_else(|| QueryError::MalformedRow("query response has no data".into()))?;

        let columns = data
            .get("rowtype")
            .and_then(Value::as_array)
            .map(|cols| {
                cols.iter()
                    .map(|c| {
                        c.get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();
        let rows = data
            .get("rowset")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| row.as_array().cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Table { columns, rows })
    }
}

/// Extracts a required string field from a response data object
fn field_str(data: &Value, name: &str) -> ConnectResult<String> {
    data.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConnectError::BadResponse(format!("missing field '{name}'")))
}

/// Launches the platform browser, falling back to the printed URL
fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let launcher = "open";
    #[cfg(not(target_os = "macos"))]
    let launcher = "xdg-open";

    if let Err(e) = Command::new(launcher).arg(url).spawn() {
        warn!("could not launch browser ({e}); open the URL manually");
    }
}

/// Waits for the identity provider redirect and extracts the token
async fn wait_for_redirect(listener: &TcpListener) -> ConnectResult<String> {
    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| ConnectError::Browser(format!("redirect listener failed: {e}")))?;

    let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| ConnectError::Browser(e.to_string()))?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
        if raw.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let request = String::from_utf8_lossy(&raw);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| ConnectError::Browser("malformed redirect request".into()))?;
    let redirect = Url::parse(&format!("http://localhost{path}"))
        .map_err(|e| ConnectError::Browser(format!("malformed redirect URL: {e}")))?;
    let token = redirect
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| ConnectError::Browser("redirect carried no token".into()))?;

    let reply = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
                 <html><body>Sign-in complete. You can close this window.</body></html>";
    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;

    Ok(token)
}
