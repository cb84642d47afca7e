//! Client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the Carnet client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server unreachable, connection reset or request timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// Token rejected or missing (401/403).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Request refused by the server with a message (other 4xx).
    #[error("{0}")]
    Validation(String),

    /// Resource does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server side failure (5xx).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Token store read/write failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Map a non-success HTTP response to an error.
    ///
    /// The message is taken from the JSON `error` field of the body, then
    /// `message`, then `fallback`.
    pub fn from_response(status: StatusCode, body: &str, fallback: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| fallback.to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            s if s.is_client_error() => ClientError::Validation(message),
            s => ClientError::Server {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// True when the server rejected the credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

impl From<envy::Error> for ClientError {
    fn from(e: envy::Error) -> Self {
        ClientError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::NotFound("Article introuvable".to_string());
        assert_eq!(err.to_string(), "Not found: Article introuvable");

        let err = ClientError::Validation("Titre requis".to_string());
        assert_eq!(err.to_string(), "Titre requis");
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"error": "Token invalide"}"#;

        let err = ClientError::from_response(StatusCode::UNAUTHORIZED, body, "Erreur");
        assert!(matches!(err, ClientError::Auth(ref m) if m == "Token invalide"));
        assert!(err.is_auth());

        let err = ClientError::from_response(StatusCode::NOT_FOUND, body, "Erreur");
        assert!(matches!(err, ClientError::NotFound(_)));

        let err = ClientError::from_response(StatusCode::BAD_REQUEST, body, "Erreur");
        assert!(matches!(err, ClientError::Validation(ref m) if m == "Token invalide"));

        let err = ClientError::from_response(StatusCode::BAD_GATEWAY, body, "Erreur");
        assert!(matches!(err, ClientError::Server { status: 502, .. }));
    }

    #[test]
    fn test_fallback_message() {
        let err = ClientError::from_response(StatusCode::BAD_REQUEST, "<html>", "Erreur de connexion");
        assert_eq!(err.to_string(), "Erreur de connexion");

        let err = ClientError::from_response(StatusCode::CONFLICT, r#"{"error": "  "}"#, "Erreur");
        assert_eq!(err.to_string(), "Erreur");

        let err = ClientError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message": "Email déjà utilisé"}"#,
            "Erreur",
        );
        assert_eq!(err.to_string(), "Email déjà utilisé");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: ClientError = io_err.into();
        assert!(matches!(err, ClientError::Storage(_)));
    }
}
