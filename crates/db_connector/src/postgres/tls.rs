//! TLS connector built from the PEM material stored on a connection.

use chat_core::SslOptions;
use native_tls::{Certificate, Identity, Protocol, TlsConnector};
use postgres_native_tls::MakeTlsConnector;
use tracing::{debug, warn};

use crate::error::{ConnectorError, Result};

fn parse_protocol(version: &str) -> Result<Protocol> {
    match version.trim() {
        "TLSv1" | "TLSv1.0" => Ok(Protocol::Tlsv10),
        "TLSv1.1" => Ok(Protocol::Tlsv11),
        "TLSv1.2" => Ok(Protocol::Tlsv12),
        other => Err(ConnectorError::Tls(format!(
            "unsupported minimum TLS version '{other}'"
        ))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub fn build_tls_connector(ssl: &SslOptions) -> Result<MakeTlsConnector> {
    let mut builder = TlsConnector::builder();

    if let Some(ca) = non_empty(&ssl.ca) {
        let cert = Certificate::from_pem(ca.as_bytes())
            .map_err(|e| ConnectorError::Tls(format!("invalid CA certificate: {e}")))?;
        builder.add_root_certificate(cert);
        debug!("CA certificate loaded");
    }

    match (non_empty(&ssl.cert), non_empty(&ssl.key)) {
        (Some(cert), Some(key)) => {
            let identity = Identity::from_pkcs8(cert.as_bytes(), key.as_bytes())
                .map_err(|e| ConnectorError::Tls(format!("invalid client identity: {e}")))?;
            builder.identity(identity);
            debug!("Client certificate and key loaded");
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(ConnectorError::Tls(
                "client certificate and key must be given together".to_string(),
            ));
        }
        (None, None) => {}
    }

    if let Some(version) = ssl.min_version.as_deref().filter(|v| !v.trim().is_empty()) {
        builder.min_protocol_version(Some(parse_protocol(version)?));
    }

    if ssl.reject_unauthorized == Some(false) {
        warn!("Certificate verification disabled for this connection");
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }

    let connector = builder
        .build()
        .map_err(|e| ConnectorError::Tls(e.to_string()))?;
    Ok(MakeTlsConnector::new(connector))
}
