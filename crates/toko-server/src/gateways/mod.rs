// SPDX-License-Identifier: Apache-2.0

pub mod payment;
pub mod shipping;

use std::net::IpAddr;

/// Transport or protocol failure while talking to an upstream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError(pub String);

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for GatewayError {}

pub(crate) fn validate_gateway_url(url: &str, allow_private_hosts: bool) -> Result<(), GatewayError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|e| GatewayError(format!("invalid gateway url: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| GatewayError("gateway url missing host".to_string()))?
        .to_ascii_lowercase();
    if !allow_private_hosts && (host == "localhost" || host.ends_with(".localhost")) {
        return Err(GatewayError("blocked gateway host: localhost".to_string()));
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        let private = match ip {
            IpAddr::V4(v4) => {
                v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_broadcast()
            }
            IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || v6.is_unique_local(),
        };
        if private && !allow_private_hosts {
            return Err(GatewayError("blocked private gateway host".to_string()));
        }
    }
    Ok(())
}
