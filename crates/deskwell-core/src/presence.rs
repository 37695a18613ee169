//! "Is the user in a call" probe.
//!
//! Best effort by contract: a missing token, timeout, non-2xx response, or
//! unparseable body all answer `false`, so reminder behavior never depends on
//! the probe being reachable.

use std::time::Duration;

use serde_json::Value;

/// Microsoft Graph presence endpoint.
pub const GRAPH_PRESENCE_URL: &str = "https://graph.microsoft.com/v1.0/me/presence";

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Synchronous call/meeting presence probe.
pub trait PresenceProbe: Send + Sync {
    fn is_in_call(&self) -> bool;
}

/// Probe backed by the Microsoft Graph presence API.
///
/// Requires a bearer token with `Presence.Read`; without one the probe is a
/// constant `false` and never touches the network.
pub struct GraphPresence {
    endpoint: String,
    token: Option<String>,
    client: reqwest::blocking::Client,
}

impl GraphPresence {
    pub fn new(token: Option<String>) -> Self {
        Self::with_endpoint(GRAPH_PRESENCE_URL, token)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn fetch(&self) -> Result<bool, Box<dyn std::error::Error>> {
        let Some(token) = &self.token else {
            return Ok(false);
        };
        let resp = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .timeout(PROBE_TIMEOUT)
            .send()?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let data: Value = resp.json()?;
        let activity = data.get("activity").and_then(Value::as_str).unwrap_or("");
        Ok(matches!(activity, "InACall" | "InAMeeting"))
    }
}

impl PresenceProbe for GraphPresence {
    fn is_in_call(&self) -> bool {
        self.fetch().unwrap_or(false)
    }
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "deskwell";

    /// Key under which the Graph presence token is stored.
    pub const GRAPH_TOKEN_KEY: &str = "graph_token";

    pub fn get(key: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
