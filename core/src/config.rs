//! Serializable client settings.
//!
//! A `ClientConfig` is a plain snapshot of the settings a `Client` can be
//! configured with. It is usually loaded from JSON and applied once at
//! start-up; everything it does not cover (hooks, sinks, custom policies) is
//! set on the client afterwards.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{BasicAuth, Client, Mode};
use crate::error::{Error, Result};
use crate::redirect::FlexibleRedirect;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host_url: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
    pub form_data: BTreeMap<String, String>,
    pub basic_auth: Option<BasicAuth>,
    pub auth_token: Option<String>,
    pub timeout_ms: Option<u64>,
    pub proxy: Option<String>,
    pub insecure_skip_verify: bool,
    pub debug: bool,
    pub content_length: bool,
    pub mode: Mode,
    /// Overrides the mode's redirect policy with a hop limit.
    pub max_redirects: Option<usize>,
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply every setting to `client`.
    pub fn apply(&self, client: &mut Client) {
        client.set_mode(self.mode);
        if let Some(max) = self.max_redirects {
            client.set_redirect_policy(FlexibleRedirect::new(max));
        }
        if let Some(url) = &self.host_url {
            client.set_host_url(url);
        }
        client
            .set_headers(&self.headers)
            .set_query_params(&self.query_params)
            .set_form_data(&self.form_data)
            .set_insecure_skip_verify(self.insecure_skip_verify)
            .set_debug(self.debug)
            .set_content_length(self.content_length);
        if let Some(auth) = &self.basic_auth {
            client.set_basic_auth(auth.username.as_str(), auth.password.as_str());
        }
        if let Some(token) = &self.auth_token {
            client.set_auth_token(token.as_str());
        }
        if let Some(ms) = self.timeout_ms {
            client.set_timeout(Duration::from_millis(ms));
        }
        if let Some(proxy) = &self.proxy {
            client.set_proxy(proxy);
        }
        log::debug!("applied client config for {:?}", self.host_url);
    }
}

impl Client {
    /// A default-transport client configured from `config`.
    #[cfg(feature = "ureq-transport")]
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut client = Client::new();
        config.apply(&mut client);
        client
    }
}
