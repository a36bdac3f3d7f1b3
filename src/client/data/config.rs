//! JSON-free configuration for IRC clients: a plain struct with TOML loading.
#[cfg(feature = "toml_config")]
use std::fs::File;
#[cfg(feature = "toml_config")]
use std::io::Read;
#[cfg(feature = "toml_config")]
use std::path::Path;

#[cfg(feature = "toml_config")]
use serde::{Deserialize, Serialize};

use crate::error;

/// Configuration for IRC clients.
///
/// Every field is optional; getters substitute sensible defaults. Only
/// `nickname` and `server` are required to connect.
#[derive(Clone, Default, PartialEq, Debug)]
#[cfg_attr(feature = "toml_config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "toml_config", serde(default))]
pub struct Config {
    /// The client's nickname.
    pub nickname: Option<String>,
    /// Alternative nicknames, tried in order when the nickname is taken.
    pub alt_nicks: Vec<String>,
    /// The client's username (ident).
    pub username: Option<String>,
    /// The client's real name.
    pub realname: Option<String>,
    /// The server to connect to.
    pub server: Option<String>,
    /// The port to connect on.
    pub port: Option<u16>,
    /// The connection password, sent via PASS before registration.
    pub password: Option<String>,
    /// Whether to connect over TLS.
    pub use_tls: Option<bool>,
    /// The encoding used for this connection. Typically UTF-8.
    pub encoding: Option<String>,
    /// Channels to join once registration completes.
    pub channels: Vec<String>,
    /// User modes to set on connect, e.g. `+iw`.
    pub umodes: Option<String>,
    /// The SASL PLAIN account name. SASL is attempted when both this and
    /// `sasl_password` are present and the server advertises the cap.
    pub sasl_account: Option<String>,
    /// The SASL PLAIN password.
    pub sasl_password: Option<String>,
    /// Whether a SASL failure aborts the connection. Defaults to true;
    /// when false the client continues unauthenticated.
    pub sasl_fail_is_fatal: Option<bool>,
    /// Seconds between client-initiated PINGs.
    pub ping_time: Option<u32>,
    /// Seconds to wait for a PONG before declaring the connection dead.
    pub ping_timeout: Option<u32>,
    /// The number of lines that may be sent in a burst before throttling.
    pub max_messages_in_burst: Option<u32>,
    /// The sustained line rate once the burst allowance is spent.
    pub messages_per_second: Option<u32>,
    /// Whether to use a mock connection for testing.
    pub use_mock_connection: Option<bool>,
    /// The initial value for the mock connection to read.
    pub mock_initial_value: Option<String>,
}

impl Config {
    /// Loads a configuration from the desired TOML file.
    #[cfg(feature = "toml_config")]
    pub fn load<P: AsRef<Path>>(path: P) -> error::Result<Config> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        Ok(toml::from_str(&data)?)
    }

    /// Gets the nickname specified in the configuration.
    pub fn nickname(&self) -> error::Result<&str> {
        self.nickname
            .as_deref()
            .ok_or(error::Error::MissingConfigField { field: "nickname" })
    }

    /// Gets the alternate nicknames specified in the configuration.
    pub fn alternate_nicknames(&self) -> &[String] {
        &self.alt_nicks
    }

    /// Gets the username, defaulting to the nickname.
    pub fn username(&self) -> &str {
        self.username
            .as_deref()
            .or_else(|| self.nickname.as_deref())
            .unwrap_or("banter")
    }

    /// Gets the real name, defaulting to the nickname.
    pub fn real_name(&self) -> &str {
        self.realname
            .as_deref()
            .or_else(|| self.nickname.as_deref())
            .unwrap_or("banter")
    }

    /// Gets the server address specified in the configuration.
    pub fn server(&self) -> error::Result<&str> {
        self.server
            .as_deref()
            .ok_or(error::Error::MissingConfigField { field: "server" })
    }

    /// Gets the port, defaulting to 6697 with TLS and 6667 without.
    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or(if self.use_tls() { 6697 } else { 6667 })
    }

    /// Gets the server password, or the empty string when none is set.
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }

    /// Whether to connect over TLS.
    pub fn use_tls(&self) -> bool {
        self.use_tls.unwrap_or(false)
    }

    /// Gets the encoding label for the connection.
    pub fn encoding(&self) -> &str {
        self.encoding.as_deref().unwrap_or("UTF-8")
    }

    /// Gets the channels to join on connect.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Gets the user modes to set on connect, if any.
    pub fn umodes(&self) -> Option<&str> {
        self.umodes.as_deref()
    }

    /// Gets the SASL PLAIN credentials as `(account, password)`, when both
    /// are configured.
    pub fn sasl_credentials(&self) -> Option<(&str, &str)> {
        match (self.sasl_account.as_deref(), self.sasl_password.as_deref()) {
            (Some(account), Some(password)) => Some((account, password)),
            _ => None,
        }
    }

    /// Whether a SASL failure aborts the connection.
    pub fn sasl_fail_is_fatal(&self) -> bool {
        self.sasl_fail_is_fatal.unwrap_or(true)
    }

    /// Gets the seconds between client-initiated PINGs.
    pub fn ping_time(&self) -> u32 {
        self.ping_time.unwrap_or(180)
    }

    /// Gets the seconds to wait for a PONG before giving up.
    pub fn ping_timeout(&self) -> u32 {
        self.ping_timeout.unwrap_or(20)
    }

    /// Gets the burst allowance for the flood bucket.
    pub fn max_messages_in_burst(&self) -> u32 {
        self.max_messages_in_burst.unwrap_or(4)
    }

    /// Gets the sustained line rate for the flood bucket.
    pub fn messages_per_second(&self) -> u32 {
        self.messages_per_second.unwrap_or(2)
    }

    /// Whether this configuration uses a mock connection for testing.
    pub fn use_mock_connection(&self) -> bool {
        self.use_mock_connection.unwrap_or(false)
    }

    /// The initial value for the mock connection to read.
    pub fn mock_initial_value(&self) -> &str {
        self.mock_initial_value.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod test {
    use super::Config;

    fn test_config() -> Config {
        Config {
            nickname: Some("test".to_owned()),
            server: Some("irc.test.net".to_owned()),
            channels: vec!["#test".to_owned(), "#test2".to_owned()],
            ..Default::default()
        }
    }

    #[test]
    fn getters_substitute_defaults() {
        let config = test_config();
        assert_eq!(config.nickname().unwrap(), "test");
        assert_eq!(config.username(), "test");
        assert_eq!(config.real_name(), "test");
        assert_eq!(config.port(), 6667);
        assert_eq!(config.encoding(), "UTF-8");
        assert_eq!(config.max_messages_in_burst(), 4);
        assert_eq!(config.messages_per_second(), 2);
        assert!(config.sasl_fail_is_fatal());
        assert!(config.sasl_credentials().is_none());
    }

    #[test]
    fn tls_changes_default_port() {
        let config = Config {
            use_tls: Some(true),
            ..test_config()
        };
        assert_eq!(config.port(), 6697);
    }

    #[test]
    fn missing_required_fields_error() {
        let config = Config::default();
        assert!(config.nickname().is_err());
        assert!(config.server().is_err());
    }

    #[cfg(feature = "toml_config")]
    #[test]
    fn loads_toml() {
        let data = "nickname = \"test\"\nserver = \"irc.test.net\"\nchannels = [\"#test\"]\n";
        let config: Config = toml::from_str(data).unwrap();
        assert_eq!(config.nickname().unwrap(), "test");
        assert_eq!(config.channels(), &["#test".to_owned()][..]);
    }
}
