//! Protocol-scoped connection configuration.
//!
//! A [`ConnectionProfile`] accumulates session settings under keys
//! qualified by the active protocol token and owns the plaintext-to-TLS
//! key migration.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Default connect/read timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: &str = "60000";

/// Socket factory name for the untrusted-host TLS branch; the session
/// library maps it to its platform default factory.
pub const DEFAULT_SSL_SOCKET_FACTORY: &str = "tls-default";

/// Transport protocol family.
///
/// Each family pairs a plaintext token with its TLS token; the pair
/// drives both key qualification and the upgrade migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    /// IMAP receive family (`imap` / `imaps`).
    Imap,
    /// POP3 receive family (`pop3` / `pop3s`).
    Pop3,
    /// SMTP send family (`smtp` / `smtps`).
    Smtp,
}

impl ProtocolFamily {
    /// Returns the plaintext protocol token.
    #[must_use]
    pub const fn plain_token(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Pop3 => "pop3",
            Self::Smtp => "smtp",
        }
    }

    /// Returns the TLS protocol token.
    #[must_use]
    pub const fn secure_token(self) -> &'static str {
        match self {
            Self::Imap => "imaps",
            Self::Pop3 => "pop3s",
            Self::Smtp => "smtps",
        }
    }
}

/// A resolved username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Account user name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Deferred credential resolver, invoked only at session-creation time.
pub type CredentialProvider = Arc<dyn Fn() -> Credential + Send + Sync>;

/// Marker value for the trusted-host TLS socket factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHostFactory {
    /// Hosts whose certificates are accepted without verification.
    pub hosts: Vec<String>,
}

/// A configuration value: a plain string or an opaque object handed
/// through to the session library.
#[derive(Clone)]
pub enum SettingValue {
    /// String-valued setting.
    Text(String),
    /// Opaque object-valued setting.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl SettingValue {
    /// Returns the string value, if this is a text setting.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Opaque(_) => None,
        }
    }
}

impl fmt::Debug for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl PartialEq for SettingValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Protocol-scoped key/value configuration plus an optional deferred
/// credential.
///
/// Not thread-safe: build a profile up sequentially on one thread, then
/// hand it to a send or receive call. [`ConnectionProfile::upgrade_to_ssl`]
/// must be called at most once.
#[derive(Clone)]
pub struct ConnectionProfile {
    family: ProtocolFamily,
    protocol: String,
    settings: BTreeMap<String, SettingValue>,
    credential: Option<CredentialProvider>,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("protocol", &self.protocol)
            .field("settings", &self.settings)
            .field("credential", &self.credential.is_some())
            .finish()
    }
}

impl ConnectionProfile {
    /// Creates a profile for the given family, pre-populated with
    /// 60-second connect and read timeouts.
    #[must_use]
    pub fn new(family: ProtocolFamily) -> Self {
        let mut profile = Self {
            family,
            protocol: family.plain_token().to_string(),
            settings: BTreeMap::new(),
            credential: None,
        };
        if family == ProtocolFamily::Smtp {
            profile.set_string("transport.protocol", family.plain_token());
        }
        profile.connect_timeout(DEFAULT_TIMEOUT_MS);
        profile.read_timeout(DEFAULT_TIMEOUT_MS);
        profile
    }

    /// Creates an IMAP profile.
    #[must_use]
    pub fn imap() -> Self {
        Self::new(ProtocolFamily::Imap)
    }

    /// Creates a POP3 profile.
    #[must_use]
    pub fn pop3() -> Self {
        Self::new(ProtocolFamily::Pop3)
    }

    /// Creates an SMTP profile.
    #[must_use]
    pub fn smtp() -> Self {
        Self::new(ProtocolFamily::Smtp)
    }

    /// Returns the active protocol token.
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Returns the protocol family.
    #[must_use]
    pub const fn family(&self) -> ProtocolFamily {
        self.family
    }

    /// Returns the setting stored under the given key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.settings.get(key)
    }

    /// Returns the string setting stored under the given key.
    #[must_use]
    pub fn string_value(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(SettingValue::as_text)
    }

    /// Iterates over all settings in key order.
    pub fn settings(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stores a string setting. Blank values are ignored, never stored.
    pub fn set_string(&mut self, key: impl Into<String>, value: &str) -> &mut Self {
        if !value.trim().is_empty() {
            self.settings
                .insert(key.into(), SettingValue::Text(value.to_string()));
        }
        self
    }

    /// Stores an object setting. `None` is ignored.
    pub fn set_object(
        &mut self,
        key: impl Into<String>,
        value: Option<Arc<dyn Any + Send + Sync>>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.settings.insert(key.into(), SettingValue::Opaque(value));
        }
        self
    }

    /// Sets the server host name, both unscoped and under the active
    /// protocol.
    pub fn host(&mut self, host: &str) -> &mut Self {
        self.set_string("transport.host", host);
        let key = self.scoped_key("host");
        self.set_string(key, host)
    }

    /// Sets the server port under the active protocol.
    pub fn port(&mut self, port: &str) -> &mut Self {
        let key = self.scoped_key("port");
        self.set_string(key, port)
    }

    /// Sets the connect timeout (milliseconds) under the active
    /// protocol.
    pub fn connect_timeout(&mut self, timeout_ms: &str) -> &mut Self {
        let key = self.scoped_key("connectiontimeout");
        self.set_string(key, timeout_ms)
    }

    /// Sets the read timeout (milliseconds) under the active protocol.
    pub fn read_timeout(&mut self, timeout_ms: &str) -> &mut Self {
        let key = self.scoped_key("timeout");
        self.set_string(key, timeout_ms)
    }

    /// Stores a deferred credential for the session. A no-op unless
    /// both parts are non-blank.
    ///
    /// SMTP profiles additionally record the `auth` flag; POP3 and IMAP
    /// sessions authenticate implicitly during their handshake and
    /// never set it.
    pub fn authenticate(&mut self, username: &str, password: &str) -> &mut Self {
        if username.trim().is_empty() || password.trim().is_empty() {
            return self;
        }
        let credential = Credential {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.authenticate_with(Arc::new(move || credential.clone()))
    }

    /// Stores a custom deferred credential resolver, invoked only when
    /// the session is created.
    pub fn authenticate_with(&mut self, provider: CredentialProvider) -> &mut Self {
        self.credential = Some(provider);
        if self.family == ProtocolFamily::Smtp {
            let key = self.scoped_key("auth");
            self.set_string(key, "true");
        }
        self
    }

    /// Resolves the deferred credential, if one was configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credential> {
        self.credential.as_ref().map(|provider| provider())
    }

    /// Enables STARTTLS on the plaintext connection.
    ///
    /// When `trusted_host` is set, the configured host is recorded as
    /// trusted for certificate checks.
    pub fn starttls(&mut self, trusted_host: bool) -> &mut Self {
        let key = self.scoped_key("starttls.enable");
        self.set_string(key, "true");
        if trusted_host {
            let host = self
                .string_value(&self.scoped_key("host"))
                .unwrap_or_default()
                .to_string();
            let key = self.scoped_key("ssl.trust");
            self.set_string(key, &host);
        }
        self
    }

    /// Upgrades the profile from plaintext to TLS.
    ///
    /// Every key bearing the old protocol token is renamed to the TLS
    /// token, values preserved; no old-token key remains afterwards.
    /// The TLS-specific keys are then set on top of the migrated map.
    ///
    /// Call at most once per profile; a second call re-derives the
    /// protocol from the already-TLS token.
    pub fn upgrade_to_ssl(&mut self, trusted_host: bool) -> &mut Self {
        let old = std::mem::replace(
            &mut self.protocol,
            self.family.secure_token().to_string(),
        );
        let new = self.protocol.clone();

        self.settings = std::mem::take(&mut self.settings)
            .into_iter()
            .map(|(key, value)| (key.replace(&old, &new), value))
            .collect();
        tracing::debug!(from = %old, to = %new, "migrated protocol-scoped settings");

        if self.family == ProtocolFamily::Smtp {
            self.set_string("transport.protocol", &new);
        }

        let key = self.scoped_key("ssl.enable");
        self.set_string(key, "true");

        if trusted_host {
            let host = self
                .string_value(&self.scoped_key("host"))
                .unwrap_or_default()
                .to_string();
            let hosts = if host.is_empty() { Vec::new() } else { vec![host] };
            let key = self.scoped_key("socketFactory");
            self.set_object(key, Some(Arc::new(TrustedHostFactory { hosts })));
        } else {
            let key = self.scoped_key("socketFactory.class");
            self.set_string(key, DEFAULT_SSL_SOCKET_FACTORY);
        }

        let key = self.scoped_key("socketFactory.fallback");
        self.set_string(key, "false");

        if let Some(port) = self
            .string_value(&self.scoped_key("port"))
            .map(ToString::to_string)
        {
            let key = self.scoped_key("socketFactory.port");
            self.set_string(key, &port);
        }
        self
    }

    fn scoped_key(&self, suffix: &str) -> String {
        format!("transport.{}.{suffix}", self.protocol)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults_prepopulated() {
        let profile = ConnectionProfile::imap();
        assert_eq!(
            profile.string_value("transport.imap.connectiontimeout"),
            Some("60000")
        );
        assert_eq!(profile.string_value("transport.imap.timeout"), Some("60000"));
    }

    #[test]
    fn test_smtp_records_transport_protocol() {
        let profile = ConnectionProfile::smtp();
        assert_eq!(profile.string_value("transport.protocol"), Some("smtp"));
        assert!(ConnectionProfile::pop3().string_value("transport.protocol").is_none());
    }

    #[test]
    fn test_set_string_ignores_blank() {
        let mut profile = ConnectionProfile::imap();
        let before: Vec<String> = profile.settings().map(|(k, _)| k.to_string()).collect();

        profile.set_string("transport.imap.host", "");
        profile.set_string("transport.imap.host", "   ");

        let after: Vec<String> = profile.settings().map(|(k, _)| k.to_string()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_set_object_ignores_none() {
        let mut profile = ConnectionProfile::imap();
        profile.set_object("transport.imap.socketFactory", None);
        assert!(profile.get("transport.imap.socketFactory").is_none());
    }

    #[test]
    fn test_host_sets_scoped_and_unscoped_keys() {
        let mut profile = ConnectionProfile::pop3();
        profile.host("mail.example.com");
        assert_eq!(profile.string_value("transport.host"), Some("mail.example.com"));
        assert_eq!(
            profile.string_value("transport.pop3.host"),
            Some("mail.example.com")
        );
    }

    #[test]
    fn test_upgrade_migrates_every_scoped_key() {
        let mut profile = ConnectionProfile::imap();
        profile.host("x").port("143");
        profile.upgrade_to_ssl(false);

        assert_eq!(profile.protocol(), "imaps");
        assert_eq!(profile.string_value("transport.imaps.host"), Some("x"));
        assert_eq!(profile.string_value("transport.imaps.port"), Some("143"));
        assert_eq!(
            profile.string_value("transport.imaps.ssl.enable"),
            Some("true")
        );
        assert_eq!(
            profile.string_value("transport.imaps.socketFactory.class"),
            Some(DEFAULT_SSL_SOCKET_FACTORY)
        );
        assert_eq!(
            profile.string_value("transport.imaps.socketFactory.fallback"),
            Some("false")
        );
        assert_eq!(
            profile.string_value("transport.imaps.socketFactory.port"),
            Some("143")
        );

        let residual: Vec<&str> = profile
            .settings()
            .map(|(k, _)| k)
            .filter(|k| k.starts_with("transport.imap."))
            .collect();
        assert!(residual.is_empty(), "residual plaintext keys: {residual:?}");
    }

    #[test]
    fn test_upgrade_trusted_host_stores_factory_object() {
        let mut profile = ConnectionProfile::imap();
        profile.host("mail.example.com");
        profile.upgrade_to_ssl(true);

        let value = profile.get("transport.imaps.socketFactory").unwrap();
        let SettingValue::Opaque(object) = value else {
            panic!("expected opaque socket factory");
        };
        let factory = object.downcast_ref::<TrustedHostFactory>().unwrap();
        assert_eq!(factory.hosts, vec!["mail.example.com".to_string()]);
    }

    #[test]
    fn test_smtp_upgrade_rewrites_transport_protocol() {
        let mut profile = ConnectionProfile::smtp();
        profile.host("smtp.example.com").port("25");
        profile.upgrade_to_ssl(false);
        assert_eq!(profile.string_value("transport.protocol"), Some("smtps"));
        assert_eq!(
            profile.string_value("transport.smtps.host"),
            Some("smtp.example.com")
        );
    }

    #[test]
    fn test_authenticate_blank_is_noop() {
        let mut profile = ConnectionProfile::smtp();
        profile.authenticate("", "secret");
        profile.authenticate("user", "   ");
        assert!(profile.credentials().is_none());
        assert!(profile.string_value("transport.smtp.auth").is_none());
    }

    #[test]
    fn test_authenticate_sets_auth_flag_for_smtp_only() {
        let mut smtp = ConnectionProfile::smtp();
        smtp.authenticate("user", "secret");
        assert_eq!(smtp.string_value("transport.smtp.auth"), Some("true"));

        let mut imap = ConnectionProfile::imap();
        imap.authenticate("user", "secret");
        assert!(imap.string_value("transport.imap.auth").is_none());

        let credential = smtp.credentials().unwrap();
        assert_eq!(credential.username, "user");
        assert_eq!(credential.password, "secret");
    }

    #[test]
    fn test_credential_resolver_is_deferred() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut profile = ConnectionProfile::imap();
        profile.authenticate_with(Arc::new(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Credential {
                username: "user".to_string(),
                password: "secret".to_string(),
            }
        }));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        let credential = profile.credentials().unwrap();
        assert_eq!(credential.username, "user");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_starttls_trusted_records_host() {
        let mut profile = ConnectionProfile::smtp();
        profile.host("smtp.example.com");
        profile.starttls(true);
        assert_eq!(
            profile.string_value("transport.smtp.starttls.enable"),
            Some("true")
        );
        assert_eq!(
            profile.string_value("transport.smtp.ssl.trust"),
            Some("smtp.example.com")
        );
    }

    proptest! {
        #[test]
        fn prop_upgrade_leaves_no_plain_token_key(
            host in "[a-z]{1,12}(\\.[a-z]{1,8}){0,2}",
            port in "[1-9][0-9]{0,4}",
            family in prop_oneof![
                Just(ProtocolFamily::Imap),
                Just(ProtocolFamily::Pop3),
                Just(ProtocolFamily::Smtp),
            ],
        ) {
            let mut profile = ConnectionProfile::new(family);
            profile.host(&host).port(&port).starttls(false);
            profile.upgrade_to_ssl(false);

            let plain_prefix = format!("transport.{}.", family.plain_token());
            for (key, _) in profile.settings() {
                prop_assert!(!key.starts_with(&plain_prefix), "residual key: {key}");
            }
            let secure_host = format!("transport.{}.host", family.secure_token());
            prop_assert_eq!(profile.string_value(&secure_host), Some(host.as_str()));
        }
    }
}
