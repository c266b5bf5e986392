//! # Principal Registry
//!
//! Static lookup of internal callers (principal name → shared secret) plus
//! the optional IP allow-list.
//!
//! The registry is assembled once at startup from configuration and is
//! immutable afterwards. Share it behind an `Arc`; lookups take no locks.
//!
//! ## Fail-open allow-list
//!
//! An empty allow-list disables IP filtering entirely: [`PrincipalRegistry::is_ip_allowed`]
//! returns `true` for every input, including empty and malformed strings.
//! Configure `INTERNAL_SERVICE_WHITELIST` to restrict callers by address.

use std::collections::{HashMap, HashSet};

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Environment keys mapped to the principal each one registers.
pub const DEFAULT_BINDINGS: &[(&str, &str)] = &[
    ("BACKEND_CORE_SECRET", "admin-service"),
    ("LAUNCHPAD_SERVICE_SECRET", "launchpad-service"),
];

/// A shared symmetric key.
///
/// Wiped from memory on drop. `Debug` never prints the value.
#[derive(Clone)]
pub struct ServiceSecret(Zeroizing<String>);

impl ServiceSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Constant-time equality against a claimed secret.
    ///
    /// A length mismatch still performs a dummy comparison so timing does
    /// not reveal how close the claim was.
    pub fn matches(&self, claimed: &str) -> bool {
        let expected = self.0.as_bytes();
        let claimed = claimed.as_bytes();
        if expected.len() != claimed.len() {
            let _ = expected.ct_eq(expected);
            return false;
        }
        expected.ct_eq(claimed).into()
    }
}

impl std::fmt::Debug for ServiceSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServiceSecret([REDACTED])")
    }
}

impl From<&str> for ServiceSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for ServiceSecret {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

/// Set of IP address strings permitted to present a valid principal.
///
/// Exact string match only; no CIDR ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: HashSet<String>,
}

impl AllowList {
    /// Parse a comma-separated list. Entries are trimmed; empty entries are dropped.
    pub fn parse(csv: &str) -> Self {
        csv.split(',')
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the list is empty, otherwise exact membership.
    pub fn permits(&self, ip: &str) -> bool {
        self.entries.is_empty() || self.entries.contains(ip)
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Errors building a registry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The same principal name was registered twice.
    #[error("principal '{0}' is registered more than once")]
    DuplicatePrincipal(String),
    /// A principal name was empty.
    #[error("principal name must not be empty")]
    EmptyName,
}

/// Immutable principal → secret table plus the caller allow-list.
#[derive(Debug, Clone, Default)]
pub struct PrincipalRegistry {
    principals: HashMap<String, ServiceSecret>,
    allow_list: AllowList,
}

impl PrincipalRegistry {
    pub fn builder() -> PrincipalRegistryBuilder {
        PrincipalRegistryBuilder::default()
    }

    /// Build from `(config key, principal name)` bindings.
    ///
    /// `lookup` resolves a configuration key to its value. Keys that are
    /// unset or empty register nothing, so a deployment only trusts the
    /// callers it has secrets for.
    pub fn from_bindings<F>(
        bindings: &[(&str, &str)],
        lookup: F,
        allow_list: AllowList,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder().allow_list(allow_list);
        for (key, name) in bindings {
            match lookup(key).filter(|secret| !secret.is_empty()) {
                Some(secret) => builder = builder.principal(*name, secret),
                None => tracing::debug!(key, principal = name, "no secret configured, principal not registered"),
            }
        }
        builder.build()
    }

    /// Secret for a registered principal.
    pub fn resolve(&self, name: &str) -> Option<&ServiceSecret> {
        self.principals.get(name)
    }

    /// See the module docs: an empty allow-list admits every address.
    pub fn is_ip_allowed(&self, ip: &str) -> bool {
        self.allow_list.permits(ip)
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Registered principal names, sorted.
    pub fn principal_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.principals.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

/// Builder for [`PrincipalRegistry`].
#[derive(Debug, Default)]
pub struct PrincipalRegistryBuilder {
    principals: Vec<(String, ServiceSecret)>,
    allow_list: AllowList,
}

impl PrincipalRegistryBuilder {
    pub fn principal(mut self, name: impl Into<String>, secret: impl Into<ServiceSecret>) -> Self {
        self.principals.push((name.into(), secret.into()));
        self
    }

    pub fn allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn build(self) -> Result<PrincipalRegistry, RegistryError> {
        let mut principals = HashMap::with_capacity(self.principals.len());
        for (name, secret) in self.principals {
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if principals.contains_key(&name) {
                return Err(RegistryError::DuplicatePrincipal(name));
            }
            principals.insert(name, secret);
        }
        Ok(PrincipalRegistry {
            principals,
            allow_list: self.allow_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn resolve_returns_registered_secret() {
        let registry = PrincipalRegistry::builder()
            .principal("svc-a", "secret-a")
            .build()
            .unwrap();
        assert_eq!(registry.resolve("svc-a").unwrap().expose(), "secret-a");
        assert!(registry.resolve("svc-b").is_none());
    }

    #[test]
    fn duplicate_principal_rejected() {
        let err = PrincipalRegistry::builder()
            .principal("svc-a", "one")
            .principal("svc-a", "two")
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicatePrincipal("svc-a".into()));
    }

    #[test]
    fn empty_name_rejected() {
        let err = PrincipalRegistry::builder()
            .principal("", "secret")
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyName);
    }

    #[test]
    fn from_bindings_skips_missing_and_empty_secrets() {
        let lookup = lookup_from(&[("BACKEND_CORE_SECRET", "core"), ("LAUNCHPAD_SERVICE_SECRET", "")]);
        let registry =
            PrincipalRegistry::from_bindings(DEFAULT_BINDINGS, lookup, AllowList::default()).unwrap();
        assert_eq!(registry.principal_names(), vec!["admin-service"]);
        assert!(registry.resolve("launchpad-service").is_none());
    }

    #[test]
    fn from_bindings_with_nothing_configured_is_empty() {
        let registry =
            PrincipalRegistry::from_bindings(DEFAULT_BINDINGS, |_| None, AllowList::default()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_allow_list_admits_anything() {
        let registry = PrincipalRegistry::default();
        for ip in ["10.0.0.1", "", "not-an-ip", "::1"] {
            assert!(registry.is_ip_allowed(ip));
        }
    }

    #[test]
    fn allow_list_is_exact_match() {
        let registry = PrincipalRegistry::builder()
            .allow_list(AllowList::parse("10.0.0.1, 10.0.0.2"))
            .build()
            .unwrap();
        assert!(registry.is_ip_allowed("10.0.0.1"));
        assert!(registry.is_ip_allowed("10.0.0.2"));
        assert!(!registry.is_ip_allowed("10.0.0.3"));
        assert!(!registry.is_ip_allowed("10.0.0.0/24"));
        assert!(!registry.is_ip_allowed(""));
    }

    #[test]
    fn allow_list_parse_trims_and_drops_empty_entries() {
        let list = AllowList::parse(" 10.0.0.1 ,, ,127.0.0.1,");
        assert_eq!(list.len(), 2);
        assert!(list.permits("127.0.0.1"));
        assert!(AllowList::parse(" , ").is_empty());
    }

    #[test]
    fn secret_matches_is_exact() {
        let secret = ServiceSecret::new("secret-token-123");
        assert!(secret.matches("secret-token-123"));
        assert!(!secret.matches("secret-token-124"));
        assert!(!secret.matches("secret"));
        assert!(!secret.matches(""));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = ServiceSecret::new("hunter2");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}
