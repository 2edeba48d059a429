//! OpenSSH `known_hosts` store
//!
//! Lines look like `patterns keytype base64key [comment]`, optionally prefixed
//! by a `@revoked` or `@cert-authority` marker. Patterns are a comma list of
//! hostnames (with `*`/`?` wildcards and `!` negation), `[host]:port` for
//! non-standard ports, or a single hashed `|1|salt|hash` entry.

use std::fs;
use std::io;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::hmac;
use russh::keys::{parse_public_key_base64, HashAlg, PublicKey};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum KnownHostsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Outcome of looking up a presented host key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStatus {
    Known,
    Unknown,
    Changed { expected: String, actual: String },
    Revoked,
}

impl HostStatus {
    pub fn is_trusted(&self) -> bool {
        matches!(self, HostStatus::Known)
    }
}

#[derive(Debug, Clone)]
enum HostMatcher {
    Patterns(Vec<String>),
    Hashed { salt: Vec<u8>, hash: Vec<u8> },
}

impl HostMatcher {
    fn parse(field: &str, line: usize) -> Result<Self, KnownHostsError> {
        if let Some(hashed) = field.strip_prefix("|1|") {
            let (salt, hash) = hashed.split_once('|').ok_or_else(|| KnownHostsError::Parse {
                line,
                reason: "hashed host is missing its hash".to_string(),
            })?;
            let decode = |part: &str| {
                STANDARD.decode(part).map_err(|e| KnownHostsError::Parse {
                    line,
                    reason: format!("invalid base64 in hashed host: {}", e),
                })
            };
            return Ok(HostMatcher::Hashed {
                salt: decode(salt)?,
                hash: decode(hash)?,
            });
        }

        Ok(HostMatcher::Patterns(
            field.split(',').map(|p| p.to_string()).collect(),
        ))
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            HostMatcher::Hashed { salt, hash } => {
                let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, salt);
                hmac::verify(&key, candidate.as_bytes(), hash).is_ok()
            }
            HostMatcher::Patterns(patterns) => {
                let mut matched = false;
                for pattern in patterns {
                    if let Some(negated) = pattern.strip_prefix('!') {
                        if wildcard_match(negated, candidate) {
                            return false;
                        }
                    } else if wildcard_match(pattern, candidate) {
                        matched = true;
                    }
                }
                matched
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    hosts: HostMatcher,
    key: PublicKey,
    revoked: bool,
}

/// Parsed host-identity store
#[derive(Debug, Clone, Default)]
pub struct KnownHosts {
    entries: Vec<Entry>,
}

impl KnownHosts {
    /// Load and parse a known_hosts file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, KnownHostsError> {
        let contents = fs::read_to_string(path)?;
        let store = Self::parse(&contents)?;
        debug!(
            path = %path.display(),
            entries = store.entries.len(),
            "loaded known_hosts"
        );
        Ok(store)
    }

    pub fn parse(contents: &str) -> Result<Self, KnownHostsError> {
        let mut entries = Vec::new();

        for (index, raw) in contents.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let mut fields = text.split_whitespace().peekable();
            let mut revoked = false;
            if let Some(marker) = fields.peek().filter(|f| f.starts_with('@')).copied() {
                match marker {
                    "@revoked" => revoked = true,
                    "@cert-authority" => {
                        warn!(line, "@cert-authority entries are not supported, skipping");
                        continue;
                    }
                    other => {
                        return Err(KnownHostsError::Parse {
                            line,
                            reason: format!("unknown marker {}", other),
                        })
                    }
                }
                fields.next();
            }

            let (Some(hosts), Some(key_type), Some(key_data)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(KnownHostsError::Parse {
                    line,
                    reason: "expected `hosts keytype key`".to_string(),
                });
            };

            let key = parse_public_key_base64(key_data).map_err(|e| KnownHostsError::Parse {
                line,
                reason: format!("invalid {} key: {}", key_type, e),
            })?;

            entries.push(Entry {
                hosts: HostMatcher::parse(hosts, line)?,
                key,
                revoked,
            });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the key presented by `host:port`.
    pub fn verify(&self, host: &str, port: u16, key: &PublicKey) -> HostStatus {
        let candidate = host_lookup_name(host, port);
        let matching: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.hosts.matches(&candidate))
            .collect();

        if matching
            .iter()
            .any(|entry| entry.revoked && entry.key.key_data() == key.key_data())
        {
            return HostStatus::Revoked;
        }

        if matching
            .iter()
            .any(|entry| !entry.revoked && entry.key.key_data() == key.key_data())
        {
            return HostStatus::Known;
        }

        // A different key of the same algorithm means the host identity changed
        match matching
            .iter()
            .find(|entry| !entry.revoked && entry.key.algorithm() == key.algorithm())
        {
            Some(entry) => HostStatus::Changed {
                expected: fingerprint(&entry.key),
                actual: fingerprint(key),
            },
            None => HostStatus::Unknown,
        }
    }
}

/// The name a host is recorded under: bare for port 22, `[host]:port` otherwise.
pub fn host_lookup_name(host: &str, port: u16) -> String {
    if port == 22 {
        host.to_string()
    } else {
        format!("[{}]:{}", host, port)
    }
}

pub fn fingerprint(key: &PublicKey) -> String {
    key.fingerprint(HashAlg::Sha256).to_string()
}

/// Case-insensitive glob match. A mismatch only backtracks to the most recent `*`.
fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let (p, c) = (pattern.as_bytes(), candidate.as_bytes());
    let (mut pi, mut ci) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ci < c.len() {
        match p.get(pi) {
            Some(b'*') => {
                star = Some((pi, ci));
                pi += 1;
            }
            Some(&b) if b == b'?' || b.eq_ignore_ascii_case(&c[ci]) => {
                pi += 1;
                ci += 1;
            }
            _ => match star {
                Some((star_pi, star_ci)) => {
                    pi = star_pi + 1;
                    ci = star_ci + 1;
                    star = Some((star_pi, ci));
                }
                None => return false,
            },
        }
    }

    p[pi..].iter().all(|&b| b == b'*')
}
