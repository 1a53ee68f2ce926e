// src/policies/rules.rs
//! Access rules read from a JSON file.
//!
//! # File Format
//! ```json
//! {
//!   "https://pod.example/alice/notes": {
//!     "*": ["urn:example:css:modes:read"],
//!     "https://bob.example/#me": ["urn:example:css:modes:write"]
//!   }
//! }
//! ```
//! The principal `*` stands for everyone. The file is re-read whenever its
//! modification time or size changes.

use crate::error::{Result, UmaError};
use crate::models::claims::ClaimSet;
use crate::models::credential::WEBID;
use crate::models::permission::Permission;
use crate::models::requirements::{ClaimPredicate, Requirements};
use crate::policies::Authorizer;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;
use tokio::sync::RwLock;

/// Principal granting access to everyone.
pub const EVERYONE: &str = "*";

/// Resource to principal to scopes.
pub type Rules = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

struct Cache {
    rules: Arc<Rules>,
    fingerprint: Fingerprint,
}

/// Authorizer backed by a hot-reloaded rules file.
pub struct RulesAuthorizer {
    path: PathBuf,
    cache: RwLock<Cache>,
}

fn fingerprint_of(path: &Path, metadata: io::Result<Metadata>) -> Result<Fingerprint> {
    let metadata = metadata.map_err(|e| UmaError::Config(format!("{} cannot be read: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(UmaError::Config(format!("{} does not resolve to a file", path.display())));
    }
    Ok(Fingerprint { modified: metadata.modified().ok(), len: metadata.len() })
}

fn parse_rules(path: &Path, raw: io::Result<String>) -> Result<Rules> {
    let raw = raw.map_err(|e| UmaError::Config(format!("{} cannot be read: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| UmaError::Config(format!("{} holds invalid rules: {}", path.display(), e)))
}

impl RulesAuthorizer {
    /// Loads the rules file.
    ///
    /// # Errors
    /// `Config` if the path is not a readable file of valid rules.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let fingerprint = fingerprint_of(&path, std::fs::metadata(&path))?;
        let rules = parse_rules(&path, std::fs::read_to_string(&path))?;
        info!("Loaded rules for {} resource(s) from {}", rules.len(), path.display());
        Ok(Self { path, cache: RwLock::new(Cache { rules: Arc::new(rules), fingerprint }) })
    }

    /// The current rules, re-reading the file first if it changed.
    ///
    /// A failed reload keeps the previous rules.
    pub async fn rules(&self) -> Arc<Rules> {
        let current = fingerprint_of(&self.path, fs::metadata(&self.path).await);
        {
            let cache = self.cache.read().await;
            match &current {
                Ok(fp) if *fp == cache.fingerprint => return cache.rules.clone(),
                Err(e) => {
                    warn!("Keeping previous rules: {}", e);
                    return cache.rules.clone();
                }
                Ok(_) => {}
            }
        }

        let mut cache = self.cache.write().await;
        if let Ok(fp) = current {
            if fp != cache.fingerprint {
                match parse_rules(&self.path, fs::read_to_string(&self.path).await) {
                    Ok(rules) => {
                        info!("Reloaded rules from {}", self.path.display());
                        cache.rules = Arc::new(rules);
                    }
                    Err(e) => warn!("Keeping previous rules: {}", e),
                }
                cache.fingerprint = fp;
            }
        }
        cache.rules.clone()
    }
}

fn scopes_of<'a>(principals: &'a BTreeMap<String, Vec<String>>, principal: &str) -> impl Iterator<Item = &'a String> {
    principals.get(principal).into_iter().flatten()
}

#[async_trait]
impl Authorizer for RulesAuthorizer {
    async fn permissions(&self, claims: &ClaimSet, query: Option<&[Permission]>) -> Result<Vec<Permission>> {
        let rules = self.rules().await;
        let webids: Vec<&str> = claims.values(WEBID).iter().filter_map(Value::as_str).collect();

        let query = match query {
            Some(query) => query.to_vec(),
            None => rules
                .keys()
                .map(|resource| Permission { resource_id: Some(resource.clone()), resource_scopes: None })
                .collect(),
        };

        let granted = query
            .into_iter()
            .filter_map(|permission| {
                let resource = permission.resource_id.as_ref()?;
                let principals = rules.get(resource)?;
                let allowed: HashSet<&String> = scopes_of(principals, EVERYONE)
                    .chain(webids.iter().flat_map(|webid| scopes_of(principals, webid)))
                    .collect();

                let mut scopes: Vec<String> = match &permission.resource_scopes {
                    Some(requested) => requested.iter().filter(|s| allowed.contains(s)).cloned().collect(),
                    None => allowed.into_iter().cloned().collect(),
                };
                scopes.sort();
                scopes.dedup();
                (!scopes.is_empty()).then(|| Permission { resource_id: Some(resource.clone()), resource_scopes: Some(scopes) })
            })
            .collect();
        Ok(granted)
    }

    async fn credentials(&self, permissions: &[Permission], query: Option<&Requirements>) -> Result<Vec<Requirements>> {
        info!("Calculating credentials for {} permission(s)", permissions.len());
        let rules = self.rules().await;
        let mut required = Vec::with_capacity(permissions.len());

        for permission in permissions {
            let Some(resource) = permission.resource_id.as_ref() else {
                warn!("Rules can only grant explicit resources.");
                return Ok(Vec::new());
            };
            let Some(principals) = rules.get(resource) else {
                warn!("No rules found for resource <{}>.", resource);
                return Ok(Vec::new());
            };
            let Some(scopes) = permission.resource_scopes.as_ref() else {
                warn!("Rules can only grant explicit scopes.");
                return Ok(Vec::new());
            };

            let open: HashSet<&String> = scopes_of(principals, EVERYONE).collect();
            if scopes.iter().all(|s| open.contains(s)) {
                debug!("<{}> is open to everyone for {:?}", resource, scopes);
                required.push(Requirements::new());
                continue;
            }

            let qualified: Vec<Value> = principals
                .iter()
                .filter(|(principal, _)| principal.as_str() != EVERYONE)
                .filter(|(_, own)| scopes.iter().all(|s| own.contains(s) || open.contains(s)))
                .map(|(principal, _)| Value::String(principal.clone()))
                .collect();
            if qualified.is_empty() {
                info!("No principal may access <{}> with {:?}", resource, scopes);
                return Ok(Vec::new());
            }
            required.push(Requirements::new().with(WEBID, ClaimPredicate::OneOf { values: qualified }));
        }

        if let Some(query) = query {
            let available: HashSet<&str> = query.claim_names().collect();
            let unavailable = required
                .iter()
                .flat_map(Requirements::claim_names)
                .any(|name| !available.contains(name));
            if unavailable {
                return Ok(Vec::new());
            }
        }

        Ok(required)
    }
}
