//! Heuristic recipient screening
//!
//! The validator runs a list of named, weighted checks. The weights of
//! failing checks are summed and the recipient is skipped once the sum
//! reaches the threshold. Evaluation stops as soon as that happens, so
//! expensive checks placed last (MX) are not run for addresses that are
//! already rejected.

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clients::{DnsError, MxResolver};
use crate::config::ValidatorConfig;

/// Result of a single check
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail(String),
    /// The check could not decide; the recipient is not penalised
    Inconclusive(String),
}

#[async_trait]
pub trait RecipientCheck: Send + Sync {
    fn name(&self) -> &'static str;
    async fn evaluate(&self, email: &str) -> Verdict;
}

/// Address shape: one `@`, a local part, a dotted domain
pub struct SyntaxCheck;

#[async_trait]
impl RecipientCheck for SyntaxCheck {
    fn name(&self) -> &'static str {
        "syntax"
    }

    async fn evaluate(&self, email: &str) -> Verdict {
        let email = email.trim();
        if email.chars().any(char::is_whitespace) {
            return Verdict::Fail("address contains whitespace".to_string());
        }

        let mut parts = email.split('@');
        let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => (local, domain),
            _ => return Verdict::Fail("address must contain exactly one @".to_string()),
        };

        if local.is_empty() {
            return Verdict::Fail("empty local part".to_string());
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Verdict::Fail(format!("invalid domain '{}'", domain));
        }

        Verdict::Pass
    }
}

/// Role accounts such as `info@` or `sales.team@`
pub struct GenericAddressCheck {
    blacklist: HashSet<String>,
}

impl GenericAddressCheck {
    pub fn new<I, S>(blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blacklist: blacklist
                .into_iter()
                .map(|token| token.as_ref().trim().to_ascii_lowercase())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl RecipientCheck for GenericAddressCheck {
    fn name(&self) -> &'static str {
        "generic_address"
    }

    async fn evaluate(&self, email: &str) -> Verdict {
        let local = email.split('@').next().unwrap_or_default().to_ascii_lowercase();

        match local
            .split(['.', '-', '_'])
            .find(|token| self.blacklist.contains(*token))
        {
            Some(token) => Verdict::Fail(format!("generic address ({})", token)),
            None => Verdict::Pass,
        }
    }
}

/// Whether the recipient's domain publishes mail servers
pub struct MxRecordCheck {
    resolver: Arc<dyn MxResolver>,
    timeout: Duration,
    cache_ttl: Duration,
    cache: DashMap<String, (Verdict, Instant)>,
}

impl MxRecordCheck {
    pub fn new(resolver: Arc<dyn MxResolver>, timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            resolver,
            timeout,
            cache_ttl,
            cache: DashMap::new(),
        }
    }

    fn cached(&self, domain: &str) -> Option<Verdict> {
        let entry = self.cache.get(domain)?;
        let (verdict, stored_at) = entry.value();
        if stored_at.elapsed() < self.cache_ttl {
            Some(verdict.clone())
        } else {
            drop(entry);
            self.cache.remove(domain);
            None
        }
    }

    async fn lookup_domain(&self, domain: &str) -> Verdict {
        match tokio::time::timeout(self.timeout, self.resolver.resolve_mx(domain)).await {
            Ok(Ok(_)) => Verdict::Pass,
            Ok(Err(DnsError::DomainNotFound(_))) => {
                Verdict::Fail(format!("MX lookup: domain {} does not exist", domain))
            }
            Ok(Err(DnsError::NoRecords(_))) => {
                Verdict::Fail(format!("MX lookup: no mail servers for domain {}", domain))
            }
            Ok(Err(err)) => {
                warn!("MX check inconclusive for {}: {}", domain, err);
                Verdict::Inconclusive(err.to_string())
            }
            Err(_) => {
                warn!("MX check for {} timed out after {:?}", domain, self.timeout);
                Verdict::Inconclusive(DnsError::Timeout(domain.to_string()).to_string())
            }
        }
    }
}

#[async_trait]
impl RecipientCheck for MxRecordCheck {
    fn name(&self) -> &'static str {
        "mx_record"
    }

    async fn evaluate(&self, email: &str) -> Verdict {
        let domain = match email.rsplit_once('@') {
            Some((_, domain)) if !domain.is_empty() => domain.trim().to_ascii_lowercase(),
            _ => return Verdict::Fail("MX lookup: missing domain".to_string()),
        };

        if let Some(verdict) = self.cached(&domain) {
            debug!("MX verdict for {} served from cache", domain);
            return verdict;
        }

        let verdict = self.lookup_domain(&domain).await;
        if !matches!(verdict, Verdict::Inconclusive(_)) {
            self.cache.insert(domain, (verdict.clone(), Instant::now()));
        }
        verdict
    }
}

struct WeightedCheck {
    check: Box<dyn RecipientCheck>,
    weight: f64,
}

/// Aggregate result of all checks run against one address
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub skip: bool,
    pub score: f64,
    /// `name: message` for each failing check
    pub failures: Vec<String>,
    pub inconclusive: Vec<String>,
}

impl ValidationOutcome {
    pub fn reason(&self) -> Option<String> {
        if self.failures.is_empty() {
            None
        } else {
            Some(self.failures.join("; "))
        }
    }
}

pub struct RecipientValidator {
    checks: Vec<WeightedCheck>,
    threshold: f64,
}

impl RecipientValidator {
    pub fn new(threshold: f64) -> Self {
        Self {
            checks: Vec::new(),
            threshold,
        }
    }

    /// Append a check; checks run in insertion order
    pub fn with_check(mut self, check: impl RecipientCheck + 'static, weight: f64) -> Self {
        self.checks.push(WeightedCheck {
            check: Box::new(check),
            weight,
        });
        self
    }

    /// Standard check list: syntax, generic address, MX record
    pub fn from_config(config: &ValidatorConfig, resolver: Arc<dyn MxResolver>) -> Self {
        Self::new(config.threshold)
            .with_check(SyntaxCheck, config.weights.syntax)
            .with_check(GenericAddressCheck::new(&config.blacklist), config.weights.generic_address)
            .with_check(
                MxRecordCheck::new(resolver, config.mx_timeout(), config.cache_ttl()),
                config.weights.mx_record,
            )
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.check.name()).collect()
    }

    pub async fn validate(&self, email: &str) -> ValidationOutcome {
        let mut outcome = ValidationOutcome {
            skip: false,
            score: 0.0,
            failures: Vec::new(),
            inconclusive: Vec::new(),
        };

        for weighted in &self.checks {
            if outcome.score >= self.threshold {
                break;
            }

            match weighted.check.evaluate(email).await {
                Verdict::Pass => {}
                Verdict::Fail(message) => {
                    outcome.score += weighted.weight;
                    outcome.failures.push(format!("{}: {}", weighted.check.name(), message));
                }
                Verdict::Inconclusive(message) => {
                    outcome.inconclusive.push(format!("{}: {}", weighted.check.name(), message));
                }
            }
        }

        outcome.skip = outcome.score >= self.threshold;
        if outcome.skip {
            debug!("Skipping {} (score {:.2}): {:?}", email, outcome.score, outcome.failures);
        }
        outcome
    }
}
