//! MX resolution backed by hickory

use async_trait::async_trait;
use hickory_resolver::{
    config::ResolverOpts,
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use log::{debug, warn};
use std::time::Duration;
use thiserror::Error;

use super::traits::MxResolver;
use crate::error::DispatchError;

/// Errors that can occur during MX resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DnsError {
    /// Domain does not exist (NXDOMAIN).
    #[error("Domain does not exist: {0}")]
    DomainNotFound(String),

    /// Domain exists but publishes no MX records.
    #[error("No MX records for domain: {0}")]
    NoRecords(String),

    #[error("DNS lookup failed: {0}")]
    LookupFailed(String),

    #[error("DNS query timed out for domain: {0}")]
    Timeout(String),
}

impl From<DnsError> for DispatchError {
    fn from(err: DnsError) -> Self {
        DispatchError::Dns(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub exchange: String,
    pub preference: u16,
}

pub struct HickoryMxResolver {
    resolver: TokioResolver,
}

impl HickoryMxResolver {
    /// Build a resolver from the system configuration
    pub fn new(timeout: Duration) -> Result<Self, DnsError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;

        let resolver = TokioResolver::builder(TokioConnectionProvider::default())
            .map_err(|e| DnsError::LookupFailed(e.to_string()))?
            .with_options(opts)
            .build();

        Ok(Self { resolver })
    }
}

#[async_trait]
impl MxResolver for HickoryMxResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                let mut records: Vec<MxRecord> = lookup
                    .iter()
                    .map(|mx| MxRecord {
                        exchange: mx.exchange().to_utf8(),
                        preference: mx.preference(),
                    })
                    .collect();

                if records.is_empty() {
                    return Err(DnsError::NoRecords(domain.to_string()));
                }

                records.sort_by_key(|r| r.preference);
                debug!("Resolved {} MX record(s) for {}", records.len(), domain);
                Ok(records)
            }
            Err(err) if err.is_nx_domain() => Err(DnsError::DomainNotFound(domain.to_string())),
            Err(err) if err.is_no_records_found() => Err(DnsError::NoRecords(domain.to_string())),
            Err(err) => {
                warn!("MX lookup failed for {}: {}", domain, err);
                Err(DnsError::LookupFailed(err.to_string()))
            }
        }
    }
}
