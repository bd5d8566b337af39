//! Collection of per-domain records into the run result.
//!
//! The aggregator is owned by the single task that drains completed
//! verifications, so it needs no locking. Each record is inserted exactly
//! once, which keeps the four category lists disjoint.

use crate::types::{Category, DomainRecord, HttpStatus, RunResult};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug)]
pub struct ResultAggregator {
    server_ip: IpAddr,
    requested: usize,
    direct: Vec<String>,
    healthy: Vec<String>,
    mismatched: Vec<String>,
    no_ping: Vec<String>,
    statuses: BTreeMap<String, HttpStatus>,
    records: Vec<DomainRecord>,
}

impl ResultAggregator {
    pub fn new(server_ip: IpAddr, requested: usize) -> Self {
        Self {
            server_ip,
            requested,
            direct: Vec::new(),
            healthy: Vec::new(),
            mismatched: Vec::new(),
            no_ping: Vec::new(),
            statuses: BTreeMap::new(),
            records: Vec::with_capacity(requested),
        }
    }

    /// Add a finished record to its category.
    pub fn record(&mut self, record: DomainRecord) {
        let list = match record.category {
            Category::Direct => &mut self.direct,
            Category::Healthy => &mut self.healthy,
            Category::Mismatched => &mut self.mismatched,
            Category::NoPing => &mut self.no_ping,
        };
        list.push(record.name.clone());

        let status = match (&record.http_status, &record.error_reason) {
            (Some(status), _) => status.clone(),
            (None, Some(reason)) => HttpStatus::unreachable(reason.clone()),
            (None, None) => HttpStatus::default(),
        };
        self.statuses.insert(record.name.clone(), status);
        self.records.push(record);
    }

    /// Number of records collected so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the aggregator into an immutable result.
    pub fn freeze(self, interrupted: bool, duration: Duration) -> RunResult {
        RunResult {
            server_ip: self.server_ip,
            direct: self.direct,
            healthy: self.healthy,
            mismatched: self.mismatched,
            no_ping: self.no_ping,
            statuses: self.statuses,
            records: self.records,
            requested: self.requested,
            interrupted,
            duration,
        }
    }
}
