//! Credit ledger contract and the gate the orchestrator consults around every
//! provider call.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Subscription tier of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    /// Whether the tier may create and regenerate segments
    pub fn allows_segments(&self) -> bool {
        matches!(self, Tier::Pro)
    }

    /// Whether the tier may use the named provider
    pub fn allows_provider(&self, provider: &str) -> bool {
        match self {
            Tier::Free => provider == "catalog",
            Tier::Pro => true,
        }
    }

    /// Credits restored at each reset
    pub fn monthly_credits(&self) -> u32 {
        match self {
            Tier::Free => 5,
            Tier::Pro => 100,
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(Error::Config(format!("unknown tier '{other}'"))),
        }
    }
}

/// Snapshot of an identity's ledger entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub credits_remaining: u32,
    pub tier: Tier,
    pub reset_at: DateTime<Utc>,
}

/// Backing store for credits. Implementations must make `consume` a
/// conditional decrement: it returns `false` instead of going below zero.
pub trait CreditLedger: Send + Sync {
    fn check(&self, identity: &str) -> CheckResult;
    fn consume(&self, identity: &str) -> bool;
}

struct LedgerEntry {
    tier: Tier,
    credits: AtomicU32,
    reset_at: Mutex<DateTime<Utc>>,
}

/// Process-local ledger, mostly for the CLI and tests
pub struct InMemoryLedger {
    entries: Mutex<HashMap<String, Arc<LedgerEntry>>>,
    default_tier: Tier,
}

impl InMemoryLedger {
    pub fn new(default_tier: Tier) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_tier,
        }
    }

    /// Register (or overwrite) an identity with an explicit balance
    pub fn set_balance(&self, identity: &str, tier: Tier, credits: u32) {
        let entry = LedgerEntry {
            tier,
            credits: AtomicU32::new(credits),
            reset_at: Mutex::new(Utc::now() + Duration::days(30)),
        };
        self.entries
            .lock()
            .insert(identity.to_string(), Arc::new(entry));
    }

    /// Restore the tier allowance for every entry whose reset time has passed
    pub fn refill_due(&self, now: DateTime<Utc>) -> usize {
        let entries = self.entries.lock();
        let mut refilled = 0;
        for (identity, entry) in entries.iter() {
            let mut reset_at = entry.reset_at.lock();
            if now >= *reset_at {
                entry
                    .credits
                    .store(entry.tier.monthly_credits(), Ordering::SeqCst);
                *reset_at = now + Duration::days(30);
                refilled += 1;
                info!(identity = %identity, "Credits refilled");
            }
        }
        refilled
    }

    fn entry(&self, identity: &str) -> Arc<LedgerEntry> {
        let mut entries = self.entries.lock();
        entries
            .entry(identity.to_string())
            .or_insert_with(|| {
                Arc::new(LedgerEntry {
                    tier: self.default_tier,
                    credits: AtomicU32::new(self.default_tier.monthly_credits()),
                    reset_at: Mutex::new(Utc::now() + Duration::days(30)),
                })
            })
            .clone()
    }
}

impl CreditLedger for InMemoryLedger {
    fn check(&self, identity: &str) -> CheckResult {
        let entry = self.entry(identity);
        let credits_remaining = entry.credits.load(Ordering::SeqCst);
        let reset_at = *entry.reset_at.lock();
        CheckResult {
            allowed: credits_remaining > 0,
            reason: (credits_remaining == 0)
                .then(|| format!("no credits left until {}", reset_at.to_rfc3339())),
            credits_remaining,
            tier: entry.tier,
            reset_at,
        }
    }

    fn consume(&self, identity: &str) -> bool {
        let entry = self.entry(identity);
        entry
            .credits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |credits| {
                credits.checked_sub(1)
            })
            .is_ok()
    }
}

/// What the caller is about to do, for entitlement checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    RegenerateNode,
    RegenerateSegment,
    AddSegment,
}

impl Operation {
    fn needs_segments(&self) -> bool {
        matches!(self, Operation::RegenerateSegment | Operation::AddSegment)
    }

    fn spends_credit(&self) -> bool {
        !matches!(self, Operation::AddSegment)
    }
}

/// Pre- and post-condition checks around provider calls
pub struct CreditGate<L: CreditLedger> {
    ledger: L,
}

impl<L: CreditLedger> CreditGate<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn check(&self, identity: &str) -> CheckResult {
        self.ledger.check(identity)
    }

    /// Authorize `operation` for `identity` using `provider`
    pub fn authorize(&self, identity: &str, operation: Operation, provider: &str) -> Result<CheckResult> {
        let check = self.ledger.check(identity);

        if operation.needs_segments() && !check.tier.allows_segments() {
            return Err(Error::SegmentedSetsDisabled);
        }
        if !operation.spends_credit() {
            return Ok(check);
        }
        if !check.tier.allows_provider(provider) {
            return Err(Error::ProviderNotAllowed(provider.to_string()));
        }
        if !check.allowed {
            let reason = check
                .reason
                .clone()
                .unwrap_or_else(|| "credit check denied".to_string());
            debug!(identity, ?operation, %reason, "Credit check denied");
            return Err(Error::InsufficientCredits(reason));
        }

        debug!(identity, ?operation, credits = check.credits_remaining, "Credit check passed");
        Ok(check)
    }

    /// Charge one credit after a successful provider call
    pub fn settle(&self, identity: &str) -> bool {
        let consumed = self.ledger.consume(identity);
        if !consumed {
            warn!(identity, "Credit consumption lost a race, balance already zero");
        }
        consumed
    }
}
