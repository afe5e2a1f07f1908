//! Revoked-token bookkeeping.
//!
//! Two maps, both bounded by token lifetime rather than by count:
//!
//! - token ids revoked individually (logout, refresh rotation), kept until
//!   the token's own expiry;
//! - per-subject revocation watermarks (password change, forced logout):
//!   any token issued before the watermark is treated as revoked.
//!
//! Entries are dropped lazily on access and by [`RevocationRegistry::sweep`];
//! neither is required for correctness, only for bounded memory. An
//! expired token fails verification on its own.

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct SubjectWatermark {
    revoked_at: i64,
    retain_until: i64,
}

/// In-process registry of revoked token ids and subject watermarks.
///
/// Backed by sharded concurrent maps: operations on different keys never
/// block each other, and revoke/is_revoked on the same key are
/// linearizable (a revoke that returns is visible to every subsequent
/// lookup).
#[derive(Debug, Default)]
pub struct RevocationRegistry {
    revoked: DashMap<String, i64>,
    subjects: DashMap<String, SubjectWatermark>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `jti` as revoked until `expires_at` (Unix seconds).
    ///
    /// Idempotent; re-revoking keeps the later expiry.
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        self.revoked
            .entry(jti.to_owned())
            .and_modify(|exp| {
                if expires_at > *exp {
                    *exp = expires_at;
                }
            })
            .or_insert(expires_at);
        info!(%jti, "token revoked");
    }

    /// O(1) lookup; lazily drops an entry whose token has expired.
    pub fn is_revoked(&self, jti: &str) -> bool {
        let now = Utc::now().timestamp();
        let live = match self.revoked.get(jti) {
            Some(entry) => *entry.value() >= now,
            None => return false,
        };
        if !live {
            self.revoked.remove_if(jti, |_, exp| *exp < now);
        }
        live
    }

    /// Treat every token of `subject` issued at or before `revoked_at` as
    /// revoked (at-or-before: issued-at has second granularity, and a
    /// same-second race must fail closed). The watermark only advances,
    /// and is retained until `retain_until` (callers pass now + max token
    /// TTL, after which no affected token can still be unexpired).
    pub fn revoke_subject(&self, subject: &str, revoked_at: i64, retain_until: i64) {
        self.subjects
            .entry(subject.to_owned())
            .and_modify(|mark| {
                if revoked_at > mark.revoked_at {
                    mark.revoked_at = revoked_at;
                }
                if retain_until > mark.retain_until {
                    mark.retain_until = retain_until;
                }
            })
            .or_insert(SubjectWatermark {
                revoked_at,
                retain_until,
            });
        warn!(%subject, "all tokens revoked for subject");
    }

    /// Whether a token issued at `iat` falls under the subject's watermark.
    pub fn is_subject_revoked(&self, subject: &str, iat: i64) -> bool {
        let now = Utc::now().timestamp();
        let verdict = match self.subjects.get(subject) {
            Some(mark) if mark.retain_until >= now => Some(iat <= mark.revoked_at),
            Some(_) => None,
            None => return false,
        };
        match verdict {
            Some(revoked) => revoked,
            None => {
                self.subjects.remove_if(subject, |_, mark| mark.retain_until < now);
                false
            }
        }
    }

    /// Purge entries whose retention has passed; returns how many.
    pub fn sweep(&self, now: i64) -> usize {
        let before = self.revoked.len() + self.subjects.len();
        self.revoked.retain(|_, exp| *exp >= now);
        self.subjects.retain(|_, mark| mark.retain_until >= now);
        // Concurrent inserts between the two counts can only shrink this.
        let purged = before.saturating_sub(self.revoked.len() + self.subjects.len());
        if purged > 0 {
            debug!(purged, "revocation sweep");
        }
        purged
    }

    /// Entries currently held (both maps); primarily for tests and gauges.
    pub fn len(&self) -> usize {
        self.revoked.len() + self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
