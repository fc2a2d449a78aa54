//! Hash-chained in-memory ledger.

use tracing::debug;

use super::{AppendOutcome, Ledger, LedgerEntry, LedgerError};
use crate::crypto::{HashHex, sha256_hex};

/// An in-memory [`Ledger`] whose heads form a SHA-256 chain.
///
/// Each new head is `SHA-256(previous head || receipt hash)`. Appends must
/// name the current head in [`LedgerEntry::ledger_head_before`], so an entry
/// prepared against a stale head is rejected instead of forking the chain.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    genesis: String,
    head: String,
    entries: Vec<LedgerEntry>,
    heads: Vec<String>,
}

impl MemoryLedger {
    /// Creates an empty ledger positioned at `genesis`.
    #[must_use]
    pub fn new(genesis: impl Into<String>) -> Self {
        let genesis = genesis.into();
        Self {
            head: genesis.clone(),
            genesis,
            entries: Vec::new(),
            heads: Vec::new(),
        }
    }

    /// The current head.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recomputes every head from the genesis head.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::HashChainBroken`] at the first entry whose
    /// recorded predecessor or resulting head does not match.
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        let mut head = self.genesis.clone();
        for (index, (entry, stored)) in self.entries.iter().zip(&self.heads).enumerate() {
            if entry.ledger_head_before != head {
                return Err(LedgerError::HashChainBroken {
                    index,
                    details: format!(
                        "entry expects head '{}', chain is at '{head}'",
                        entry.ledger_head_before
                    ),
                });
            }
            head = next_head(&head, &entry.receipt_hash);
            if &head != stored {
                return Err(LedgerError::HashChainBroken {
                    index,
                    details: format!("recomputed head '{head}' differs from stored '{stored}'"),
                });
            }
        }
        Ok(())
    }
}

// Receipt hashes are fixed-width, so the concatenation is unambiguous.
fn next_head(previous: &str, receipt_hash: &HashHex) -> String {
    sha256_hex(&format!("{previous}{receipt_hash}")).as_str().to_string()
}

impl Ledger for MemoryLedger {
    fn append(&mut self, entry: LedgerEntry) -> Result<AppendOutcome, LedgerError> {
        if entry.ledger_head_before != self.head {
            return Err(LedgerError::HeadMismatch {
                expected: self.head.clone(),
                actual: entry.ledger_head_before,
            });
        }
        let new_head = next_head(&self.head, &entry.receipt_hash);
        debug!(
            seq = self.entries.len(),
            receipt_hash = %entry.receipt_hash,
            new_head = %new_head,
            "ledger entry appended"
        );
        self.entries.push(entry);
        self.heads.push(new_head.clone());
        self.head.clone_from(&new_head);
        Ok(AppendOutcome { new_head })
    }
}
