use chrono::{Datelike, Timelike};
use serde::Deserialize;

use crate::{DomainMatcher, RuleError, Schedule};

/// A single block as it appears in the configuration file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockConfig {
    /// Blocked together with their `www.` variant
    pub domains: Vec<String>,
    /// Blocked together with all of their subdomains
    pub wildcard_domains: Vec<String>,
    /// Crontab-like schedule, one `<minute> <hour> <day> <month> <weekday> <on|off>` rule per line
    pub schedule: String,
}

/// A parsed block: a schedule and the domains it governs.
#[derive(Debug, Clone)]
pub struct Block {
    schedule: Schedule,
    domains: DomainMatcher,
}

impl Block {
    pub fn from_config(config: &BlockConfig) -> Result<Self, crate::ScheduleError> {
        Ok(Block {
            schedule: config.schedule.parse()?,
            domains: DomainMatcher::new(&config.domains, &config.wildcard_domains),
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn blocks<T: Datelike + Timelike>(&self, qname: &str, now: &T) -> bool {
        self.schedule.is_active(now) && self.domains.matches(qname)
    }
}

/// All configured blocks, built once at startup and never mutated afterwards.
///
/// A query is blocked if *any* block blocks it, so the order of the blocks never changes the outcome.
/// Blocks are kept sorted by name only to make [`BlockRegistry::blocking_rule`] reproducible.
#[derive(Debug, Default, Clone)]
pub struct BlockRegistry {
    blocks: Vec<(String, Block)>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_config<I, S>(blocks: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (S, BlockConfig)>,
        S: Into<String>,
    {
        let mut registry = BlockRegistry::new();
        for (name, config) in blocks {
            let name = name.into();
            let block = Block::from_config(&config).map_err(|source| RuleError::Schedule {
                name: name.clone(),
                source,
            })?;
            if block.domains.is_empty() {
                tracing::warn!(block = name.as_str(), "Block has no domains and never matches");
            }
            tracing::debug!(
                block = name.as_str(),
                schedule_lines = block.schedule().len(),
                domains = config.domains.len(),
                wildcard_domains = config.wildcard_domains.len(),
                "Parsed block"
            );
            registry.insert(name, block);
        }
        Ok(registry)
    }

    /// Adds a block, replacing any previous block with the same name.
    pub fn insert(&mut self, name: String, block: Block) {
        match self.blocks.binary_search_by(|(existing, _)| existing.as_str().cmp(&name)) {
            Ok(idx) => self.blocks[idx].1 = block,
            Err(idx) => self.blocks.insert(idx, (name, block)),
        }
    }

    pub fn is_blocked<T: Datelike + Timelike>(&self, qname: &str, now: &T) -> bool {
        self.blocking_rule(qname, now).is_some()
    }

    /// Name of the first block (by name) that blocks `qname` at `now`.
    pub fn blocking_rule<T: Datelike + Timelike>(&self, qname: &str, now: &T) -> Option<&str> {
        self.blocks
            .iter()
            .find(|(_, block)| block.blocks(qname, now))
            .map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
