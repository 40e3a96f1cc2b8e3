//! Capability table: which panel operations an adapter supports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A gated panel operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Query,
    #[serde(alias = "get")]
    GetKey,
    #[serde(alias = "delete")]
    DeleteKey,
    #[serde(alias = "edit")]
    EditKey,
    #[serde(alias = "add")]
    AddKey,
    #[serde(alias = "flush")]
    FlushCache,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Query,
        Operation::GetKey,
        Operation::DeleteKey,
        Operation::EditKey,
        Operation::AddKey,
        Operation::FlushCache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::GetKey => "get_key",
            Self::DeleteKey => "delete_key",
            Self::EditKey => "edit_key",
            Self::AddKey => "add_key",
            Self::FlushCache => "flush_cache",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    /// Accepts the operation names and the short forms used in capability
    /// tables (`get`, `delete`, `edit`, `add`, `flush`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "get" | "get_key" => Ok(Self::GetKey),
            "delete" | "delete_key" => Ok(Self::DeleteKey),
            "edit" | "edit_key" => Ok(Self::EditKey),
            "add" | "add_key" => Ok(Self::AddKey),
            "flush" | "flush_cache" => Ok(Self::FlushCache),
            other => Err(format!("unknown panel operation '{other}'")),
        }
    }
}

/// Capability flags of one adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub query: bool,
    pub get_key: bool,
    pub delete_key: bool,
    pub edit_key: bool,
    pub add_key: bool,
    pub flush_cache: bool,
}

impl CapabilitySet {
    pub const NONE: CapabilitySet = CapabilitySet {
        query: false,
        get_key: false,
        delete_key: false,
        edit_key: false,
        add_key: false,
        flush_cache: false,
    };

    pub const ALL: CapabilitySet = CapabilitySet {
        query: true,
        get_key: true,
        delete_key: true,
        edit_key: true,
        add_key: true,
        flush_cache: true,
    };

    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Query => self.query,
            Operation::GetKey => self.get_key,
            Operation::DeleteKey => self.delete_key,
            Operation::EditKey => self.edit_key,
            Operation::AddKey => self.add_key,
            Operation::FlushCache => self.flush_cache,
        }
    }

    pub fn set(&mut self, operation: Operation, enabled: bool) {
        let flag = match operation {
            Operation::Query => &mut self.query,
            Operation::GetKey => &mut self.get_key,
            Operation::DeleteKey => &mut self.delete_key,
            Operation::EditKey => &mut self.edit_key,
            Operation::AddKey => &mut self.add_key,
            Operation::FlushCache => &mut self.flush_cache,
        };
        *flag = enabled;
    }

    pub fn with(mut self, operation: Operation, enabled: bool) -> Self {
        self.set(operation, enabled);
        self
    }

    /// Operations whose flag is set, in declaration order
    pub fn enabled(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.supports(*op))
            .collect()
    }

    /// True when every flag set here is also set in `other`
    pub fn is_subset_of(&self, other: &CapabilitySet) -> bool {
        Operation::ALL
            .into_iter()
            .all(|op| !self.supports(op) || other.supports(op))
    }

    pub fn to_map(&self) -> BTreeMap<Operation, bool> {
        Operation::ALL
            .into_iter()
            .map(|op| (op, self.supports(op)))
            .collect()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled: Vec<&str> = self.enabled().iter().map(Operation::as_str).collect();
        if enabled.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&enabled.join(","))
        }
    }
}
