//! Account roles and the set of roles a new user has picked.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A capability an account can hold. Accounts may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Merchant,
    DeliveryAgent,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Merchant, Role::DeliveryAgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Merchant => "merchant",
            Self::DeliveryAgent => "delivery_agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "customer" => Ok(Self::Customer),
            "merchant" | "vendor" => Ok(Self::Merchant),
            "delivery_agent" | "delivery" | "rider" => Ok(Self::DeliveryAgent),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// The roles selected for this registration.
///
/// Ordered so serialization and payload composition are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(role: Role) -> Self {
        Self(BTreeSet::from([role]))
    }

    /// Add the role if absent, remove it if present. Returns whether the
    /// role is selected afterwards.
    pub fn toggle(&mut self, role: Role) -> bool {
        if self.0.remove(&role) {
            false
        } else {
            self.0.insert(role);
            true
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True only for the exact set {customer}.
    pub fn is_customer_only(&self) -> bool {
        self.0.len() == 1 && self.contains(Role::Customer)
    }

    /// Whether any selected role needs the shared business-verification step.
    pub fn needs_business_details(&self) -> bool {
        !self.is_empty() && !self.is_customer_only()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
