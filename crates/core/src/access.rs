use std::{collections::BTreeSet, fmt};

use alloy::primitives::Address;

use crate::error::{AccessError, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Moves funds and manages operators.
    Admin,
    /// Runs cycles.
    Operator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Operator => f.write_str("operator"),
        }
    }
}

/// The admin is not an operator unless added as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    admin: Address,
    operators: BTreeSet<Address>,
}

impl AccessControl {
    pub fn new(
        admin: Address,
        operators: impl IntoIterator<Item = Address>,
    ) -> Result<Self, ConfigError> {
        if admin == Address::ZERO {
            return Err(ConfigError::MissingAddress { field: "admin" });
        }
        Ok(Self {
            admin,
            operators: operators
                .into_iter()
                .filter(|operator| *operator != Address::ZERO)
                .collect(),
        })
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn operators(&self) -> impl Iterator<Item = &Address> {
        self.operators.iter()
    }

    pub fn has_role(&self, caller: Address, role: Role) -> bool {
        match role {
            Role::Admin => caller == self.admin,
            Role::Operator => self.operators.contains(&caller),
        }
    }

    pub fn require(&self, caller: Address, role: Role) -> Result<(), AccessError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized { caller, role })
        }
    }

    /// Returns whether the operator was newly added.
    pub fn add_operator(&mut self, caller: Address, operator: Address) -> Result<bool, AccessError> {
        self.require(caller, Role::Admin)?;
        Ok(self.operators.insert(operator))
    }

    pub fn remove_operator(
        &mut self,
        caller: Address,
        operator: Address,
    ) -> Result<bool, AccessError> {
        self.require(caller, Role::Admin)?;
        Ok(self.operators.remove(&operator))
    }
}
