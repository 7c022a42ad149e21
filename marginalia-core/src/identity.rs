// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ObjectId> for u64 {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

impl FromStr for ObjectId {
    type Err = ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(value.parse()?))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric identifier of a principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalId(u64);

impl PrincipalId {
    /// Identifier carried by anonymous principals. No object is ever created by it and no grant
    /// is ever written for it.
    pub const ANONYMOUS: PrincipalId = PrincipalId(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for PrincipalId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for PrincipalId {
    type Err = ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(value.parse()?))
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity evaluated by the permission engine.
///
/// A principal is immutable for the duration of one evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub is_superuser: bool,
    pub is_anonymous: bool,
}

impl Principal {
    /// Regular, authenticated user.
    pub fn user(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            is_superuser: false,
            is_anonymous: false,
        }
    }

    /// Authenticated user bypassing all permission checks.
    pub fn superuser(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            is_superuser: true,
            is_anonymous: false,
        }
    }

    /// Unauthenticated visitor.
    pub fn anonymous() -> Self {
        Self {
            id: PrincipalId::ANONYMOUS,
            is_superuser: false,
            is_anonymous: true,
        }
    }

    /// Returns `true` if this principal is the given creator.
    ///
    /// Anonymous principals never own anything.
    pub fn is(&self, creator: &PrincipalId) -> bool {
        !self.is_anonymous && &self.id == creator
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous {
            write!(f, "anonymous")
        } else if self.is_superuser {
            write!(f, "superuser:{}", self.id)
        } else {
            write!(f, "user:{}", self.id)
        }
    }
}
