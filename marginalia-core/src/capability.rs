// SPDX-License-Identifier: MIT OR Apache-2.0

//! Closed set of capabilities which can be granted on domain objects.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The six capabilities a principal can hold on an object.
///
/// Capabilities are independent of each other: holding `Update` does not imply `Read`. The
/// permission engine decides how they combine across documents, corpora and owners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Permission to see an object.
    Read,

    /// Permission to create objects within an object (for example annotations on a document).
    Create,

    /// Permission to change an object.
    Update,

    /// Permission to remove an object.
    Delete,

    /// Permission to comment on an object.
    Comment,

    /// Permission to make an object publicly visible.
    Publish,
}

impl Capability {
    /// All capabilities in canonical order.
    pub const ALL: [Capability; 6] = [
        Capability::Read,
        Capability::Create,
        Capability::Update,
        Capability::Delete,
        Capability::Comment,
        Capability::Publish,
    ];

    /// Canonical lowercase token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Comment => "comment",
            Capability::Publish => "publish",
        }
    }

    /// Capabilities which change an object and are never granted on structural objects.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Capability::Create | Capability::Update | Capability::Delete
        )
    }

    fn bit(&self) -> u8 {
        match self {
            Capability::Read => 1,
            Capability::Create => 1 << 1,
            Capability::Update => 1 << 2,
            Capability::Delete => 1 << 3,
            Capability::Comment => 1 << 4,
            Capability::Publish => 1 << 5,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|capability| capability.as_str() == value)
            .ok_or_else(|| CapabilityError::Unknown(value.to_string()))
    }
}

/// A set of capabilities.
///
/// The set is a plain value: union and intersection return new sets and leave both operands
/// untouched. It serializes as a list of lowercase tokens in canonical order, absence of a token
/// means the capability is denied.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Capability>", from = "Vec<Capability>")]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// Set without any capabilities.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing every capability.
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Set containing only the given capability.
    pub fn only(capability: Capability) -> Self {
        Self(capability.bit())
    }

    /// Parse a set from lowercase tokens.
    ///
    /// Fails on the first token which does not name a capability.
    pub fn from_tokens<I, T>(tokens: I) -> Result<Self, CapabilityError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        tokens
            .into_iter()
            .map(|token| token.as_ref().parse::<Capability>())
            .collect()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn remove(&mut self, capability: Capability) {
        self.0 &= !capability.bit();
    }

    /// Set the given capability on or off.
    pub fn set(&mut self, capability: Capability, granted: bool) {
        if granted {
            self.insert(capability);
        } else {
            self.remove(capability);
        }
    }

    pub fn union(&self, other: &CapabilitySet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersection(&self, other: &CapabilitySet) -> Self {
        Self(self.0 & other.0)
    }

    /// Capabilities contained in this set but not in the other.
    pub fn difference(&self, other: &CapabilitySet) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn is_subset(&self, other: &CapabilitySet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the contained capabilities in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.contains(*capability))
    }

    /// Canonical lowercase tokens of all contained capabilities.
    pub fn tokens(&self) -> Vec<&'static str> {
        self.iter().map(|capability| capability.as_str()).collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = CapabilitySet::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(value: [Capability; N]) -> Self {
        value.into_iter().collect()
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(value: Vec<Capability>) -> Self {
        value.into_iter().collect()
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(value: CapabilitySet) -> Self {
        value.iter().collect()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tokens()).finish()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.tokens().join(", "))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("unknown capability '{0}'")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::{Capability, CapabilityError, CapabilitySet};

    #[test]
    fn set_operations() {
        let document = CapabilitySet::from([Capability::Read, Capability::Update]);
        let corpus = CapabilitySet::only(Capability::Read);

        // The most restrictive side wins for every capability independently.
        assert_eq!(
            document.intersection(&corpus),
            CapabilitySet::only(Capability::Read)
        );
        assert_eq!(document.union(&corpus), document);
        assert_eq!(
            document.difference(&corpus),
            CapabilitySet::only(Capability::Update)
        );

        assert!(corpus.is_subset(&document));
        assert!(!document.is_subset(&corpus));
        assert!(CapabilitySet::empty().is_subset(&corpus));

        let mut set = CapabilitySet::all();
        assert_eq!(set.len(), 6);
        set.remove(Capability::Publish);
        set.set(Capability::Delete, false);
        assert!(!set.contains(Capability::Publish));
        assert!(!set.contains(Capability::Delete));
        assert!(set.contains(Capability::Comment));
    }

    #[test]
    fn write_capabilities() {
        let writes: CapabilitySet = Capability::ALL
            .into_iter()
            .filter(Capability::is_write)
            .collect();
        assert_eq!(writes.tokens(), vec!["create", "update", "delete"]);
        assert!(!Capability::Comment.is_write());
    }

    #[test]
    fn canonical_tokens() {
        let set = CapabilitySet::from([Capability::Comment, Capability::Read]);
        assert_eq!(set.tokens(), vec!["read", "comment"]);
        assert_eq!(set.to_string(), "{read, comment}");

        assert_eq!(
            CapabilitySet::from_tokens(["update", "read"]).unwrap(),
            CapabilitySet::from([Capability::Read, Capability::Update])
        );

        // Capabilities outside of the enumeration can't be expressed.
        assert_eq!(
            CapabilitySet::from_tokens(["read", "admin"]),
            Err(CapabilityError::Unknown("admin".into()))
        );
        assert!("READ".parse::<Capability>().is_err());
    }

    #[test]
    fn serializes_as_token_list() {
        let set = CapabilitySet::from([Capability::Publish, Capability::Read]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["read","publish"]"#);

        let decoded: CapabilitySet = serde_json::from_str(r#"["delete","read"]"#).unwrap();
        assert_eq!(
            decoded,
            CapabilitySet::from([Capability::Read, Capability::Delete])
        );

        assert!(serde_json::from_str::<CapabilitySet>(r#"["owner"]"#).is_err());
        assert_eq!(serde_json::to_string(&CapabilitySet::empty()).unwrap(), "[]");
    }
}
