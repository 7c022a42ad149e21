// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Capability, CapabilitySet, Principal};

/// Corpus-level relaxation of the comment capability.
///
/// When a corpus allows comments, anyone signed in who can read an object in it may also comment
/// on it. The policy only ever adds `Comment` and never without `Read`. Anonymous principals are
/// limited to reading and never comment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommentPolicy {
    allow_comments: bool,
}

impl CommentPolicy {
    pub fn new(allow_comments: bool) -> Self {
        Self { allow_comments }
    }

    pub fn apply(&self, principal: &Principal, capabilities: CapabilitySet) -> CapabilitySet {
        let mut capabilities = capabilities;
        if self.allow_comments && !principal.is_anonymous && capabilities.contains(Capability::Read)
        {
            capabilities.insert(Capability::Comment);
        }
        capabilities
    }
}
