// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Capability, MisconfigurationError, ObjectRef, PrincipalId, ReferenceError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while evaluating or mutating permissions.
///
/// Read paths never surface `NotFound`, `InvalidReference` or `PermissionDenied`, they resolve to
/// empty results instead. Only failures of the underlying store are passed on there.
#[derive(Debug, Error)]
pub enum AuthError<E> {
    #[error("{0} does not exist")]
    NotFound(ObjectRef),

    #[error(transparent)]
    InvalidReference(#[from] ReferenceError),

    #[error("principal {principal} is not allowed to {capability} {object}")]
    PermissionDenied {
        principal: PrincipalId,
        object: ObjectRef,
        capability: Capability,
    },

    #[error("principal {principal} is not allowed to delegate capabilities on {object}")]
    DelegationDenied {
        principal: PrincipalId,
        object: ObjectRef,
    },

    #[error(transparent)]
    Misconfiguration(#[from] MisconfigurationError),

    #[error("store error: {0}")]
    Store(E),
}

impl<E> AuthError<E> {
    /// Returns `true` if read paths degrade this error to "show nothing".
    pub fn is_fail_closed(&self) -> bool {
        matches!(
            self,
            AuthError::NotFound(_)
                | AuthError::InvalidReference(_)
                | AuthError::PermissionDenied { .. }
        )
    }
}

/// Structured result of an attempted mutation.
///
/// Denied or impossible mutations are reported with `ok = false` and a message instead of an
/// error, so callers can continue with unrelated work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub ok: bool,
    pub message: String,
}

impl MutationOutcome {
    pub fn success() -> Self {
        Self {
            ok: true,
            message: "OK".into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}
