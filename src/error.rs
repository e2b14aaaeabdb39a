use crate::id::{ResourceId, ResourceType};

/// Failures surfaced by the shadow store and identity table.
///
/// `Malformed` and `DuplicateIdentity` are reported at `init` time and are
/// fatal only to the offending object; loading may continue with a gap that
/// `NotFound` will surface downstream. `NotFound` is never defaulted away --
/// substituting default state for a missing snapshot would replay plausibly
/// but wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShadowError {
    #[error("no live {ty:?} handle {raw:#x} at this point in the capture")]
    UnknownHandle { ty: ResourceType, raw: u64 },

    #[error("no {ty:?} snapshot for {id:?}")]
    NotFound { ty: ResourceType, id: ResourceId },

    #[error("malformed {ty:?} creation parameters for {id:?}: {reason}")]
    Malformed {
        ty: ResourceType,
        id: ResourceId,
        reason: String,
    },

    #[error("conflicting re-creation of {ty:?} {id:?}")]
    DuplicateIdentity { ty: ResourceType, id: ResourceId },
}

impl ShadowError {
    pub(crate) fn malformed(
        ty: ResourceType,
        id: ResourceId,
        reason: impl Into<String>,
    ) -> Self {
        ShadowError::Malformed {
            ty,
            id,
            reason: reason.into(),
        }
    }
}
