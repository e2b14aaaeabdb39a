//! Stable identity assignment for captured Vulkan objects.
//!
//! Native handles are recycled by drivers; identities are not. The table maps
//! each currently-live (type, handle) pair to the [`ResourceId`] assigned when
//! the handle was first observed, and retires the mapping on destruction so a
//! reused handle value resolves to a fresh identity.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::ShadowError;

/// Capture-lifetime-unique identity for one logical driver object.
/// Opaque to callers -- only the identity table assigns these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Raw value for diagnostics only; never a native handle bit pattern.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Category tag for captured objects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ResourceType {
    Pipeline,
    PipelineLayout,
    RenderPass,
    Framebuffer,
    Buffer,
    BufferView,
    Image,
    ImageView,
    Sampler,
    ShaderModule,
    Shader,
    DescSetLayout,
    Swapchain,
    DebugName,
}

/// Maps live native handles to stable identities.
///
/// Keys are (type, raw handle) pairs: non-dispatchable Vulkan handle values
/// may collide across object types. A handle destroyed and later reallocated
/// by the driver gets a distinct identity on re-`assign`; the retired
/// identity stays valid for every snapshot that recorded it.
pub struct IdentityTable {
    live: DashMap<(ResourceType, u64), ResourceId>,
    // Start from 1 to keep 0 free for "never assigned" in dumps.
    next: AtomicU64,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self {
            live: DashMap::new(),
            next: AtomicU64::new(1),
        }
    }

    /// Assign a fresh, never-reused identity to a newly observed handle.
    /// Replaces any stale mapping left by an unobserved destruction.
    pub fn assign(&self, ty: ResourceType, raw: u64) -> ResourceId {
        let id = ResourceId(self.next.fetch_add(1, Ordering::Relaxed));
        if let Some(old) = self.live.insert((ty, raw), id) {
            tracing::debug!(?ty, raw, old = old.raw(), new = id.raw(), "handle reused");
        }
        id
    }

    /// Resolve a currently-live handle to its identity.
    pub fn lookup(&self, ty: ResourceType, raw: u64) -> Result<ResourceId, ShadowError> {
        self.live
            .get(&(ty, raw))
            .map(|v| *v)
            .ok_or(ShadowError::UnknownHandle { ty, raw })
    }

    /// Retire a handle mapping on destruction. The identity itself stays
    /// valid for snapshots that reference it.
    pub fn release(&self, ty: ResourceType, raw: u64) -> Option<ResourceId> {
        self.live.remove(&(ty, raw)).map(|(_, id)| id)
    }

    /// Number of currently-live handle mappings.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl Default for IdentityTable {
    fn default() -> Self {
        Self::new()
    }
}
