//! Creation-state shadow store for Vulkan capture/replay.
//!
//! Records, for every driver object created while an application runs, the
//! creation parameters needed to reconstruct or reinterpret that object
//! later without querying the live driver. Object identity is decoupled from
//! volatile native handles by the [`id::IdentityTable`]; normalized snapshots
//! live in one [`store::CreationInfo`] per loaded capture.
//!
//! The interception layer observes a creation call, resolves or assigns
//! identities for every handle involved, and drives the matching `init_*`;
//! replay, serialization, and inspection read back by identity. Since the
//! same `init_*` entry points accept deserialized parameters, the store is
//! agnostic to whether its input came from a live call or a loaded capture.

pub mod error;
pub mod id;
pub mod layout;
pub mod logging;
pub mod params;
pub mod reflect;
pub mod store;
pub mod vocab;

pub use error::ShadowError;
pub use id::{IdentityTable, ResourceId, ResourceType};
pub use layout::{DescSetLayout, DescriptorElement};
pub use store::CreationInfo;
