//! Normalized vocabulary for captured enum and flag words.
//!
//! Most fixed-function enums are stored as the raw values the interception
//! layer captured; the types here exist where the store itself needs to
//! reason about a value (dynamic descriptor kinds, stage slots, load-op
//! rewriting) rather than just carry it.

use serde::{Deserialize, Serialize};

// ── Descriptor types ─────────────────────────────────────────

/// VkDescriptorType, normalized. Raw values match the Vulkan numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    InputAttachment,
}

impl DescriptorType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => DescriptorType::Sampler,
            1 => DescriptorType::CombinedImageSampler,
            2 => DescriptorType::SampledImage,
            3 => DescriptorType::StorageImage,
            4 => DescriptorType::UniformTexelBuffer,
            5 => DescriptorType::StorageTexelBuffer,
            6 => DescriptorType::UniformBuffer,
            7 => DescriptorType::StorageBuffer,
            8 => DescriptorType::UniformBufferDynamic,
            9 => DescriptorType::StorageBufferDynamic,
            10 => DescriptorType::InputAttachment,
            _ => return None,
        })
    }

    /// Whether descriptors of this type take a dynamic offset at bind time.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            DescriptorType::UniformBufferDynamic | DescriptorType::StorageBufferDynamic
        )
    }

    /// Whether descriptors of this type can carry an immutable sampler.
    pub fn has_sampler(&self) -> bool {
        matches!(
            self,
            DescriptorType::Sampler | DescriptorType::CombinedImageSampler
        )
    }
}

// ── Shader stages ────────────────────────────────────────────

bitflags::bitflags! {
    /// VkShaderStageFlags visibility mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX                  = 0x01;
        const TESSELLATION_CONTROL    = 0x02;
        const TESSELLATION_EVALUATION = 0x04;
        const GEOMETRY                = 0x08;
        const FRAGMENT                = 0x10;
        const COMPUTE                 = 0x20;
    }
}

impl ShaderStageFlags {
    pub const ALL_GRAPHICS: ShaderStageFlags = ShaderStageFlags::from_bits_truncate(0x1f);
}

/// One pipeline stage slot. "Stage absent" is an explicit state: pipelines
/// keep a map from stage kind to identity rather than a fixed-length array
/// indexed by convention.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum StageKind {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
    Compute,
}

impl StageKind {
    /// From a single VkShaderStageFlagBits value.
    pub fn from_flag_bit(raw: u32) -> Option<Self> {
        Some(match raw {
            0x01 => StageKind::Vertex,
            0x02 => StageKind::TessControl,
            0x04 => StageKind::TessEval,
            0x08 => StageKind::Geometry,
            0x10 => StageKind::Fragment,
            0x20 => StageKind::Compute,
            _ => return None,
        })
    }

    /// From a SPIR-V OpEntryPoint execution model.
    pub fn from_execution_model(model: u32) -> Option<Self> {
        Some(match model {
            0 => StageKind::Vertex,
            1 => StageKind::TessControl,
            2 => StageKind::TessEval,
            3 => StageKind::Geometry,
            4 => StageKind::Fragment,
            5 => StageKind::Compute,
            _ => return None,
        })
    }

    pub fn flag(&self) -> ShaderStageFlags {
        match self {
            StageKind::Vertex => ShaderStageFlags::VERTEX,
            StageKind::TessControl => ShaderStageFlags::TESSELLATION_CONTROL,
            StageKind::TessEval => ShaderStageFlags::TESSELLATION_EVALUATION,
            StageKind::Geometry => ShaderStageFlags::GEOMETRY,
            StageKind::Fragment => ShaderStageFlags::FRAGMENT,
            StageKind::Compute => ShaderStageFlags::COMPUTE,
        }
    }
}

// ── Dynamic state ────────────────────────────────────────────

bitflags::bitflags! {
    /// Which pieces of fixed-function state the pipeline left dynamic.
    /// One bit per VkDynamicState value the store understands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DynamicStateFlags: u32 {
        const VIEWPORT             = 1 << 0;
        const SCISSOR              = 1 << 1;
        const LINE_WIDTH           = 1 << 2;
        const DEPTH_BIAS           = 1 << 3;
        const BLEND_CONSTANTS      = 1 << 4;
        const DEPTH_BOUNDS         = 1 << 5;
        const STENCIL_COMPARE_MASK = 1 << 6;
        const STENCIL_WRITE_MASK   = 1 << 7;
        const STENCIL_REFERENCE    = 1 << 8;
    }
}

impl DynamicStateFlags {
    /// From a raw VkDynamicState value (0..=8).
    pub fn from_raw_state(raw: i32) -> Option<Self> {
        if (0..=8).contains(&raw) {
            DynamicStateFlags::from_bits(1 << raw as u32)
        } else {
            None
        }
    }
}

// ── Attachment ops ───────────────────────────────────────────

/// VkAttachmentLoadOp, needed for load-variant synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentLoadOp {
    Load,
    Clear,
    DontCare,
}

impl AttachmentLoadOp {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => AttachmentLoadOp::Load,
            1 => AttachmentLoadOp::Clear,
            2 => AttachmentLoadOp::DontCare,
            _ => return None,
        })
    }

    pub fn as_raw(&self) -> i32 {
        match self {
            AttachmentLoadOp::Load => 0,
            AttachmentLoadOp::Clear => 1,
            AttachmentLoadOp::DontCare => 2,
        }
    }
}
