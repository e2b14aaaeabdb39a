//! Per-category creation-state snapshot maps.
//!
//! One [`CreationInfo`] instance owns every snapshot recorded for a loaded
//! capture; dropping the store releases everything. Writes for distinct
//! identities proceed concurrently and a write and read of the same identity
//! serialize on the map entry, so no reader ever observes a snapshot
//! mid-replacement. Cross-category ordering (a pipeline's layout being
//! recorded before the pipeline) is the interception layer's obligation:
//! references are recorded verbatim and a missing dependency only surfaces
//! as `NotFound` at query time.

use std::collections::BTreeMap;

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ShadowError;
use crate::id::{ResourceId, ResourceType};
use crate::layout::{DescSetLayout, DescriptorElement};
use crate::params::{
    BufferCreateParams, BufferViewCreateParams, ColorBlendAttachment,
    ComputePipelineCreateParams, DescriptorSetLayoutCreateParams, FramebufferCreateParams,
    GraphicsPipelineCreateParams, ImageCreateParams, ImageViewCreateParams,
    PipelineLayoutCreateParams, RenderPassCreateParams, ShaderCreateParams,
    ShaderModuleCreateParams, StencilOpState, SwapchainCreateParams, Rect2D, Viewport,
};
use crate::reflect::{BindpointMapping, ShaderReflection};
use crate::vocab::{AttachmentLoadOp, DynamicStateFlags, ShaderStageFlags, StageKind};

/// Read guard over one stored snapshot. Valid only while the store lives;
/// holding it blocks replacement of that identity's snapshot.
pub type Snapshot<'a, T> = Ref<'a, ResourceId, T>;

// VkImageCreateInfo flag bit for cube-compatible images.
const IMAGE_CREATE_CUBE_COMPATIBLE: u32 = 0x10;
const ATTACHMENT_UNUSED: u32 = u32::MAX;

// ── Snapshot types ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexBinding {
    pub vbuffer_binding: u32,
    pub byte_stride: u32,
    pub per_instance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: i32,
    pub byte_offset: u32,
}

/// Graphics or compute pipeline creation state. Compute pipelines carry no
/// render pass and leave the fixed-function state at defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub flags: u32,
    pub layout: ResourceId,
    pub render_pass: Option<ResourceId>,
    pub subpass: u32,

    /// One slot per stage kind; absent stages are simply not present.
    pub shaders: BTreeMap<StageKind, ResourceId>,

    pub vertex_bindings: Vec<VertexBinding>,
    pub vertex_attrs: Vec<VertexAttribute>,

    pub topology: i32,
    pub primitive_restart_enable: bool,
    pub patch_control_points: u32,

    pub viewport_count: u32,
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<Rect2D>,

    pub depth_clamp_enable: bool,
    pub rasterizer_discard_enable: bool,
    pub polygon_mode: i32,
    pub cull_mode: u32,
    pub front_face: i32,
    pub depth_bias_enable: bool,
    pub depth_bias: f32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
    pub line_width: f32,

    pub raster_samples: u32,
    pub sample_shading_enable: bool,
    pub min_sample_shading: f32,
    pub sample_mask: u32,
    pub alpha_to_coverage_enable: bool,
    pub alpha_to_one_enable: bool,

    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: i32,
    pub depth_bounds_enable: bool,
    pub stencil_test_enable: bool,
    pub front: StencilOpState,
    pub back: StencilOpState,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,

    pub logic_op_enable: bool,
    pub logic_op: i32,
    pub blend_constants: [f32; 4],
    pub attachments: Vec<ColorBlendAttachment>,

    pub dynamic_states: DynamicStateFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConstantRange {
    pub stage_flags: ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineLayout {
    /// Descriptor-set layout identities, in set order.
    pub desc_set_layouts: Vec<ResourceId>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPass {
    /// Attachment indices used as subpass-0 inputs.
    pub input_attachments: Vec<u32>,
    /// Attachment indices used as subpass-0 color targets.
    pub color_attachments: Vec<u32>,
    pub depthstencil_attachment: Option<u32>,
    /// Total attachment descriptions in the pass.
    pub attach_count: u32,
    /// Load-preserving variant of the pass: every load op rewritten to LOAD
    /// and initial layouts pinned to the final layouts, for non-destructive
    /// re-entry during replay.
    pub load_pass: RenderPassCreateParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framebuffer {
    /// Image view identities, in attachment order.
    pub attachments: Vec<ResourceId>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffer {
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferView {
    pub buffer: ResourceId,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub image_type: i32,
    pub format: i32,
    pub extent: [u32; 3],
    pub array_layers: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub cube: bool,
    pub creation_flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageView {
    pub image: ResourceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderModule {
    pub spirv: Vec<u32>,
    pub refl_template: ShaderReflection,
    pub mapping: BindpointMapping,
}

/// One pipeline stage's view of a shader module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shader {
    pub module: ResourceId,
    pub stage: StageKind,
    pub entry_point: String,
    pub refl: ShaderReflection,
    pub mapping: BindpointMapping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swapchain {
    pub format: i32,
    pub color_space: i32,
    pub extent: [u32; 2],
    pub image_count: u32,
    pub present_mode: i32,
}

// ── The store ────────────────────────────────────────────────

/// All per-category snapshot maps for one loaded capture.
#[derive(Default)]
pub struct CreationInfo {
    pipelines: DashMap<ResourceId, Pipeline>,
    pipeline_layouts: DashMap<ResourceId, PipelineLayout>,
    render_passes: DashMap<ResourceId, RenderPass>,
    framebuffers: DashMap<ResourceId, Framebuffer>,
    buffers: DashMap<ResourceId, Buffer>,
    buffer_views: DashMap<ResourceId, BufferView>,
    images: DashMap<ResourceId, Image>,
    image_views: DashMap<ResourceId, ImageView>,
    shader_modules: DashMap<ResourceId, ShaderModule>,
    shaders: DashMap<ResourceId, Shader>,
    desc_set_layouts: DashMap<ResourceId, DescSetLayout>,
    swapchains: DashMap<ResourceId, Swapchain>,
    names: DashMap<ResourceId, String>,
}

macro_rules! getter {
    ($fn_name:ident, $map:ident, $ty:ident, $snap:ty) => {
        pub fn $fn_name(&self, id: ResourceId) -> Result<Snapshot<'_, $snap>, ShadowError> {
            self.$map
                .get(&id)
                .ok_or(ShadowError::NotFound {
                    ty: ResourceType::$ty,
                    id,
                })
        }
    };
}

impl CreationInfo {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Init: pipelines ─────────────────────────────────────

    pub fn init_graphics_pipeline(
        &self,
        id: ResourceId,
        params: &GraphicsPipelineCreateParams,
    ) -> Result<(), ShadowError> {
        let shaders = stage_slots(id, params.stages.iter().map(|s| (s.stage, s.shader)))?;

        let mut vertex_bindings = Vec::with_capacity(params.vertex_input_state.bindings.len());
        for b in &params.vertex_input_state.bindings {
            let per_instance = match b.input_rate {
                0 => false,
                1 => true,
                other => {
                    return Err(ShadowError::malformed(
                        ResourceType::Pipeline,
                        id,
                        format!("unknown vertex input rate {other}"),
                    ))
                }
            };
            vertex_bindings.push(VertexBinding {
                vbuffer_binding: b.binding,
                byte_stride: b.stride,
                per_instance,
            });
        }

        let vertex_attrs = params
            .vertex_input_state
            .attributes
            .iter()
            .map(|a| VertexAttribute {
                location: a.location,
                binding: a.binding,
                format: a.format,
                byte_offset: a.offset,
            })
            .collect();

        let mut dynamic_states = DynamicStateFlags::empty();
        if let Some(raw_states) = &params.dynamic_states {
            for &raw in raw_states {
                dynamic_states |= DynamicStateFlags::from_raw_state(raw).ok_or_else(|| {
                    ShadowError::malformed(
                        ResourceType::Pipeline,
                        id,
                        format!("unknown dynamic state {raw}"),
                    )
                })?;
            }
        }

        let mut pipe = Pipeline::base(params.flags, params.layout, shaders);
        pipe.render_pass = Some(params.render_pass);
        pipe.subpass = params.subpass;
        pipe.vertex_bindings = vertex_bindings;
        pipe.vertex_attrs = vertex_attrs;
        pipe.topology = params.input_assembly_state.topology;
        pipe.primitive_restart_enable = params.input_assembly_state.primitive_restart_enable;
        pipe.patch_control_points = params.patch_control_points.unwrap_or(0);
        pipe.dynamic_states = dynamic_states;

        if let Some(vp) = &params.viewport_state {
            pipe.viewport_count = vp.viewports.len() as u32;
            pipe.viewports = vp.viewports.clone();
            pipe.scissors = vp.scissors.clone();
        }

        let rs = &params.rasterization_state;
        pipe.depth_clamp_enable = rs.depth_clamp_enable;
        pipe.rasterizer_discard_enable = rs.rasterizer_discard_enable;
        pipe.polygon_mode = rs.polygon_mode;
        pipe.cull_mode = rs.cull_mode;
        pipe.front_face = rs.front_face;
        pipe.depth_bias_enable = rs.depth_bias_enable;
        pipe.depth_bias = rs.depth_bias_constant_factor;
        pipe.depth_bias_clamp = rs.depth_bias_clamp;
        pipe.slope_scaled_depth_bias = rs.depth_bias_slope_factor;
        pipe.line_width = rs.line_width;

        if let Some(ms) = &params.multisample_state {
            pipe.raster_samples = ms.rasterization_samples;
            pipe.sample_shading_enable = ms.sample_shading_enable;
            pipe.min_sample_shading = ms.min_sample_shading;
            pipe.sample_mask = ms.sample_mask;
            pipe.alpha_to_coverage_enable = ms.alpha_to_coverage_enable;
            pipe.alpha_to_one_enable = ms.alpha_to_one_enable;
        }

        if let Some(ds) = &params.depth_stencil_state {
            pipe.depth_test_enable = ds.depth_test_enable;
            pipe.depth_write_enable = ds.depth_write_enable;
            pipe.depth_compare_op = ds.depth_compare_op;
            pipe.depth_bounds_enable = ds.depth_bounds_test_enable;
            pipe.stencil_test_enable = ds.stencil_test_enable;
            pipe.front = ds.front;
            pipe.back = ds.back;
            pipe.min_depth_bounds = ds.min_depth_bounds;
            pipe.max_depth_bounds = ds.max_depth_bounds;
        }

        if let Some(cb) = &params.color_blend_state {
            pipe.logic_op_enable = cb.logic_op_enable;
            pipe.logic_op = cb.logic_op;
            pipe.blend_constants = cb.blend_constants;
            pipe.attachments = cb.attachments.clone();
        }

        debug!(id = id.raw(), stages = pipe.shaders.len(), "recorded graphics pipeline");
        self.replace(ResourceType::Pipeline, &self.pipelines, id, pipe);
        Ok(())
    }

    pub fn init_compute_pipeline(
        &self,
        id: ResourceId,
        params: &ComputePipelineCreateParams,
    ) -> Result<(), ShadowError> {
        let shaders = stage_slots(
            id,
            std::iter::once((params.stage.stage, params.stage.shader)),
        )?;
        if !shaders.contains_key(&StageKind::Compute) {
            return Err(ShadowError::malformed(
                ResourceType::Pipeline,
                id,
                "compute pipeline with a non-compute stage",
            ));
        }

        let pipe = Pipeline::base(params.flags, params.layout, shaders);
        debug!(id = id.raw(), "recorded compute pipeline");
        self.replace(ResourceType::Pipeline, &self.pipelines, id, pipe);
        Ok(())
    }

    // ── Init: layouts and render passes ─────────────────────

    pub fn init_pipeline_layout(
        &self,
        id: ResourceId,
        params: &PipelineLayoutCreateParams,
    ) -> Result<(), ShadowError> {
        let snap = PipelineLayout {
            desc_set_layouts: params.set_layouts.clone(),
            push_constant_ranges: params
                .push_constant_ranges
                .iter()
                .map(|r| PushConstantRange {
                    stage_flags: ShaderStageFlags::from_bits_truncate(r.stage_flags),
                    offset: r.offset,
                    size: r.size,
                })
                .collect(),
        };
        self.replace(ResourceType::PipelineLayout, &self.pipeline_layouts, id, snap);
        Ok(())
    }

    pub fn init_desc_set_layout(
        &self,
        id: ResourceId,
        params: &DescriptorSetLayoutCreateParams,
    ) -> Result<(), ShadowError> {
        let snap = DescSetLayout::init(id, params)?;
        self.replace(ResourceType::DescSetLayout, &self.desc_set_layouts, id, snap);
        Ok(())
    }

    /// Partition the first subpass's attachment references and synthesize
    /// the load-preserving variant of the pass.
    pub fn init_render_pass(
        &self,
        id: ResourceId,
        params: &RenderPassCreateParams,
    ) -> Result<(), ShadowError> {
        let subpass = params.subpasses.first().ok_or_else(|| {
            ShadowError::malformed(ResourceType::RenderPass, id, "render pass with no subpasses")
        })?;

        let attach_count = params.attachments.len() as u32;
        let check = |attachment: u32| -> Result<u32, ShadowError> {
            if attachment != ATTACHMENT_UNUSED && attachment >= attach_count {
                return Err(ShadowError::malformed(
                    ResourceType::RenderPass,
                    id,
                    format!("attachment reference {attachment} out of range ({attach_count})"),
                ));
            }
            Ok(attachment)
        };

        let input_attachments = subpass
            .input_attachments
            .iter()
            .map(|r| check(r.attachment))
            .collect::<Result<Vec<_>, _>>()?;
        let color_attachments = subpass
            .color_attachments
            .iter()
            .map(|r| check(r.attachment))
            .collect::<Result<Vec<_>, _>>()?;
        let depthstencil_attachment = match &subpass.depth_stencil_attachment {
            Some(r) if r.attachment != ATTACHMENT_UNUSED => Some(check(r.attachment)?),
            _ => None,
        };

        let load_pass = synthesize_load_pass(id, params)?;

        let snap = RenderPass {
            input_attachments,
            color_attachments,
            depthstencil_attachment,
            attach_count,
            load_pass,
        };
        debug!(id = id.raw(), attach_count, "recorded render pass");
        self.replace(ResourceType::RenderPass, &self.render_passes, id, snap);
        Ok(())
    }

    pub fn init_framebuffer(
        &self,
        id: ResourceId,
        params: &FramebufferCreateParams,
    ) -> Result<(), ShadowError> {
        let snap = Framebuffer {
            attachments: params.attachments.clone(),
            width: params.width,
            height: params.height,
            layers: params.layers,
        };
        self.replace(ResourceType::Framebuffer, &self.framebuffers, id, snap);
        Ok(())
    }

    // ── Init: memory-backed objects ─────────────────────────

    pub fn init_buffer(&self, id: ResourceId, params: &BufferCreateParams) -> Result<(), ShadowError> {
        self.replace(ResourceType::Buffer, &self.buffers, id, Buffer { size: params.size });
        Ok(())
    }

    pub fn init_buffer_view(
        &self,
        id: ResourceId,
        params: &BufferViewCreateParams,
    ) -> Result<(), ShadowError> {
        let snap = BufferView {
            buffer: params.buffer,
            offset: params.offset,
            size: params.range,
        };
        self.replace(ResourceType::BufferView, &self.buffer_views, id, snap);
        Ok(())
    }

    pub fn init_image(&self, id: ResourceId, params: &ImageCreateParams) -> Result<(), ShadowError> {
        let snap = Image {
            image_type: params.image_type,
            format: params.format,
            extent: params.extent,
            array_layers: params.array_layers,
            mip_levels: params.mip_levels,
            samples: params.samples,
            cube: params.flags & IMAGE_CREATE_CUBE_COMPATIBLE != 0,
            creation_flags: params.flags,
        };
        self.replace(ResourceType::Image, &self.images, id, snap);
        Ok(())
    }

    pub fn init_image_view(
        &self,
        id: ResourceId,
        params: &ImageViewCreateParams,
    ) -> Result<(), ShadowError> {
        self.replace(
            ResourceType::ImageView,
            &self.image_views,
            id,
            ImageView { image: params.image },
        );
        Ok(())
    }

    // ── Init: shaders ───────────────────────────────────────

    /// Store a module's SPIR-V with its reflection template and bindpoint
    /// mapping. Re-creating a module that live stage instances still
    /// reference is a capture-corruption condition.
    pub fn init_shader_module(
        &self,
        id: ResourceId,
        params: &ShaderModuleCreateParams,
    ) -> Result<(), ShadowError> {
        if self.shader_modules.contains_key(&id)
            && self.shaders.iter().any(|s| s.module == id)
        {
            return Err(ShadowError::DuplicateIdentity {
                ty: ResourceType::ShaderModule,
                id,
            });
        }

        let refl_template = ShaderReflection::from_spirv(&params.code).map_err(|e| {
            ShadowError::malformed(ResourceType::ShaderModule, id, e.to_string())
        })?;
        let mapping = BindpointMapping::from_reflection(&refl_template);

        debug!(
            id = id.raw(),
            words = params.code.len(),
            entry_points = refl_template.entry_points.len(),
            "recorded shader module"
        );
        let snap = ShaderModule {
            spirv: params.code.clone(),
            refl_template,
            mapping,
        };
        self.replace(ResourceType::ShaderModule, &self.shader_modules, id, snap);
        Ok(())
    }

    /// Specialize a stored module to one stage's entry point. The module's
    /// shared template is read, never mutated.
    pub fn init_shader(&self, id: ResourceId, params: &ShaderCreateParams) -> Result<(), ShadowError> {
        let stage = StageKind::from_flag_bit(params.stage).ok_or_else(|| {
            ShadowError::malformed(
                ResourceType::Shader,
                id,
                format!("unknown stage bits {:#x}", params.stage),
            )
        })?;

        let refl = {
            let module = self.shader_module(params.module)?;
            module
                .refl_template
                .specialize(&params.entry_point, stage)
                .ok_or_else(|| {
                    ShadowError::malformed(
                        ResourceType::Shader,
                        id,
                        format!(
                            "module has no {:?} entry point {:?}",
                            stage, params.entry_point
                        ),
                    )
                })?
        };
        let mapping = BindpointMapping::from_reflection(&refl);

        let snap = Shader {
            module: params.module,
            stage,
            entry_point: params.entry_point.clone(),
            refl,
            mapping,
        };
        self.replace(ResourceType::Shader, &self.shaders, id, snap);
        Ok(())
    }

    // ── Init: presentation and labels ───────────────────────

    pub fn init_swapchain(
        &self,
        id: ResourceId,
        params: &SwapchainCreateParams,
    ) -> Result<(), ShadowError> {
        let snap = Swapchain {
            format: params.format,
            color_space: params.color_space,
            extent: params.extent,
            image_count: params.image_count,
            present_mode: params.present_mode,
        };
        self.replace(ResourceType::Swapchain, &self.swapchains, id, snap);
        Ok(())
    }

    pub fn set_debug_name(&self, id: ResourceId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    // ── Queries ─────────────────────────────────────────────

    getter!(pipeline, pipelines, Pipeline, Pipeline);
    getter!(pipeline_layout, pipeline_layouts, PipelineLayout, PipelineLayout);
    getter!(render_pass, render_passes, RenderPass, RenderPass);
    getter!(framebuffer, framebuffers, Framebuffer, Framebuffer);
    getter!(buffer, buffers, Buffer, Buffer);
    getter!(buffer_view, buffer_views, BufferView, BufferView);
    getter!(image, images, Image, Image);
    getter!(image_view, image_views, ImageView, ImageView);
    getter!(shader_module, shader_modules, ShaderModule, ShaderModule);
    getter!(shader, shaders, Shader, Shader);
    getter!(desc_set_layout, desc_set_layouts, DescSetLayout, DescSetLayout);
    getter!(swapchain, swapchains, Swapchain, Swapchain);

    pub fn debug_name(&self, id: ResourceId) -> Result<Snapshot<'_, String>, ShadowError> {
        self.names.get(&id).ok_or(ShadowError::NotFound {
            ty: ResourceType::DebugName,
            id,
        })
    }

    /// Expand a stored descriptor-set layout into per-element records for a
    /// replay-side descriptor update.
    pub fn create_bindings_array(
        &self,
        id: ResourceId,
    ) -> Result<Vec<DescriptorElement>, ShadowError> {
        Ok(self.desc_set_layout(id)?.create_bindings_array())
    }

    /// Every populated (category, identity) pair, in category-then-identity
    /// order, for serialization.
    pub fn enumerate(&self) -> Vec<(ResourceType, ResourceId)> {
        let mut out = Vec::new();
        let mut push = |ty: ResourceType, ids: Vec<ResourceId>| {
            out.extend(ids.into_iter().map(|id| (ty, id)));
        };
        push(ResourceType::Pipeline, keys(&self.pipelines));
        push(ResourceType::PipelineLayout, keys(&self.pipeline_layouts));
        push(ResourceType::RenderPass, keys(&self.render_passes));
        push(ResourceType::Framebuffer, keys(&self.framebuffers));
        push(ResourceType::Buffer, keys(&self.buffers));
        push(ResourceType::BufferView, keys(&self.buffer_views));
        push(ResourceType::Image, keys(&self.images));
        push(ResourceType::ImageView, keys(&self.image_views));
        push(ResourceType::ShaderModule, keys(&self.shader_modules));
        push(ResourceType::Shader, keys(&self.shaders));
        push(ResourceType::DescSetLayout, keys(&self.desc_set_layouts));
        push(ResourceType::Swapchain, keys(&self.swapchains));
        push(ResourceType::DebugName, keys(&self.names));
        out.sort();
        out
    }

    // One snapshot per identity: insertion replaces atomically, dropping the
    // prior snapshot and everything it exclusively owned.
    fn replace<T>(&self, ty: ResourceType, map: &DashMap<ResourceId, T>, id: ResourceId, snap: T) {
        if map.insert(id, snap).is_some() {
            warn!(?ty, id = id.raw(), "snapshot replaced under re-created identity");
        }
    }
}

fn keys<T>(map: &DashMap<ResourceId, T>) -> Vec<ResourceId> {
    map.iter().map(|e| *e.key()).collect()
}

/// Build the stage-kind slot map, rejecting unknown stage bits and doubly
/// populated slots.
fn stage_slots(
    id: ResourceId,
    stages: impl Iterator<Item = (u32, ResourceId)>,
) -> Result<BTreeMap<StageKind, ResourceId>, ShadowError> {
    let mut slots = BTreeMap::new();
    for (raw, shader) in stages {
        let kind = StageKind::from_flag_bit(raw).ok_or_else(|| {
            ShadowError::malformed(
                ResourceType::Pipeline,
                id,
                format!("unknown stage bits {raw:#x}"),
            )
        })?;
        if slots.insert(kind, shader).is_some() {
            return Err(ShadowError::malformed(
                ResourceType::Pipeline,
                id,
                format!("duplicate {kind:?} stage"),
            ));
        }
    }
    Ok(slots)
}

/// The alternate pass used when replay re-enters a pass for inspection:
/// identical to the original except every attachment loads its previous
/// contents, so re-entry never clears or discards.
fn synthesize_load_pass(
    id: ResourceId,
    params: &RenderPassCreateParams,
) -> Result<RenderPassCreateParams, ShadowError> {
    let mut load_pass = params.clone();
    for (i, att) in load_pass.attachments.iter_mut().enumerate() {
        // Validate the captured ops are in-vocabulary before rewriting.
        for raw in [att.load_op, att.stencil_load_op] {
            AttachmentLoadOp::from_raw(raw).ok_or_else(|| {
                ShadowError::malformed(
                    ResourceType::RenderPass,
                    id,
                    format!("attachment {i}: unknown load op {raw}"),
                )
            })?;
        }
        att.load_op = AttachmentLoadOp::Load.as_raw();
        att.stencil_load_op = AttachmentLoadOp::Load.as_raw();
        att.initial_layout = att.final_layout;
    }
    Ok(load_pass)
}

impl Pipeline {
    /// Default-state pipeline; graphics init overrides what its params carry.
    fn base(flags: u32, layout: ResourceId, shaders: BTreeMap<StageKind, ResourceId>) -> Self {
        let stencil = StencilOpState {
            fail_op: 0,
            pass_op: 0,
            depth_fail_op: 0,
            compare_op: 0,
            compare_mask: 0,
            write_mask: 0,
            reference: 0,
        };
        Pipeline {
            flags,
            layout,
            render_pass: None,
            subpass: 0,
            shaders,
            vertex_bindings: Vec::new(),
            vertex_attrs: Vec::new(),
            topology: 0,
            primitive_restart_enable: false,
            patch_control_points: 0,
            viewport_count: 0,
            viewports: Vec::new(),
            scissors: Vec::new(),
            depth_clamp_enable: false,
            rasterizer_discard_enable: false,
            polygon_mode: 0,
            cull_mode: 0,
            front_face: 0,
            depth_bias_enable: false,
            depth_bias: 0.0,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 0.0,
            line_width: 1.0,
            raster_samples: 1,
            sample_shading_enable: false,
            min_sample_shading: 0.0,
            sample_mask: !0,
            alpha_to_coverage_enable: false,
            alpha_to_one_enable: false,
            depth_test_enable: false,
            depth_write_enable: false,
            depth_compare_op: 0,
            depth_bounds_enable: false,
            stencil_test_enable: false,
            front: stencil,
            back: stencil,
            min_depth_bounds: 0.0,
            max_depth_bounds: 1.0,
            logic_op_enable: false,
            logic_op: 0,
            blend_constants: [0.0; 4],
            attachments: Vec::new(),
            dynamic_states: DynamicStateFlags::empty(),
        }
    }
}
