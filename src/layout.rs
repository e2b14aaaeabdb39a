//! Descriptor-set layout snapshots and per-element binding expansion.

use serde::{Deserialize, Serialize};

use crate::error::ShadowError;
use crate::id::{ResourceId, ResourceType};
use crate::params::DescriptorSetLayoutCreateParams;
use crate::vocab::{DescriptorType, ShaderStageFlags};

/// One declared binding slot, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub array_size: u32,
    pub stage_flags: ShaderStageFlags,
    /// Owned exclusively by this binding; length always equals `array_size`.
    pub immutable_samplers: Option<Vec<ResourceId>>,
}

/// Compact descriptor-set layout snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescSetLayout {
    /// Binding slots in declared order.
    pub bindings: Vec<Binding>,
    /// Number of bindings with a dynamically-offset descriptor type.
    /// Derived at init; never independently settable.
    pub dynamic_count: u32,
}

/// One fully-enumerated descriptor element, suitable for driving a
/// descriptor-set update during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorElement {
    pub binding: u32,
    pub array_index: u32,
    pub descriptor_type: DescriptorType,
    pub stage_flags: ShaderStageFlags,
    pub immutable_sampler: Option<ResourceId>,
}

impl DescSetLayout {
    /// Normalize a captured layout description into one entry per declared
    /// binding slot. An immutable-sampler array whose length disagrees with
    /// the binding's array size is malformed here, not at expansion time.
    pub fn init(
        id: ResourceId,
        params: &DescriptorSetLayoutCreateParams,
    ) -> Result<Self, ShadowError> {
        let mut bindings = Vec::with_capacity(params.bindings.len());
        let mut dynamic_count = 0;
        let mut total_elements: u32 = 0;

        for b in &params.bindings {
            total_elements = total_elements
                .checked_add(b.descriptor_count)
                .ok_or_else(|| {
                    ShadowError::malformed(
                        ResourceType::DescSetLayout,
                        id,
                        "total descriptor count overflows",
                    )
                })?;
            let descriptor_type = DescriptorType::from_raw(b.descriptor_type).ok_or_else(|| {
                ShadowError::malformed(
                    ResourceType::DescSetLayout,
                    id,
                    format!(
                        "unknown descriptor type {} on binding {}",
                        b.descriptor_type, b.binding
                    ),
                )
            })?;

            if let Some(samplers) = &b.immutable_samplers {
                if samplers.len() != b.descriptor_count as usize {
                    return Err(ShadowError::malformed(
                        ResourceType::DescSetLayout,
                        id,
                        format!(
                            "binding {}: {} immutable samplers for array size {}",
                            b.binding,
                            samplers.len(),
                            b.descriptor_count
                        ),
                    ));
                }
                if !descriptor_type.has_sampler() {
                    return Err(ShadowError::malformed(
                        ResourceType::DescSetLayout,
                        id,
                        format!(
                            "binding {}: immutable samplers on {:?}",
                            b.binding, descriptor_type
                        ),
                    ));
                }
            }

            if descriptor_type.is_dynamic() {
                dynamic_count += 1;
            }

            bindings.push(Binding {
                binding: b.binding,
                descriptor_type,
                array_size: b.descriptor_count,
                stage_flags: ShaderStageFlags::from_bits_truncate(b.stage_flags),
                immutable_samplers: b.immutable_samplers.clone(),
            });
        }

        Ok(DescSetLayout {
            bindings,
            dynamic_count,
        })
    }

    /// Expand the compact per-slot representation into one record per array
    /// element of every binding, in binding-then-array-index order. A pure
    /// function of the stored layout; zero-size bindings contribute nothing.
    pub fn create_bindings_array(&self) -> Vec<DescriptorElement> {
        let total: usize = self.bindings.iter().map(|b| b.array_size as usize).sum();
        let mut elements = Vec::with_capacity(total);

        for b in &self.bindings {
            for i in 0..b.array_size {
                elements.push(DescriptorElement {
                    binding: b.binding,
                    array_index: i,
                    descriptor_type: b.descriptor_type,
                    stage_flags: b.stage_flags,
                    immutable_sampler: b
                        .immutable_samplers
                        .as_ref()
                        .map(|s| s[i as usize]),
                });
            }
        }

        elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdentityTable;
    use crate::params::DescriptorBindingParams;

    fn test_id() -> ResourceId {
        IdentityTable::new().assign(ResourceType::DescSetLayout, 1)
    }

    fn binding(binding: u32, ty: i32, count: u32) -> DescriptorBindingParams {
        DescriptorBindingParams {
            binding,
            descriptor_type: ty,
            descriptor_count: count,
            stage_flags: ShaderStageFlags::FRAGMENT.bits(),
            immutable_samplers: None,
        }
    }

    #[test]
    fn dynamic_count_is_derived() {
        let layout = DescSetLayout::init(
            test_id(),
            &DescriptorSetLayoutCreateParams {
                bindings: vec![
                    binding(0, 6, 1), // uniform buffer
                    binding(1, 8, 1), // uniform buffer dynamic
                    binding(2, 9, 2), // storage buffer dynamic
                ],
            },
        )
        .expect("valid layout");
        assert_eq!(layout.dynamic_count, 2);
    }

    #[test]
    fn expansion_enumerates_every_array_element() {
        let layout = DescSetLayout::init(
            test_id(),
            &DescriptorSetLayoutCreateParams {
                bindings: vec![binding(0, 2, 3), binding(1, 6, 0), binding(2, 7, 1)],
            },
        )
        .expect("valid layout");

        let elements = layout.create_bindings_array();
        // Zero-size binding 1 contributes no placeholder entry.
        assert_eq!(elements.len(), 4);
        assert_eq!(
            elements.iter().map(|e| (e.binding, e.array_index)).collect::<Vec<_>>(),
            vec![(0, 0), (0, 1), (0, 2), (2, 0)]
        );

        // Pure function of the stored layout.
        assert_eq!(layout.create_bindings_array(), elements);
    }

    #[test]
    fn sampler_length_mismatch_is_malformed_at_init() {
        let table = IdentityTable::new();
        let sampler = table.assign(ResourceType::Sampler, 0x10);
        let id = table.assign(ResourceType::DescSetLayout, 0x11);

        let err = DescSetLayout::init(
            id,
            &DescriptorSetLayoutCreateParams {
                bindings: vec![DescriptorBindingParams {
                    binding: 0,
                    descriptor_type: 0, // sampler
                    descriptor_count: 2,
                    stage_flags: ShaderStageFlags::FRAGMENT.bits(),
                    immutable_samplers: Some(vec![sampler]),
                }],
            },
        )
        .expect_err("length mismatch");
        assert!(matches!(err, ShadowError::Malformed { ty: ResourceType::DescSetLayout, .. }));
    }

    #[test]
    fn expansion_carries_immutable_samplers_per_element() {
        let table = IdentityTable::new();
        let s0 = table.assign(ResourceType::Sampler, 0x20);
        let s1 = table.assign(ResourceType::Sampler, 0x21);
        let id = table.assign(ResourceType::DescSetLayout, 0x22);

        let layout = DescSetLayout::init(
            id,
            &DescriptorSetLayoutCreateParams {
                bindings: vec![DescriptorBindingParams {
                    binding: 4,
                    descriptor_type: 1, // combined image sampler
                    descriptor_count: 2,
                    stage_flags: ShaderStageFlags::FRAGMENT.bits(),
                    immutable_samplers: Some(vec![s0, s1]),
                }],
            },
        )
        .expect("valid layout");

        let elements = layout.create_bindings_array();
        assert_eq!(elements[0].immutable_sampler, Some(s0));
        assert_eq!(elements[1].immutable_sampler, Some(s1));
    }
}
