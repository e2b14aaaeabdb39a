//! Shader reflection extracted from stored SPIR-V.
//!
//! A word-level scan of the module's instruction stream pulls out entry
//! points, descriptor-bound resources, and the input/output interface. The
//! result is the module-wide reflection template; pipeline stage instances
//! specialize it to one entry point without touching the shared template.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::vocab::StageKind;

pub const SPIRV_MAGIC: u32 = 0x0723_0203;

const OP_NAME: u16 = 5;
const OP_ENTRY_POINT: u16 = 15;
const OP_VARIABLE: u16 = 59;
const OP_DECORATE: u16 = 71;

const DECORATION_LOCATION: u32 = 30;
const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;

const STORAGE_UNIFORM_CONSTANT: u32 = 0;
const STORAGE_INPUT: u32 = 1;
const STORAGE_UNIFORM: u32 = 2;
const STORAGE_OUTPUT: u32 = 3;
const STORAGE_STORAGE_BUFFER: u32 = 12;

#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    #[error("not a SPIR-V module (bad magic {0:#010x})")]
    BadMagic(u32),
    #[error("truncated SPIR-V stream at word {0}")]
    Truncated(usize),
    #[error("unterminated literal string at word {0}")]
    BadString(usize),
    #[error("unsupported execution model {0}")]
    UnsupportedStage(u32),
}

/// One OpEntryPoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub stage: StageKind,
    /// Result ids of the entry point's interface variables.
    pub interface_ids: Vec<u32>,
}

/// A descriptor-bound resource (uniform/storage buffer, image, sampler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectedResource {
    pub spirv_id: u32,
    pub name: String,
    pub set: u32,
    pub binding: u32,
}

/// One stage input or output variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceVariable {
    pub spirv_id: u32,
    pub name: String,
    pub location: Option<u32>,
}

/// Reflection over a whole module, or specialized to one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderReflection {
    pub entry_points: Vec<EntryPoint>,
    /// Sorted by (set, binding).
    pub resources: Vec<ReflectedResource>,
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<InterfaceVariable>,
}

impl ShaderReflection {
    /// Scan a SPIR-V word stream. The stream is not decoded beyond the
    /// debug/annotation/variable instructions reflection needs.
    pub fn from_spirv(code: &[u32]) -> Result<Self, ReflectError> {
        if code.is_empty() || code[0] != SPIRV_MAGIC {
            return Err(ReflectError::BadMagic(code.first().copied().unwrap_or(0)));
        }
        if code.len() < 5 {
            return Err(ReflectError::Truncated(code.len()));
        }

        let mut names: HashMap<u32, String> = HashMap::new();
        let mut sets: HashMap<u32, u32> = HashMap::new();
        let mut bindings: HashMap<u32, u32> = HashMap::new();
        let mut locations: HashMap<u32, u32> = HashMap::new();
        // (result id, storage class), in declaration order
        let mut variables: Vec<(u32, u32)> = Vec::new();
        let mut entry_points = Vec::new();

        let mut i = 5;
        while i < code.len() {
            let word_count = (code[i] >> 16) as usize;
            let opcode = (code[i] & 0xffff) as u16;
            if word_count == 0 || i + word_count > code.len() {
                return Err(ReflectError::Truncated(i));
            }
            let operands = &code[i + 1..i + word_count];

            match opcode {
                OP_NAME => {
                    if let Some(&target) = operands.first() {
                        let (name, _) = literal_string(&operands[1..], i)?;
                        names.insert(target, name);
                    }
                }
                OP_ENTRY_POINT => {
                    if operands.len() < 2 {
                        return Err(ReflectError::Truncated(i));
                    }
                    let model = operands[0];
                    let stage = StageKind::from_execution_model(model)
                        .ok_or(ReflectError::UnsupportedStage(model))?;
                    let (name, consumed) = literal_string(&operands[2..], i)?;
                    let interface_ids = operands[2 + consumed..].to_vec();
                    entry_points.push(EntryPoint {
                        name,
                        stage,
                        interface_ids,
                    });
                }
                OP_DECORATE => {
                    if operands.len() >= 3 {
                        let (target, decoration, value) = (operands[0], operands[1], operands[2]);
                        match decoration {
                            DECORATION_DESCRIPTOR_SET => {
                                sets.insert(target, value);
                            }
                            DECORATION_BINDING => {
                                bindings.insert(target, value);
                            }
                            DECORATION_LOCATION => {
                                locations.insert(target, value);
                            }
                            _ => {}
                        }
                    }
                }
                OP_VARIABLE => {
                    if operands.len() >= 3 {
                        variables.push((operands[1], operands[2]));
                    }
                }
                _ => {}
            }

            i += word_count;
        }

        let name_of = |id: u32| names.get(&id).cloned().unwrap_or_default();

        let mut resources = Vec::new();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for &(id, storage) in &variables {
            match storage {
                STORAGE_UNIFORM_CONSTANT | STORAGE_UNIFORM | STORAGE_STORAGE_BUFFER => {
                    // An undecorated UniformConstant is not bindable (e.g.
                    // spec constants lowered to variables); skip it.
                    if let Some(&binding) = bindings.get(&id) {
                        resources.push(ReflectedResource {
                            spirv_id: id,
                            name: name_of(id),
                            set: sets.get(&id).copied().unwrap_or(0),
                            binding,
                        });
                    }
                }
                STORAGE_INPUT => inputs.push(InterfaceVariable {
                    spirv_id: id,
                    name: name_of(id),
                    location: locations.get(&id).copied(),
                }),
                STORAGE_OUTPUT => outputs.push(InterfaceVariable {
                    spirv_id: id,
                    name: name_of(id),
                    location: locations.get(&id).copied(),
                }),
                _ => {}
            }
        }
        resources.sort_by_key(|r| (r.set, r.binding, r.spirv_id));

        Ok(ShaderReflection {
            entry_points,
            resources,
            inputs,
            outputs,
        })
    }

    /// Narrow the template to a single entry point. Inputs/outputs are
    /// restricted to that entry's interface list; descriptor resources are
    /// module-scoped and kept as-is. Returns None when the module declares
    /// no matching (name, stage) entry point.
    pub fn specialize(&self, entry_point: &str, stage: StageKind) -> Option<ShaderReflection> {
        let entry = self
            .entry_points
            .iter()
            .find(|e| e.name == entry_point && e.stage == stage)?;

        let in_interface =
            |v: &InterfaceVariable| entry.interface_ids.contains(&v.spirv_id);

        Some(ShaderReflection {
            entry_points: vec![entry.clone()],
            resources: self.resources.clone(),
            inputs: self.inputs.iter().filter(|v| in_interface(v)).cloned().collect(),
            outputs: self.outputs.iter().filter(|v| in_interface(v)).cloned().collect(),
        })
    }
}

/// Decode a null-terminated SPIR-V literal string.
/// Returns the string and the number of words consumed.
fn literal_string(words: &[u32], at: usize) -> Result<(String, usize), ReflectError> {
    let mut bytes = Vec::new();
    for (consumed, word) in words.iter().enumerate() {
        for byte in word.to_le_bytes() {
            if byte == 0 {
                return Ok((String::from_utf8_lossy(&bytes).into_owned(), consumed + 1));
            }
            bytes.push(byte);
        }
    }
    Err(ReflectError::BadString(at))
}

// ── Bindpoint mapping ────────────────────────────────────────

/// Translates API (set, binding) pairs to indices into a reflection's
/// resource list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindpointMapping {
    /// Sorted by (set, binding), mirroring the reflection's resource order.
    pub bindpoints: Vec<Bindpoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindpoint {
    pub set: u32,
    pub binding: u32,
    pub resource_index: u32,
}

impl BindpointMapping {
    pub fn from_reflection(refl: &ShaderReflection) -> Self {
        let bindpoints = refl
            .resources
            .iter()
            .enumerate()
            .map(|(index, r)| Bindpoint {
                set: r.set,
                binding: r.binding,
                resource_index: index as u32,
            })
            .collect();
        BindpointMapping { bindpoints }
    }

    pub fn resource_index(&self, set: u32, binding: u32) -> Option<u32> {
        self.bindpoints
            .iter()
            .find(|b| b.set == set && b.binding == binding)
            .map(|b| b.resource_index)
    }
}
