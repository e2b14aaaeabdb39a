//! Integration test: shader modules and stage instances
//!
//! Hand-assembles small SPIR-V modules and checks that module init builds
//! the reflection template and bindpoint mapping, that stage init
//! specializes without mutating the template, and that re-creating a module
//! under a live stage instance is rejected.

use vkshadow::error::ShadowError;
use vkshadow::id::{IdentityTable, ResourceType};
use vkshadow::params::{ShaderCreateParams, ShaderModuleCreateParams};
use vkshadow::reflect::SPIRV_MAGIC;
use vkshadow::store::CreationInfo;
use vkshadow::vocab::StageKind;

fn inst(opcode: u16, operands: &[u32]) -> Vec<u32> {
    let mut words = vec![(opcode as u32) | (((operands.len() + 1) as u32) << 16)];
    words.extend_from_slice(operands);
    words
}

fn literal(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Vertex module: entry "main", one uniform buffer (set 0, binding 1), one
/// input at location 0, one output at location 0.
fn vertex_module() -> Vec<u32> {
    const OP_ENTRY_POINT: u16 = 15;
    const OP_VARIABLE: u16 = 59;
    const OP_DECORATE: u16 = 71;

    let mut code = vec![SPIRV_MAGIC, 0x0001_0000, 0, 50, 0];

    let mut entry = vec![0, 10]; // Vertex, %10
    entry.extend(literal("main"));
    entry.extend([20, 21]);
    code.extend(inst(OP_ENTRY_POINT, &entry));

    code.extend(inst(OP_DECORATE, &[30, 34, 0])); // DescriptorSet 0
    code.extend(inst(OP_DECORATE, &[30, 33, 1])); // Binding 1
    code.extend(inst(OP_DECORATE, &[20, 30, 0])); // Location 0
    code.extend(inst(OP_DECORATE, &[21, 30, 0])); // Location 0

    code.extend(inst(OP_VARIABLE, &[1, 30, 2])); // Uniform
    code.extend(inst(OP_VARIABLE, &[2, 20, 1])); // Input
    code.extend(inst(OP_VARIABLE, &[3, 21, 3])); // Output
    code
}

#[test]
fn test_module_init_reflects_and_maps() {
    let table = IdentityTable::new();
    let info = CreationInfo::new();
    let module = table.assign(ResourceType::ShaderModule, 1);

    info.init_shader_module(module, &ShaderModuleCreateParams { code: vertex_module() })
        .expect("init module");

    let snap = info.shader_module(module).expect("get module");
    assert_eq!(snap.spirv, vertex_module());
    assert_eq!(snap.refl_template.entry_points[0].name, "main");
    assert_eq!(snap.refl_template.entry_points[0].stage, StageKind::Vertex);
    assert_eq!(snap.refl_template.resources.len(), 1);
    assert_eq!(snap.mapping.resource_index(0, 1), Some(0));
}

#[test]
fn test_stage_instance_specializes_module() {
    let table = IdentityTable::new();
    let info = CreationInfo::new();
    let module = table.assign(ResourceType::ShaderModule, 1);
    let stage = table.assign(ResourceType::Shader, 2);

    info.init_shader_module(module, &ShaderModuleCreateParams { code: vertex_module() })
        .expect("init module");
    info.init_shader(
        stage,
        &ShaderCreateParams {
            module,
            entry_point: "main".to_string(),
            stage: 0x01,
        },
    )
    .expect("init stage");

    let snap = info.shader(stage).expect("get stage");
    assert_eq!(snap.module, module);
    assert_eq!(snap.stage, StageKind::Vertex);
    assert_eq!(snap.refl.inputs.len(), 1);
    assert_eq!(snap.refl.outputs.len(), 1);
    assert_eq!(snap.mapping.resource_index(0, 1), Some(0));

    // The module's shared template is untouched by specialization.
    let module_snap = info.shader_module(module).expect("get module");
    assert_eq!(module_snap.refl_template.entry_points[0].interface_ids, vec![20, 21]);
}

#[test]
fn test_stage_with_wrong_entry_point_is_malformed() {
    let table = IdentityTable::new();
    let info = CreationInfo::new();
    let module = table.assign(ResourceType::ShaderModule, 1);
    let stage = table.assign(ResourceType::Shader, 2);

    info.init_shader_module(module, &ShaderModuleCreateParams { code: vertex_module() })
        .expect("init module");

    let err = info
        .init_shader(
            stage,
            &ShaderCreateParams {
                module,
                entry_point: "main".to_string(),
                stage: 0x10, // fragment; module only declares vertex
            },
        )
        .expect_err("stage mismatch");
    assert!(matches!(err, ShadowError::Malformed { ty: ResourceType::Shader, .. }));
}

#[test]
fn test_stage_before_module_is_not_found() {
    let table = IdentityTable::new();
    let info = CreationInfo::new();
    let module = table.assign(ResourceType::ShaderModule, 1);
    let stage = table.assign(ResourceType::Shader, 2);

    let err = info
        .init_shader(
            stage,
            &ShaderCreateParams {
                module,
                entry_point: "main".to_string(),
                stage: 0x01,
            },
        )
        .expect_err("module missing");
    assert_eq!(
        err,
        ShadowError::NotFound {
            ty: ResourceType::ShaderModule,
            id: module
        }
    );
}

#[test]
fn test_module_recreation_under_live_stage_is_duplicate() {
    let table = IdentityTable::new();
    let info = CreationInfo::new();
    let module = table.assign(ResourceType::ShaderModule, 1);
    let stage = table.assign(ResourceType::Shader, 2);

    info.init_shader_module(module, &ShaderModuleCreateParams { code: vertex_module() })
        .expect("init module");
    info.init_shader(
        stage,
        &ShaderCreateParams {
            module,
            entry_point: "main".to_string(),
            stage: 0x01,
        },
    )
    .expect("init stage");

    let err = info
        .init_shader_module(module, &ShaderModuleCreateParams { code: vertex_module() })
        .expect_err("live dependents");
    assert_eq!(
        err,
        ShadowError::DuplicateIdentity {
            ty: ResourceType::ShaderModule,
            id: module
        }
    );
}

#[test]
fn test_non_spirv_module_is_malformed() {
    let table = IdentityTable::new();
    let info = CreationInfo::new();
    let module = table.assign(ResourceType::ShaderModule, 1);

    let err = info
        .init_shader_module(
            module,
            &ShaderModuleCreateParams { code: vec![0x1234_5678, 0, 0, 0, 0] },
        )
        .expect_err("bad magic");
    assert!(matches!(err, ShadowError::Malformed { ty: ResourceType::ShaderModule, .. }));
}
