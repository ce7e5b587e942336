//! GLSL sources and their compilation through naga.
//!
//! Sources are compiled on the CPU (parse + validate) and handed to wgpu as
//! naga IR, so shader errors surface as `ShaderError` instead of a device
//! panic, and the resulting modules can be reflected in tests.

use std::borrow::Cow;
use std::fmt;

use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

pub use naga::ShaderStage;

/// Vertex + fragment sources of one pipeline.
#[derive(Debug, Copy, Clone)]
pub struct ShaderPair {
    pub label: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

pub const BASIC: ShaderPair = ShaderPair {
    label: "basic",
    vertex: include_str!("shaders/basic.vert"),
    fragment: include_str!("shaders/basic.frag"),
};

pub const SOLID: ShaderPair = ShaderPair {
    label: "solid",
    vertex: include_str!("shaders/solid.vert"),
    fragment: include_str!("shaders/solid.frag"),
};

pub const INT_QUAD: ShaderPair = ShaderPair {
    label: "int quad",
    vertex: include_str!("shaders/quad_int.vert"),
    fragment: include_str!("shaders/texture.frag"),
};

/// A shader failed to parse or validate.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderError {
    pub label: String,
    pub stage: ShaderStage,
    pub messages: Vec<String>,
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} shader: {}", self.label, self.stage, self.messages.join("; "))
    }
}

impl std::error::Error for ShaderError {}

/// Parses and validates a GLSL stage.
pub fn compile(label: &str, source: &str, stage: ShaderStage) -> Result<naga::Module, ShaderError> {
    let err = |messages: Vec<String>| ShaderError {
        label: label.to_string(),
        stage,
        messages,
    };

    let module = glsl::Frontend::default()
        .parse(&glsl::Options::from(stage), source)
        .map_err(|e| err(e.errors.iter().map(|e| e.to_string()).collect()))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| err(vec![e.as_inner().to_string()]))?;

    log::debug!("compiled {label} {stage:?} shader");
    Ok(module)
}

/// Compiles a GLSL stage and creates the wgpu shader module for it.
pub fn create_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, ShaderError> {
    let module = compile(label, source, stage)?;
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
    }))
}

/// Compiled vertex + fragment modules of a [`ShaderPair`].
pub struct PairModules {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

impl ShaderPair {
    pub fn create_modules(&self, device: &wgpu::Device) -> Result<PairModules, ShaderError> {
        Ok(PairModules {
            vertex: create_module(device, self.label, self.vertex, ShaderStage::Vertex)?,
            fragment: create_module(device, self.label, self.fragment, ShaderStage::Fragment)?,
        })
    }
}

// ── reflection ────────────────────────────────────────────────────────────

/// `(location, format)` of every located input of the module's entry point.
///
/// Inputs whose type has no vertex-format counterpart are skipped.
pub fn vertex_inputs(module: &naga::Module) -> Vec<(u32, wgpu::VertexFormat)> {
    let Some(entry) = module.entry_points.first() else { return Vec::new() };

    let mut out: Vec<(u32, wgpu::VertexFormat)> = entry
        .function
        .arguments
        .iter()
        .filter_map(|arg| match arg.binding {
            Some(naga::Binding::Location { location, .. }) => {
                vertex_format(&module.types[arg.ty].inner).map(|f| (location, f))
            }
            _ => None,
        })
        .collect();
    out.sort_by_key(|(loc, _)| *loc);
    out
}

/// `(group, binding)` of every resource global the module declares.
pub fn resource_bindings(module: &naga::Module) -> Vec<(u32, u32)> {
    let mut out: Vec<(u32, u32)> = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| var.binding.as_ref().map(|b| (b.group, b.binding)))
        .collect();
    out.sort_unstable();
    out
}

fn vertex_format(inner: &naga::TypeInner) -> Option<wgpu::VertexFormat> {
    use naga::{ScalarKind, TypeInner, VectorSize};
    use wgpu::VertexFormat as F;

    let (kind, width, size) = match *inner {
        TypeInner::Scalar(s) => (s.kind, s.width, None),
        TypeInner::Vector { size, scalar } => (scalar.kind, scalar.width, Some(size)),
        _ => return None,
    };
    if width != 4 {
        return None;
    }

    Some(match (kind, size) {
        (ScalarKind::Float, None) => F::Float32,
        (ScalarKind::Float, Some(VectorSize::Bi)) => F::Float32x2,
        (ScalarKind::Float, Some(VectorSize::Tri)) => F::Float32x3,
        (ScalarKind::Float, Some(VectorSize::Quad)) => F::Float32x4,
        (ScalarKind::Sint, None) => F::Sint32,
        (ScalarKind::Sint, Some(VectorSize::Bi)) => F::Sint32x2,
        (ScalarKind::Sint, Some(VectorSize::Tri)) => F::Sint32x3,
        (ScalarKind::Sint, Some(VectorSize::Quad)) => F::Sint32x4,
        (ScalarKind::Uint, None) => F::Uint32,
        (ScalarKind::Uint, Some(VectorSize::Bi)) => F::Uint32x2,
        (ScalarKind::Uint, Some(VectorSize::Tri)) => F::Uint32x3,
        (ScalarKind::Uint, Some(VectorSize::Quad)) => F::Uint32x4,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::CORNER_OFFSETS;
    use crate::vertex::{BasicVertex, IntQuadInstance, SolidInstance};

    fn vs(pair: ShaderPair) -> naga::Module {
        compile(pair.label, pair.vertex, ShaderStage::Vertex).unwrap()
    }

    fn fs(pair: ShaderPair) -> naga::Module {
        compile(pair.label, pair.fragment, ShaderStage::Fragment).unwrap()
    }

    fn layout_of(attrs: &[wgpu::VertexAttribute]) -> Vec<(u32, wgpu::VertexFormat)> {
        attrs.iter().map(|a| (a.shader_location, a.format)).collect()
    }

    // ── compilation ───────────────────────────────────────────────────────

    #[test]
    fn all_sources_compile() {
        for pair in [BASIC, SOLID, INT_QUAD] {
            vs(pair);
            fs(pair);
        }
    }

    #[test]
    fn broken_source_reports_label_and_stage() {
        let err = compile("broken", "#version 450\nvoid main() { nope; }", ShaderStage::Fragment)
            .unwrap_err();
        assert_eq!(err.label, "broken");
        assert_eq!(err.stage, ShaderStage::Fragment);
        assert!(!err.messages.is_empty());
        assert!(err.to_string().starts_with("broken Fragment shader:"));
    }

    // ── vertex ABI ────────────────────────────────────────────────────────

    #[test]
    fn basic_inputs_match_vertex_layout() {
        assert_eq!(vertex_inputs(&vs(BASIC)), layout_of(&BasicVertex::ATTRS));
    }

    #[test]
    fn solid_inputs_match_instance_layout() {
        assert_eq!(vertex_inputs(&vs(SOLID)), layout_of(&SolidInstance::ATTRS));
    }

    #[test]
    fn int_quad_inputs_match_instance_layout() {
        assert_eq!(vertex_inputs(&vs(INT_QUAD)), layout_of(&IntQuadInstance::ATTRS));
    }

    #[test]
    fn fragment_inputs_match_vertex_outputs() {
        assert_eq!(
            vertex_inputs(&fs(BASIC)),
            vec![(0, wgpu::VertexFormat::Float32x4)]
        );
        assert_eq!(
            vertex_inputs(&fs(SOLID)),
            vec![(0, wgpu::VertexFormat::Float32x4), (1, wgpu::VertexFormat::Float32x2)]
        );
        assert!(vertex_inputs(&fs(INT_QUAD)).is_empty());
    }

    // ── corner table ──────────────────────────────────────────────────────

    type Exprs = naga::Arena<naga::Expression>;

    fn literal(module: &naga::Module, arena: &Exprs, h: naga::Handle<naga::Expression>) -> Option<f32> {
        use naga::{Expression as E, Literal as L};
        match arena[h] {
            E::Literal(L::F32(v)) => Some(v),
            E::Literal(L::I32(v)) => Some(v as f32),
            E::Literal(L::AbstractFloat(v)) => Some(v as f32),
            E::Literal(L::AbstractInt(v)) => Some(v as f32),
            E::ZeroValue(_) => Some(0.0),
            E::Constant(c) => literal(module, &module.global_expressions, module.constants[c].init),
            _ => None,
        }
    }

    fn pair(module: &naga::Module, arena: &Exprs, h: naga::Handle<naga::Expression>) -> Option<[f32; 2]> {
        use naga::Expression as E;
        match arena[h] {
            E::Compose { ref components, .. } if components.len() == 2 => Some([
                literal(module, arena, components[0])?,
                literal(module, arena, components[1])?,
            ]),
            E::Splat { value, .. } => literal(module, arena, value).map(|v| [v, v]),
            E::ZeroValue(_) => Some([0.0, 0.0]),
            E::Constant(c) => pair(module, &module.global_expressions, module.constants[c].init),
            _ => None,
        }
    }

    /// The 4-element array constructor a vertex shader indexes with
    /// `gl_VertexIndex`, read back out of the IR.
    fn corner_table(module: &naga::Module) -> Option<Vec<[f32; 2]>> {
        let arenas = module
            .functions
            .iter()
            .map(|(_, f)| &f.expressions)
            .chain(module.entry_points.iter().map(|ep| &ep.function.expressions))
            .chain(std::iter::once(&module.global_expressions));

        for arena in arenas {
            for (_, expr) in arena.iter() {
                let naga::Expression::Compose { ty, ref components } = *expr else { continue };
                if components.len() == 4
                    && matches!(module.types[ty].inner, naga::TypeInner::Array { .. })
                {
                    return components.iter().map(|&c| pair(module, arena, c)).collect();
                }
            }
        }
        None
    }

    #[test]
    fn shader_corner_tables_match_cpu_table() {
        let expected: Vec<[f32; 2]> = CORNER_OFFSETS.iter().map(|c| c.to_array()).collect();
        assert_eq!(corner_table(&vs(SOLID)), Some(expected.clone()));
        assert_eq!(corner_table(&vs(INT_QUAD)), Some(expected));
    }

    // ── resource ABI ──────────────────────────────────────────────────────

    #[test]
    fn resource_bindings_are_fixed() {
        assert_eq!(resource_bindings(&vs(BASIC)), vec![(0, 0)]);
        assert!(resource_bindings(&fs(BASIC)).is_empty());

        assert!(resource_bindings(&vs(SOLID)).is_empty());
        assert_eq!(resource_bindings(&fs(SOLID)), vec![(0, 0), (0, 1)]);

        assert_eq!(resource_bindings(&vs(INT_QUAD)), vec![(0, 0)]);
        assert_eq!(resource_bindings(&fs(INT_QUAD)), vec![(0, 0), (0, 1), (0, 2)]);
    }
}
