//! Scene tree to WGSL code generator
//!
//! Each scene function returns `vec2<f32>(distance, material)` and calls the
//! helpers in `shaders/sdf_ops.wgsl`. The tree is compiled once when a
//! pipeline is built; nothing is regenerated per frame.

// String writing is infallible, so .unwrap() is safe here
// Format args inlining is not always more readable for shader code generation
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use std::fmt::Write;

use crate::globe::GlobeScene;
use crate::node::SceneNode;

/// Marker in a base shader where the scene module is spliced in
pub const SCENE_MARKER: &str = "// SCENE_PLACEHOLDER";

/// Generate WGSL code for a scene tree
pub struct WgslGenerator {
    var_counter: usize,
}

impl WgslGenerator {
    pub fn new() -> Self {
        Self { var_counter: 0 }
    }

    fn next_var(&mut self) -> String {
        let var = format!("d{}", self.var_counter);
        self.var_counter += 1;
        var
    }

    fn next_pos_var(&mut self) -> String {
        let var = format!("p{}", self.var_counter);
        self.var_counter += 1;
        var
    }

    /// Generate `fn <name>(p: vec3<f32>) -> vec2<f32>` for a tree
    pub fn generate_function(&mut self, name: &str, node: &SceneNode) -> String {
        self.var_counter = 0;
        let mut code = String::new();

        writeln!(code, "fn {}(p: vec3<f32>) -> vec2<f32> {{", name).unwrap();
        let result = self.generate_node(node, "p", &mut code);
        writeln!(code, "    return {};", result).unwrap();
        writeln!(code, "}}").unwrap();

        code
    }

    /// Emit code for one node, returning the variable holding its result
    fn generate_node(&mut self, node: &SceneNode, pos_var: &str, code: &mut String) -> String {
        match node {
            // Primitives
            SceneNode::Sphere { radius, material } => {
                let var = self.next_var();
                writeln!(
                    code,
                    "    let {} = sd_sphere({}, {:.6}, {:.1});",
                    var,
                    pos_var,
                    radius,
                    material.id()
                )
                .unwrap();
                var
            }
            SceneNode::Cylinder { radius, material } => {
                let var = self.next_var();
                writeln!(
                    code,
                    "    let {} = sd_cylinder({}, {:.6}, {:.1});",
                    var,
                    pos_var,
                    radius,
                    material.id()
                )
                .unwrap();
                var
            }
            SceneNode::FieldShell { material, .. } => {
                // The field itself is bound as a texture
                let var = self.next_var();
                writeln!(
                    code,
                    "    let {} = sd_field_shell({}, {:.1});",
                    var,
                    pos_var,
                    material.id()
                )
                .unwrap();
                var
            }

            // Boolean operations
            SceneNode::Union { a, b } => {
                let a_var = self.generate_node(a, pos_var, code);
                let b_var = self.generate_node(b, pos_var, code);
                let var = self.next_var();
                writeln!(code, "    let {} = op_union({}, {});", var, a_var, b_var).unwrap();
                var
            }
            SceneNode::Subtract { a, b } => {
                let a_var = self.generate_node(a, pos_var, code);
                let b_var = self.generate_node(b, pos_var, code);
                let var = self.next_var();
                writeln!(code, "    let {} = op_subtract({}, {});", var, a_var, b_var).unwrap();
                var
            }
            SceneNode::ChamferSubtract { chamfer, a, b } => {
                let a_var = self.generate_node(a, pos_var, code);
                let b_var = self.generate_node(b, pos_var, code);
                let var = self.next_var();
                writeln!(
                    code,
                    "    let {} = op_chamfer_subtract({:.6}, {}, {});",
                    var, chamfer, a_var, b_var
                )
                .unwrap();
                var
            }
            SceneNode::Negate { inner } => {
                let inner_var = self.generate_node(inner, pos_var, code);
                let var = self.next_var();
                writeln!(code, "    let {} = op_negate({});", var, inner_var).unwrap();
                var
            }

            // Domain operations
            SceneNode::Revolve { inner } => {
                let new_pos = self.next_pos_var();
                writeln!(code, "    let {} = op_revolve({});", new_pos, pos_var).unwrap();
                self.generate_node(inner, &new_pos, code)
            }
            SceneNode::AngularRepeat { inner, period } => {
                let new_pos = self.next_pos_var();
                writeln!(
                    code,
                    "    let {} = op_angular_repeat({}, {:.8});",
                    new_pos, pos_var, period
                )
                .unwrap();
                self.generate_node(inner, &new_pos, code)
            }
            SceneNode::Translate { inner, offset } => {
                let new_pos = self.next_pos_var();
                writeln!(
                    code,
                    "    let {} = {} - vec3<f32>({:.6}, {:.6}, {:.6});",
                    new_pos, pos_var, offset[0], offset[1], offset[2]
                )
                .unwrap();
                self.generate_node(inner, &new_pos, code)
            }
            SceneNode::Swizzle { inner, axes } => {
                let new_pos = self.next_pos_var();
                writeln!(code, "    let {} = {}.{};", new_pos, pos_var, axes.suffix()).unwrap();
                self.generate_node(inner, &new_pos, code)
            }
        }
    }
}

impl Default for WgslGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared SDF helper functions
pub fn sdf_prelude() -> &'static str {
    include_str!("shaders/sdf_ops.wgsl")
}

/// Helpers plus `map_grid`, `map_shell` and `map_scene` for a globe
pub fn build_globe_module(globe: &GlobeScene) -> String {
    let mut generator = WgslGenerator::new();
    let mut module = String::from(sdf_prelude());
    module.push('\n');
    module.push_str(&generator.generate_function("map_grid", globe.grid()));
    module.push('\n');
    module.push_str(&generator.generate_function("map_shell", globe.shell()));
    module.push('\n');
    module.push_str("fn map_scene(p: vec3<f32>) -> vec2<f32> {\n");
    module.push_str("    return op_union(map_grid(p), map_shell(p));\n");
    module.push_str("}\n");
    module
}

/// Splice generated scene code into a base shader at [`SCENE_MARKER`]
pub fn inject_scene(base_shader: &str, scene_code: &str) -> String {
    if let Some(pos) = base_shader.find(SCENE_MARKER) {
        let mut result = String::with_capacity(base_shader.len() + scene_code.len());
        result.push_str(&base_shader[..pos]);
        result.push_str(scene_code);
        result.push_str(&base_shader[pos + SCENE_MARKER.len()..]);
        result
    } else {
        format!("{}\n{}", scene_code, base_shader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{DistanceField, LandMask};
    use crate::globe::GlobeGeometry;
    use crate::node::{Material, Swizzle};
    use std::sync::Arc;

    #[test]
    fn test_simple_sphere() {
        let node = SceneNode::sphere(1.5, Material::Gold);
        let code = WgslGenerator::new().generate_function("map", &node);
        assert!(code.starts_with("fn map(p: vec3<f32>) -> vec2<f32> {"));
        assert!(code.contains("sd_sphere(p, 1.500000, 2.0)"));
    }

    #[test]
    fn test_union_and_subtract() {
        let node = SceneNode::union(
            SceneNode::sphere(1.0, Material::Silver),
            SceneNode::subtract(
                SceneNode::cylinder(0.2, Material::Silver),
                SceneNode::sphere(2.0, Material::Gold),
            ),
        );
        let code = WgslGenerator::new().generate_function("map", &node);
        assert!(code.contains("op_union"));
        assert!(code.contains("op_subtract"));
        assert!(code.contains("sd_cylinder"));
    }

    #[test]
    fn test_domain_ops_chain_positions() {
        let node = SceneNode::sphere(0.8, Material::Silver)
            .translate([47.2, 0.0, 0.0])
            .revolve()
            .swizzle(Swizzle::ZXY)
            .angular_repeat(0.5);
        let code = WgslGenerator::new().generate_function("map", &node);

        // Outermost transform reads `p`, the primitive reads the last one
        assert!(code.contains("let p0 = op_angular_repeat(p, 0.50000000);"));
        assert!(code.contains("let p1 = p0.zxy;"));
        assert!(code.contains("let p2 = op_revolve(p1);"));
        assert!(code.contains("let p3 = p2 - vec3<f32>(47.200001, 0.000000, 0.000000);"));
        assert!(code.contains("sd_sphere(p3,"));
    }

    #[test]
    fn test_globe_module() {
        let mask = LandMask::from_fn(16, 8, |x, _| x < 8).unwrap();
        let field = Arc::new(DistanceField::generate(&mask));
        let globe = GlobeScene::build(GlobeGeometry::default(), field);
        let module = build_globe_module(&globe);

        assert!(module.contains("fn map_grid("));
        assert!(module.contains("fn map_shell("));
        assert!(module.contains("fn map_scene("));
        assert!(module.contains("op_chamfer_subtract(0.150000"));
        assert!(module.contains("sd_field_shell"));
    }

    #[test]
    fn test_inject_scene() {
        let base = "header\n// SCENE_PLACEHOLDER\nfooter";
        let out = inject_scene(base, "fn map_scene() {}");
        assert_eq!(out, "header\nfn map_scene() {}\nfooter");
    }
}
