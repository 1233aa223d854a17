//! WGSL sources for the accelerated SYMM kernel.
//!
//! The kernel body is written once against an `Elem` alias; a short prelude per
//! element type supplies the alias and the element arithmetic.

pub mod compute {
    pub const SYMM_BODY: &str = include_str!("kernels/symm.wgsl");
    pub const SYMM_ENTRY_POINT: &str = "symm_main";
    /// Invocations per workgroup along (row, column) of C.
    pub const WORKGROUP_SIZE: (u32, u32) = (8, 8);
}

/// Floating-point width of one scalar component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    F32,
    F64,
}

impl Precision {
    fn wgsl(self) -> &'static str {
        match self {
            Precision::F32 => "f32",
            Precision::F64 => "f64",
        }
    }
}

/// Prelude defining `Elem`, `elem_zero`, `elem_mul` and `elem_is_zero`.
pub fn element_prelude(precision: Precision, complex: bool) -> String {
    let scalar = precision.wgsl();
    if complex {
        format!(
            "alias Elem = vec2<{scalar}>;\n\
             \n\
             fn elem_zero() -> Elem {{\n\
             \x20   return vec2<{scalar}>();\n\
             }}\n\
             \n\
             fn elem_mul(x: Elem, y: Elem) -> Elem {{\n\
             \x20   return vec2<{scalar}>(x.x * y.x - x.y * y.y, x.x * y.y + x.y * y.x);\n\
             }}\n\
             \n\
             fn elem_is_zero(x: Elem) -> bool {{\n\
             \x20   return all(x == elem_zero());\n\
             }}\n\n"
        )
    } else {
        format!(
            "alias Elem = {scalar};\n\
             \n\
             fn elem_zero() -> Elem {{\n\
             \x20   return {scalar}();\n\
             }}\n\
             \n\
             fn elem_mul(x: Elem, y: Elem) -> Elem {{\n\
             \x20   return x * y;\n\
             }}\n\
             \n\
             fn elem_is_zero(x: Elem) -> bool {{\n\
             \x20   return x == elem_zero();\n\
             }}\n\n"
        )
    }
}

/// Complete SYMM shader module for one element type.
pub fn symm_source(precision: Precision, complex: bool) -> String {
    let mut source = element_prelude(precision, complex);
    source.push_str(compute::SYMM_BODY);
    source
}
