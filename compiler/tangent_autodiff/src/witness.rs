//! Differentiable-type lookup.
//!
//! The context builder asks this seam whether a field type has a
//! differential counterpart, and records the answer on the field for the
//! pass that later builds the differential function.

use rustc_hash::FxHashMap;

use tangent_ir::{Idx, StructId, TypeKind, TypePool};

/// Answers "what is the differential type of `ty`", if it has one.
pub trait DifferentiableWitness {
    /// Differential type of `ty`, or `None` if `ty` is not differentiable.
    ///
    /// May intern new types into `pool`.
    fn differential_witness(&self, pool: &mut TypePool, ty: Idx) -> Option<Idx>;
}

/// Built-in differentiability rules.
///
/// - `float` is its own differential.
/// - Vectors, matrices and arrays are differentiable when their element
///   type is, with the element replaced by its differential.
/// - Structs are differentiable only when registered, and keep their
///   type arguments.
#[derive(Default, Debug)]
pub struct BuiltinWitness {
    structs: FxHashMap<StructId, StructId>,
}

impl BuiltinWitness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `differential` as the differential struct of `primal`.
    pub fn register(&mut self, primal: StructId, differential: StructId) {
        self.structs.insert(primal, differential);
    }
}

impl DifferentiableWitness for BuiltinWitness {
    fn differential_witness(&self, pool: &mut TypePool, ty: Idx) -> Option<Idx> {
        match pool.kind(ty).clone() {
            TypeKind::Float => Some(Idx::FLOAT),
            TypeKind::Vector { elem, count } => {
                let elem = self.differential_witness(pool, elem)?;
                Some(pool.vector(elem, count))
            }
            TypeKind::Matrix { elem, rows, cols } => {
                let elem = self.differential_witness(pool, elem)?;
                Some(pool.matrix(elem, rows, cols))
            }
            TypeKind::Array { elem, len } => {
                let elem = self.differential_witness(pool, elem)?;
                Some(pool.array(elem, len))
            }
            TypeKind::Struct { def, args } => {
                let diff = *self.structs.get(&def)?;
                Some(pool.struct_type(diff, args))
            }
            _ => None,
        }
    }
}
