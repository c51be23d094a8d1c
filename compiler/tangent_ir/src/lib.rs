//! Typed instruction-graph IR for the tangent autodiff compiler.
//!
//! This crate provides:
//!
//! - **Module arena** ([`Module`]): owner of every instruction, block,
//!   function, type and tag. Operand edges and their reverse use lists
//!   are kept in sync by every mutating call.
//!
//! - **Types** ([`TypePool`], [`Idx`], [`TypeKind`]): hash-consed types,
//!   struct definitions with permanent [`FieldKey`]s, and generic
//!   envelopes ([`GenericDef`]) whose parameters are substituted
//!   explicitly.
//!
//! - **Tags** ([`Tag`]): sparse metadata the autodiff passes use to
//!   communicate (differential blocks, stored primal values, keep-alive).
//!
//! - **Utilities**: an instruction [`Builder`], whole-function cloning
//!   ([`clone_function`]), CFG analyses ([`graph`]), a text printer and a
//!   structural verifier ([`verify_function`]).
//!
//! # Design
//!
//! Everything is addressed by 32-bit ids into the module's arenas. Ids
//! are never reused, so a removed instruction is still a valid key for
//! maps built before the removal. The module is single-threaded and
//! passed explicitly; there is no global context.

pub mod builder;
pub mod clone;
pub mod graph;
mod ids;
pub mod inst;
mod module;
mod name;
pub mod print;
pub mod tags;
pub mod types;
pub mod verify;

pub use builder::Builder;
pub use clone::{clone_function, CloneEnv};
pub use ids::{BlockId, FieldKey, FuncId, GenericId, InstId, StructId};
pub use inst::{BinaryOp, CastKind, InstData, Literal, Op, UnaryOp, Use};
pub use module::{BlockData, FuncData, InsertPoint, Module};
pub use name::{Interner, Name};
pub use tags::{Tag, TagKind, TagList, TagTarget};
pub use types::{GenericDef, Idx, StructDef, StructField, TypeKind, TypePool};
pub use verify::{verify_function, VerifyError};

#[cfg(test)]
mod test_helpers;
