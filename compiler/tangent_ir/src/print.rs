//! Textual rendering of functions and types.
//!
//! Output is for logs and test diagnostics only; there is no parser.
//!
//! ```text
//! fn @f0 square(float) -> float {
//! bb0:
//!   %1: float = param
//!   jump bb1
//! bb1:
//!   %3: float = mul %1, %1 !key3
//!   return %3
//! }
//! ```

use std::fmt::{self, Write as _};

use crate::ids::{FuncId, InstId};
use crate::inst::{Literal, Op};
use crate::module::Module;
use crate::tags::Tag;
use crate::types::{Idx, TypeKind};

/// Display adapter returned by [`Module::display_func`].
pub struct FuncDisplay<'a> {
    module: &'a Module,
    func: FuncId,
}

/// Display adapter returned by [`Module::display_type`].
pub struct TypeDisplay<'a> {
    module: &'a Module,
    ty: Idx,
}

impl Module {
    pub fn display_func(&self, func: FuncId) -> FuncDisplay<'_> {
        FuncDisplay { module: self, func }
    }

    pub fn display_type(&self, ty: Idx) -> TypeDisplay<'_> {
        TypeDisplay { module: self, ty }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self.module, self.ty)
    }
}

fn write_type_list(f: &mut dyn fmt::Write, module: &Module, types: &[Idx]) -> fmt::Result {
    for (i, &ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_type(f, module, ty)?;
    }
    Ok(())
}

fn write_type(f: &mut dyn fmt::Write, module: &Module, ty: Idx) -> fmt::Result {
    let pool = &module.types;
    match pool.kind(ty) {
        TypeKind::Void => f.write_str("void"),
        TypeKind::Bool => f.write_str("bool"),
        TypeKind::Int => f.write_str("int"),
        TypeKind::Float => f.write_str("float"),
        TypeKind::Vector { elem, count } => {
            f.write_str("vector<")?;
            write_type(f, module, *elem)?;
            write!(f, ", {count}>")
        }
        TypeKind::Matrix { elem, rows, cols } => {
            f.write_str("matrix<")?;
            write_type(f, module, *elem)?;
            write!(f, ", {rows}, {cols}>")
        }
        TypeKind::Array { elem, len } => {
            f.write_char('[')?;
            write_type(f, module, *elem)?;
            write!(f, "; {len}]")
        }
        TypeKind::Ptr(inner) => {
            f.write_str("ptr ")?;
            write_type(f, module, *inner)
        }
        TypeKind::InOut(inner) => {
            f.write_str("inout ")?;
            write_type(f, module, *inner)
        }
        TypeKind::Optional(inner) => {
            write_type(f, module, *inner)?;
            f.write_char('?')
        }
        TypeKind::Tuple(elems) => {
            f.write_char('(')?;
            write_type_list(f, module, elems)?;
            f.write_char(')')
        }
        TypeKind::DiffPair(inner) => {
            f.write_str("diff_pair<")?;
            write_type(f, module, *inner)?;
            f.write_char('>')
        }
        TypeKind::Struct { def, args } => {
            match pool.struct_def(*def).name {
                Some(name) => f.write_str(module.name_str(name))?,
                None => write!(f, "{def}")?,
            }
            if !args.is_empty() {
                f.write_char('<')?;
                write_type_list(f, module, args)?;
                f.write_char('>')?;
            }
            Ok(())
        }
        TypeKind::Param { generic, index } => {
            let name = pool
                .generic(*generic)
                .params
                .get(*index as usize)
                .map(|&n| module.name_str(n));
            match name {
                Some(name) if !name.is_empty() => f.write_str(name),
                _ => write!(f, "{generic}.{index}"),
            }
        }
        TypeKind::Func { params, result } => {
            f.write_str("fn(")?;
            write_type_list(f, module, params)?;
            f.write_str(") -> ")?;
            write_type(f, module, *result)
        }
        TypeKind::IntermediateContext { func, args } => {
            write!(f, "intermediates({func}")?;
            if !args.is_empty() {
                f.write_str("; ")?;
                write_type_list(f, module, args)?;
            }
            f.write_char(')')
        }
        TypeKind::Existential(name) => write!(f, "dyn {}", module.name_str(*name)),
        TypeKind::Opaque(name) => write!(f, "opaque {}", module.name_str(*name)),
    }
}

fn write_payload(f: &mut fmt::Formatter<'_>, op: &Op) -> fmt::Result {
    match op {
        Op::Literal(Literal::Int(v)) => write!(f, " {v}"),
        Op::Literal(Literal::Float(bits)) => write!(f, " {:?}", f64::from_bits(*bits)),
        Op::Literal(Literal::Bool(v)) => write!(f, " {v}"),
        Op::Call(callee) => write!(f, " {callee}"),
        Op::FieldAddress(key) | Op::FieldExtract(key) => write!(f, " {key}"),
        Op::Swizzle(lanes) => write!(f, " {lanes:?}"),
        Op::Cast(kind) => write!(f, " {kind:?}"),
        Op::Jump(target) => write!(f, " {target}"),
        Op::Branch {
            then_block,
            else_block,
        } => write!(f, " {then_block}, {else_block}"),
        _ => Ok(()),
    }
}

fn write_tags(f: &mut fmt::Formatter<'_>, module: &Module, tags: &[Tag]) -> fmt::Result {
    for tag in tags {
        match tag {
            Tag::NameHint(name) => write!(f, " !name({})", module.name_str(*name))?,
            Tag::Differential => f.write_str(" !diff")?,
            Tag::MixedDifferential => f.write_str(" !mixed")?,
            Tag::KeepAlive => f.write_str(" !keep")?,
            Tag::PrimalValueKey(key) => write!(f, " !{key}")?,
            Tag::PrimalContext => f.write_str(" !primal_context")?,
            Tag::PrimalReturn(value) => write!(f, " !primal_return({value})")?,
        }
    }
    Ok(())
}

impl FuncDisplay<'_> {
    fn write_inst(&self, f: &mut fmt::Formatter<'_>, inst: InstId) -> fmt::Result {
        let module = self.module;
        let op = module.op(inst);
        f.write_str("  ")?;
        if let Some(ty) = module.ty(inst) {
            write!(f, "{inst}: ")?;
            write_type(f, module, ty)?;
            f.write_str(" = ")?;
        }
        f.write_str(op.mnemonic())?;
        write_payload(f, op)?;
        let operands = module.operands(inst);
        if !operands.is_empty() {
            let sep = if matches!(op, Op::Jump(_)) {
                " ("
            } else {
                " "
            };
            f.write_str(sep)?;
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{operand}")?;
            }
            if sep == " (" {
                f.write_char(')')?;
            }
        }
        write_tags(f, module, module.tags(inst))?;
        f.write_char('\n')
    }
}

impl fmt::Display for FuncDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.module;
        let data = module.func(self.func);
        write!(f, "fn {}", self.func)?;
        if let Some(name) = module.func_name(self.func) {
            write!(f, " {name}")?;
        }
        match module.types.func_signature(data.ty) {
            Some((params, result)) => {
                f.write_char('(')?;
                write_type_list(f, module, params)?;
                f.write_str(") -> ")?;
                write_type(f, module, result)?;
            }
            None => {
                f.write_str(": ")?;
                write_type(f, module, data.ty)?;
            }
        }
        if let Some(generic) = data.generic {
            write!(f, " in {generic}")?;
        }
        f.write_str(" {\n")?;
        for &block in module.func_blocks(self.func) {
            write!(f, "{block}:")?;
            write_tags(f, module, module.tags(block))?;
            f.write_char('\n')?;
            for &inst in module.block_insts(block) {
                self.write_inst(f, inst)?;
            }
        }
        f.write_str("}\n")
    }
}
