//! Function builder.

use crate::block::{BasicBlock, BlockId, CaseLabel};
use crate::cfg::{Cfg, Function};
use crate::decl::{BoundsExpr, Decls, FieldId, VarDecl, VarId, VarKind};
use crate::error::IrError;
use crate::stmt::Stmt;
use crate::terminator::Terminator;

/// Builder for a [`Function`].
///
/// Blocks are created with explicit numbers so that tests can mirror the
/// numbering of a host CFG dump. Unused numbers become null blocks.
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    name: String,
    vars: Vec<VarDecl>,
    fields: Vec<String>,
    blocks: Vec<Option<BasicBlock>>,
    entry: Option<BlockId>,
    exit: Option<BlockId>,
    error: Option<IrError>,
}

impl FunctionBuilder {
    /// Create a builder for function `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn declare(&mut self, name: &str, kind: VarKind, is_param: bool) -> VarId {
        let id = VarId(u32::try_from(self.vars.len()).unwrap_or(u32::MAX));
        self.vars.push(VarDecl {
            id,
            name: name.to_string(),
            kind,
            bounds: None,
            is_param,
        });
        id
    }

    /// Declare a parameter.
    pub fn param(&mut self, name: &str, kind: VarKind) -> VarId {
        self.declare(name, kind, true)
    }

    /// Declare a local variable.
    pub fn local(&mut self, name: &str, kind: VarKind) -> VarId {
        self.declare(name, kind, false)
    }

    /// Attach declared bounds to `var`.
    pub fn bounds(&mut self, var: VarId, bounds: BoundsExpr) -> &mut Self {
        match self.vars.get_mut(var.index()) {
            Some(decl) => decl.bounds = Some(bounds),
            None => self.fail(IrError::UnknownVar(var)),
        }
        self
    }

    /// Declare a struct field name.
    pub fn field(&mut self, name: &str) -> FieldId {
        let id = FieldId(u32::try_from(self.fields.len()).unwrap_or(u32::MAX));
        self.fields.push(name.to_string());
        id
    }

    /// Snapshot of the declarations so far.
    pub fn decls(&self) -> Decls {
        Decls::new(self.vars.clone(), self.fields.clone())
    }

    /// Create block number `number`.
    pub fn block(&mut self, number: u32) -> BlockId {
        let id = BlockId(number);
        let index = id.index();
        if self.blocks.len() <= index {
            self.blocks.resize_with(index + 1, || None);
        }
        if self.blocks[index].is_some() {
            self.fail(IrError::DuplicateBlock(id));
        } else {
            self.blocks[index] = Some(BasicBlock::new(id));
        }
        id
    }

    /// Mark the entry block.
    pub fn entry(&mut self, id: BlockId) -> &mut Self {
        self.entry = Some(id);
        self
    }

    /// Mark the exit block.
    pub fn exit(&mut self, id: BlockId) -> &mut Self {
        self.exit = Some(id);
        self
    }

    /// Append a statement to `block`.
    pub fn push(&mut self, block: BlockId, stmt: Stmt) -> &mut Self {
        if let Some(b) = self.block_mut(block) {
            b.stmts.push(stmt);
        }
        self
    }

    /// Attach a switch label to `block`.
    pub fn label(&mut self, block: BlockId, label: CaseLabel) -> &mut Self {
        if let Some(b) = self.block_mut(block) {
            b.label = Some(label);
        }
        self
    }

    /// Set the terminator of `block`.
    pub fn terminate(&mut self, block: BlockId, terminator: Terminator) -> &mut Self {
        if let Some(b) = self.block_mut(block) {
            b.terminator = terminator;
        }
        self
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        if self.blocks.get(id.index()).and_then(Option::as_ref).is_none() {
            self.fail(IrError::UnknownBlock(id));
            return None;
        }
        self.blocks.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn fail(&mut self, error: IrError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Validate and produce the function.
    pub fn build(self) -> Result<Function, IrError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let entry = self.entry.ok_or(IrError::MissingEntry)?;
        let exit = self.exit.ok_or(IrError::MissingExit)?;
        let mut blocks = self.blocks;
        for id in [entry, exit] {
            if blocks.get(id.index()).and_then(Option::as_ref).is_none() {
                return Err(IrError::UnknownBlock(id));
            }
        }
        if exit >= entry {
            return Err(IrError::ExitAfterEntry { entry, exit });
        }

        if let Some(exit_block) = blocks.get_mut(exit.index()).and_then(Option::as_mut) {
            let terminates = matches!(exit_block.terminator, Terminator::Return | Terminator::Exit);
            if !exit_block.stmts.is_empty() || !terminates {
                return Err(IrError::NonEmptyExit(exit));
            }
            exit_block.terminator = Terminator::Exit;
        }

        for block in blocks.iter().flatten() {
            for target in block.terminator.targets(exit) {
                if blocks.get(target.index()).and_then(Option::as_ref).is_none() {
                    return Err(IrError::UnknownTarget {
                        from: block.id,
                        to: target,
                    });
                }
            }
        }

        Ok(Function {
            name: self.name,
            decls: Decls::new(self.vars, self.fields),
            cfg: Cfg::new(blocks, entry, exit),
        })
    }
}
