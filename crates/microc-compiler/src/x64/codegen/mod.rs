//! Direct x86-64 code generation.
//!
//! Lowers a type-checked [`Program`] to a [`Module`] using a stack machine
//! model: every expression leaves exactly one word on top of the runtime
//! stack and every statement leaves the stack as it found it. Operator
//! templates pop their operands into fixed registers, so no register
//! allocator is needed.
//!
//! Only the integer subset is supported. Float and string values and arrays
//! are rejected with [`CodegenErrorKind::Unsupported`].
//!
//! # Layout
//!
//! Each function becomes an entry block, named and exported after the
//! function, followed by the blocks its control flow needs and a single exit
//! block `.<name>.exit` holding the epilogue. `return` jumps to the exit
//! block; falling off the end of the body returns zero.
//!
//! [`CodegenErrorKind::Unsupported`]: microc_core::CodegenErrorKind::Unsupported

mod expr;
mod stmt;

use log::debug;
use microc_core::{CodegenError, CodegenErrorKind, NodeId, Span, Type};
use microc_parser::ast::{FuncDecl, Ident, Program};

use crate::sema::{Analysis, FunctionTable, SymbolTable, TypeTable};
use crate::x64::abi::{
    CALLEE_SAVED_REGISTERS, FRAME_POINTER, RETURN_REGISTER, STACK_POINTER, WORD_SIZE,
    parameter_location,
};
use crate::x64::frame::Frame;
use crate::x64::module::{BasicBlock, Instruction, Module, Opcode};

/// Generates a [`Module`] from a program and its semantic tables.
pub struct CodeGenerator<'a> {
    functions: &'a FunctionTable,
    symbols: &'a SymbolTable,
    types: &'a TypeTable,
    module: Module,
    frame: Frame,
    /// Source of unique label numbers across the whole module.
    labels: u32,
    /// Exit block of the function being generated.
    function_exit: String,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(functions: &'a FunctionTable, symbols: &'a SymbolTable, types: &'a TypeTable) -> Self {
        Self {
            functions,
            symbols,
            types,
            module: Module::new(),
            frame: Frame::new(),
            labels: 0,
            function_exit: String::new(),
        }
    }

    /// Generator over the tables of a completed [`Analysis`].
    pub fn from_analysis(analysis: &'a Analysis) -> Self {
        Self::new(&analysis.functions, &analysis.symbols, &analysis.types)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn generate(mut self, program: &Program<'_>) -> Result<Module, CodegenError> {
        for func in program.functions {
            self.visit_function(func)?;
        }
        debug!(
            "generated {} blocks, {} instructions",
            self.module.blocks.len(),
            self.module.instruction_count()
        );
        Ok(self.module)
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    fn visit_function(&mut self, func: &FuncDecl<'_>) -> Result<(), CodegenError> {
        let name = func.name.name;
        self.frame = Frame::new();
        self.function_exit = format!(".{name}.exit");

        self.module.push_block(
            BasicBlock::new(name)
                .with_comment(format!("Entry point of function '{name}'"))
                .global(),
        );

        for register in CALLEE_SAVED_REGISTERS.iter().rev() {
            self.emit(Opcode::Pushq, [*register], "Save callee-saved register");
        }
        self.emit(Opcode::Pushq, [FRAME_POINTER], "Save caller frame pointer");
        self.emit(Opcode::Movq, [STACK_POINTER, FRAME_POINTER], "Set up frame pointer");

        for (index, param) in func.params.iter().enumerate() {
            self.expect_int_declaration(param.id, &param.name, "parameters")?;
            self.emit(
                Opcode::Pushq,
                [parameter_location(index)],
                format!("Spill parameter '{}'", param.name),
            );
            self.frame.declare(param.id);
        }
        self.align_frame();

        self.visit_compound(&func.body)?;
        self.emit(Opcode::Movq, ["$0", RETURN_REGISTER], "Implicit return value");

        let exit = std::mem::take(&mut self.function_exit);
        self.module.push_block(
            BasicBlock::new(exit).with_comment(format!("Exit point of function '{name}'")),
        );
        self.emit(Opcode::Movq, [FRAME_POINTER, STACK_POINTER], "Discard frame");
        self.emit(Opcode::Popq, [FRAME_POINTER], "Restore caller frame pointer");
        for register in CALLEE_SAVED_REGISTERS {
            self.emit(Opcode::Popq, [register], "Restore callee-saved register");
        }
        self.module.push(Instruction::bare(Opcode::Retq).with_comment("Return to caller"));
        Ok(())
    }

    /// Add a padding word if the variable slots leave the stack misaligned.
    fn align_frame(&mut self) {
        if !self.frame.is_aligned() {
            self.emit(
                Opcode::Subq,
                [imm(WORD_SIZE), STACK_POINTER.to_string()],
                "Pad frame to 16 bytes",
            );
            self.frame.set_padded(true);
        }
    }

    // ==========================================================================
    // Emission helpers
    // ==========================================================================

    fn emit<I, S>(&mut self, opcode: Opcode, operands: I, comment: impl Into<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module
            .push(Instruction::new(opcode, operands).with_comment(comment));
    }

    /// `pushq` one expression temporary.
    fn push(&mut self, operand: impl Into<String>, comment: &str) {
        self.emit(Opcode::Pushq, [operand.into()], comment);
        self.frame.push_temps(1);
    }

    /// `popq` one expression temporary into `register`.
    fn pop(&mut self, register: &str, comment: &str) {
        self.emit(Opcode::Popq, [register], comment);
        self.frame.pop_temps(1);
    }

    /// Move the stack pointer by `words`, downwards when negative.
    fn adjust_stack(&mut self, words: i64, comment: &str) {
        match words {
            0 => {}
            w if w > 0 => self.emit(
                Opcode::Addq,
                [imm(w * WORD_SIZE), STACK_POINTER.to_string()],
                comment,
            ),
            w => self.emit(
                Opcode::Subq,
                [imm(-w * WORD_SIZE), STACK_POINTER.to_string()],
                comment,
            ),
        }
    }

    fn start_block(&mut self, name: &str, comment: &str) {
        self.module
            .push_block(BasicBlock::new(name).with_comment(comment));
    }

    /// A fresh, module-unique label.
    fn label(&mut self, suffix: &str) -> String {
        let label = format!(".L{}_{suffix}", self.labels);
        self.labels += 1;
        label
    }

    // ==========================================================================
    // Table lookups
    // ==========================================================================

    fn type_of(&self, node: NodeId) -> Result<Type, CodegenError> {
        self.types
            .get(node)
            .ok_or_else(|| CodegenError::missing("type", node))
    }

    /// Frame operand of the variable a use resolves to.
    fn variable(&self, use_site: NodeId, name: &Ident<'_>) -> Result<String, CodegenError> {
        let decl = self
            .symbols
            .get(use_site)
            .ok_or_else(|| CodegenError::missing("symbol", use_site))?;
        let offset = self.frame.offset(decl).ok_or_else(|| {
            CodegenError::at(
                CodegenErrorKind::UnallocatedVariable {
                    name: name.name.to_string(),
                },
                name.span,
            )
        })?;
        Ok(format!("{offset}({FRAME_POINTER})"))
    }

    /// Declarations must be `int`; `what` names the construct in the error.
    fn expect_int_declaration(
        &self,
        decl: NodeId,
        name: &Ident<'_>,
        what: &str,
    ) -> Result<(), CodegenError> {
        match self.type_of(decl)? {
            Type::Int => Ok(()),
            other => Err(unsupported(format!("{other} {what}"), name.span)),
        }
    }
}

/// `$value`
fn imm(value: i64) -> String {
    format!("${value}")
}

fn unsupported(what: impl Into<String>, span: Span) -> CodegenError {
    CodegenError::unsupported(capitalise(&what.into()), span)
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::SemanticAnalyzer;
    use bumpalo::Bump;
    use microc_parser::Parser;

    pub(super) fn generate(source: &str) -> Result<Module, CodegenError> {
        let arena = Bump::new();
        let program = Parser::parse(source, &arena).unwrap();
        let analysis = SemanticAnalyzer::new().analyze(&program).unwrap();
        CodeGenerator::from_analysis(&analysis).generate(&program)
    }

    fn opcodes(block: &BasicBlock) -> Vec<&str> {
        block.instructions.iter().map(|i| i.opcode.as_str()).collect()
    }

    #[test]
    fn prologue_and_epilogue() {
        let module = generate("int main() { return 0; }").unwrap();
        let entry = module.block("main").unwrap();
        assert!(entry.is_global);
        assert_eq!(entry.comment.as_deref(), Some("Entry point of function 'main'"));

        let saved: Vec<&str> = entry.instructions[..6].iter().map(|i| i.operand(0)).collect();
        assert_eq!(saved, ["%r15", "%r14", "%r13", "%r12", "%rbp", "%rbx"]);
        assert_eq!(entry.instructions[6].operands, ["%rbp"]);
        assert_eq!(entry.instructions[7].operands, ["%rsp", "%rbp"]);

        let exit = module.block(".main.exit").unwrap();
        assert_eq!(
            opcodes(exit),
            ["movq", "popq", "popq", "popq", "popq", "popq", "popq", "popq", "retq"]
        );
        let restored: Vec<&str> = exit.instructions[2..8].iter().map(|i| i.operand(0)).collect();
        assert_eq!(restored, ["%rbx", "%rbp", "%r12", "%r13", "%r14", "%r15"]);
    }

    #[test]
    fn parameters_are_spilled_and_padded() {
        let module = generate("int f(int a, int b, int c) { return c; }").unwrap();
        let text = module.to_string();
        assert!(text.contains("pushq       %rdi"));
        assert!(text.contains("pushq       %rdx"));
        assert!(text.contains("subq        $8, %rsp"));
        assert!(text.contains("pushq       -24(%rbp)"));
    }

    #[test]
    fn stack_parameters_come_from_the_caller_frame() {
        let params: Vec<String> = (0..8).map(|i| format!("int p{i}")).collect();
        let source = format!("int f({}) {{ return p7; }}", params.join(", "));
        let text = generate(&source).unwrap().to_string();
        assert!(text.contains("pushq       64(%rbp)"));
        assert!(text.contains("pushq       72(%rbp)"));
        assert!(text.contains("pushq       -64(%rbp)"));
    }

    #[test]
    fn labels_are_unique_across_functions() {
        let source = "int a(int x) { if (x) return 1; return 0; }\nint b(int x) { while (x) x = x - 1; return x; }";
        let module = generate(source).unwrap();
        let names: Vec<&str> = module.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "a",
                ".L0_then",
                ".L1_endif",
                ".a.exit",
                "b",
                ".L2_while_cond",
                ".L3_while_body",
                ".L4_while_end",
                ".b.exit"
            ]
        );
    }

    #[test]
    fn implicit_return_is_zero() {
        let module = generate("void main() { print(1); }").unwrap();
        let entry = module.block("main").unwrap();
        let last = entry.instructions.last().unwrap();
        assert_eq!(last.operands, ["$0", "%rax"]);
    }

    #[test]
    fn unsupported_constructs() {
        let err = generate("int main() { float f = 1.5; return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "Float variables not supported by this code generator");

        let err = generate("int main() { print_f(1.5); return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "Float literals not supported by this code generator");

        let err = generate("int main() { print_s(\"hi\"); return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "String literals not supported by this code generator");

        let err = generate("int main() { int xs[4]; return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "Array declarations not supported by this code generator");

        let err = generate("float f(float x) { return x; }").unwrap_err();
        assert_eq!(err.to_string(), "Float parameters not supported by this code generator");
    }

    #[test]
    fn assignment_target_must_be_a_variable() {
        let err = generate("int main() { int x; (x) = 1; return 0; }");
        // A parenthesised name is still a plain reference.
        assert!(err.is_ok());

        let err = generate("int main() { int x; x + 1 = 2; return 0; }").unwrap_err();
        assert_eq!(err.kind, CodegenErrorKind::InvalidAssignmentTarget);
    }
}
