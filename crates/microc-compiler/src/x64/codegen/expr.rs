//! Expression lowering.
//!
//! Each template pops its operands, computes into a fixed register and
//! pushes the result. The right operand is always on top of the stack.

use microc_core::{CodegenError, CodegenErrorKind, Type};
use microc_parser::ast::{BinaryOp, BinaryOpExpr, Expr, FuncCallExpr, UnaryOp, UnaryOpExpr};

use super::{CodeGenerator, imm, unsupported};
use crate::x64::abi::{ARGUMENT_REGISTERS, RETURN_REGISTER, stack_argument_count};
use crate::x64::module::{Instruction, Opcode};
use crate::x64::operand::fits_imm32;

impl CodeGenerator<'_> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn visit_expr(&mut self, expr: &Expr<'_>) -> Result<(), CodegenError> {
        if !matches!(
            expr,
            Expr::FloatLiteral(_) | Expr::StringLiteral(_) | Expr::ArrayRef(_)
        ) {
            match self.type_of(expr.id())? {
                Type::Int | Type::Void => {}
                other => return Err(unsupported(format!("{other} values"), expr.span())),
            }
        }

        match expr {
            Expr::FloatLiteral(lit) => Err(unsupported("float literals", lit.span)),
            Expr::StringLiteral(lit) => Err(unsupported("string literals", lit.span)),
            Expr::ArrayRef(array) => Err(unsupported("array references", array.span)),
            Expr::IntLiteral(lit) => {
                if fits_imm32(lit.value) {
                    self.push(imm(lit.value), "Push integer literal");
                } else {
                    self.emit(
                        Opcode::Movq,
                        [imm(lit.value), RETURN_REGISTER.to_string()],
                        "Load wide integer literal",
                    );
                    self.push(RETURN_REGISTER, "Push integer literal");
                }
                Ok(())
            }
            Expr::VarRef(var) => {
                let slot = self.variable(var.id, &var.name)?;
                self.push(slot, "Push variable value");
                Ok(())
            }
            Expr::Binary(binary) => self.visit_binary(binary),
            Expr::Unary(unary) => self.visit_unary(unary),
            Expr::FuncCall(call) => self.visit_call(call),
        }
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    fn visit_binary(&mut self, binary: &BinaryOpExpr<'_>) -> Result<(), CodegenError> {
        if binary.op == BinaryOp::Assign {
            return self.visit_assign(binary);
        }

        self.visit_expr(&binary.lhs)?;
        self.visit_expr(&binary.rhs)?;

        match binary.op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                let opcode = match binary.op {
                    BinaryOp::Add => Opcode::Addq,
                    BinaryOp::Sub => Opcode::Subq,
                    _ => Opcode::Imulq,
                };
                self.pop("%r13", "Pop right operand");
                self.pop("%r15", "Pop left operand");
                self.emit(opcode, ["%r13", "%r15"], format!("Compute '{}'", binary.op));
                self.push("%r15", "Push result");
            }
            BinaryOp::Div | BinaryOp::Mod => {
                self.pop("%r13", "Pop divisor");
                self.pop(RETURN_REGISTER, "Pop dividend");
                self.module.push(
                    Instruction::bare(Opcode::Cqto).with_comment("Sign-extend dividend into %rdx"),
                );
                self.emit(Opcode::Idivq, ["%r13"], format!("Compute '{}'", binary.op));
                let result = if binary.op == BinaryOp::Div { RETURN_REGISTER } else { "%rdx" };
                self.push(result, "Push result");
            }
            BinaryOp::Pow => self.emit_pow(),
            op => {
                let cmov = comparison_opcode(op);
                self.pop(RETURN_REGISTER, "Pop right operand");
                self.pop("%r15", "Pop left operand");
                self.emit(Opcode::Movq, ["$0", "%r12"], "Assume false");
                self.emit(Opcode::Movq, ["$1", "%r13"], "");
                self.emit(Opcode::Cmpq, [RETURN_REGISTER, "%r15"], format!("Compare '{op}'"));
                self.emit(cmov, ["%r13", "%r12"], "Select true when the comparison holds");
                self.push("%r12", "Push truth value");
            }
        }
        Ok(())
    }

    fn visit_assign(&mut self, binary: &BinaryOpExpr<'_>) -> Result<(), CodegenError> {
        let Expr::VarRef(target) = &binary.lhs else {
            return Err(CodegenError::at(
                CodegenErrorKind::InvalidAssignmentTarget,
                binary.lhs.span(),
            ));
        };
        let slot = self.variable(target.id, &target.name)?;

        // The assigned value stays on the stack as the expression's value.
        self.visit_expr(&binary.rhs)?;
        self.emit(Opcode::Movq, ["(%rsp)", RETURN_REGISTER], "Peek assigned value");
        self.emit(
            Opcode::Movq,
            [RETURN_REGISTER.to_string(), slot],
            format!("Store into '{}'", target.name),
        );
        Ok(())
    }

    /// `base ^ exponent` by repeated multiplication; a non-positive exponent
    /// yields 1.
    fn emit_pow(&mut self) {
        let loop_label = self.label("pow_loop");
        let end_label = self.label("pow_end");

        self.pop("%rcx", "Pop exponent");
        self.pop("%rbx", "Pop base");
        self.emit(Opcode::Movq, ["$1", RETURN_REGISTER], "Start from 1");

        self.start_block(&loop_label, "Power loop");
        self.emit(Opcode::Cmpq, ["$0", "%rcx"], "");
        self.emit(Opcode::Jle, [end_label.as_str()], "Exponent exhausted");
        self.emit(Opcode::Imulq, ["%rbx", RETURN_REGISTER], "");
        self.emit(Opcode::Subq, ["$1", "%rcx"], "");
        self.emit(Opcode::Jmp, [loop_label.as_str()], "");

        self.start_block(&end_label, "End of power loop");
        self.push(RETURN_REGISTER, "Push result");
    }

    fn visit_unary(&mut self, unary: &UnaryOpExpr<'_>) -> Result<(), CodegenError> {
        self.visit_expr(&unary.operand)?;
        match unary.op {
            UnaryOp::Plus => {}
            UnaryOp::Neg => {
                self.pop(RETURN_REGISTER, "Pop operand");
                self.emit(Opcode::Negq, [RETURN_REGISTER], "Negate");
                self.push(RETURN_REGISTER, "Push result");
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    fn visit_call(&mut self, call: &FuncCallExpr<'_>) -> Result<(), CodegenError> {
        let name = call.name.name;
        if !self.functions.contains(name) {
            return Err(CodegenError::missing("function", call.id));
        }

        let arity = call.args.len();
        let on_stack = stack_argument_count(arity) as u32;
        // rsp must be 16-byte aligned at the call, once the stack arguments
        // are in place.
        let padding = (self.frame.depth() + on_stack) % 2;
        if padding == 1 {
            self.adjust_stack(-1, "Align stack for call");
            self.frame.push_temps(1);
        }

        for arg in call.args.iter().rev() {
            self.visit_expr(arg)?;
        }
        for register in ARGUMENT_REGISTERS.iter().take(arity) {
            self.pop(*register, "Pop argument into register");
        }

        self.emit(Opcode::Call, [name], format!("Call '{name}'"));

        let cleanup = on_stack + padding;
        if cleanup > 0 {
            self.adjust_stack(i64::from(cleanup), "Drop stack arguments");
            self.frame.pop_temps(cleanup);
        }
        self.push(RETURN_REGISTER, "Push return value");
        Ok(())
    }
}

/// Conditional move selecting the true value after `cmpq rhs, lhs`.
fn comparison_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Equal => Opcode::Cmove,
        BinaryOp::NotEqual => Opcode::Cmovne,
        BinaryOp::Less => Opcode::Cmovl,
        BinaryOp::LessEqual => Opcode::Cmovle,
        BinaryOp::Greater => Opcode::Cmovg,
        _ => Opcode::Cmovge,
    }
}

#[cfg(test)]
mod tests {
    use crate::x64::codegen::tests::generate;
    use crate::x64::module::{Instruction, Module, Opcode};

    /// Instructions of `main` after the prologue, up to the jump to the exit.
    fn body(module: &Module) -> Vec<&Instruction> {
        module
            .block("main")
            .unwrap()
            .instructions
            .iter()
            .skip(8)
            .take_while(|ins| ins.opcode != Opcode::Jmp)
            .collect()
    }

    fn listing(instructions: &[&Instruction]) -> Vec<String> {
        instructions
            .iter()
            .map(|ins| format!("{} {}", ins.opcode, ins.operands.join(", ")).trim_end().to_string())
            .collect()
    }

    #[test]
    fn subtraction_keeps_operand_order() {
        let module = generate("int main() { return 7 - 2; }").unwrap();
        assert_eq!(
            listing(&body(&module)),
            [
                "pushq $7",
                "pushq $2",
                "popq %r13",
                "popq %r15",
                "subq %r13, %r15",
                "pushq %r15",
                "popq %rax",
            ]
        );
    }

    #[test]
    fn division_and_modulo() {
        let module = generate("int main() { return 7 % 2; }").unwrap();
        let text = listing(&body(&module));
        assert_eq!(text[2..7], ["popq %r13", "popq %rax", "cqto", "idivq %r13", "pushq %rdx"]);

        let module = generate("int main() { return 7 / 2; }").unwrap();
        assert_eq!(listing(&body(&module))[6], "pushq %rax");
    }

    #[test]
    fn comparisons_select_with_cmov() {
        let cases = [
            ("==", "cmove"),
            ("!=", "cmovne"),
            ("<", "cmovl"),
            ("<=", "cmovle"),
            (">", "cmovg"),
            (">=", "cmovge"),
        ];
        for (op, cmov) in cases {
            let module = generate(&format!("int main() {{ return 1 {op} 2; }}")).unwrap();
            let text = listing(&body(&module));
            assert_eq!(text[2], "popq %rax");
            assert_eq!(text[3], "popq %r15");
            assert_eq!(text[6], "cmpq %rax, %r15");
            assert_eq!(text[7], format!("{cmov} %r13, %r12"), "operator {op}");
            assert_eq!(text[8], "pushq %r12");
        }
    }

    #[test]
    fn assignment_leaves_its_value() {
        let module = generate("int main() { int x; x = 5; return 0; }").unwrap();
        let text = listing(&body(&module));
        assert_eq!(
            text[2..6],
            ["pushq $5", "movq (%rsp), %rax", "movq %rax, -8(%rbp)", "popq %rax"]
        );
    }

    #[test]
    fn wide_literals_go_through_rax() {
        let module = generate("int main() { return 10000000000; }").unwrap();
        let text = listing(&body(&module));
        assert_eq!(text[..2], ["movq $10000000000, %rax", "pushq %rax"]);
    }

    #[test]
    fn negation() {
        let module = generate("int main() { return -3; }").unwrap();
        let text = listing(&body(&module));
        assert_eq!(text[..4], ["pushq $3", "popq %rax", "negq %rax", "pushq %rax"]);

        let module = generate("int main() { return +3; }").unwrap();
        assert_eq!(listing(&body(&module))[..2], ["pushq $3", "popq %rax"]);
    }

    #[test]
    fn power_uses_a_loop() {
        let module = generate("int main() { return 2 ^ 10; }").unwrap();
        let looped = module.block(".L0_pow_loop").unwrap();
        assert_eq!(looped.instructions[1].opcode, Opcode::Jle);
        assert_eq!(looped.instructions[1].operands, [".L1_pow_end"]);
        assert_eq!(looped.instructions.last().unwrap().operands, [".L0_pow_loop"]);

        let end = module.block(".L1_pow_end").unwrap();
        assert_eq!(end.instructions[0].operands, ["%rax"]);
    }

    #[test]
    fn call_arguments_fill_registers_in_order() {
        let module = generate("int f(int a, int b) { return a; }\nint main() { return f(1, 2); }").unwrap();
        let text = listing(&body(&module));
        assert_eq!(
            text[..6],
            ["pushq $2", "pushq $1", "popq %rdi", "popq %rsi", "call f", "pushq %rax"]
        );
    }

    #[test]
    fn calls_are_aligned() {
        // One local: depth 1 + pad = aligned, so no call padding.
        let module = generate("int main() { int x = 1; print(x); return 0; }").unwrap();
        assert!(!module.to_string().contains("Align stack for call"));

        // A pending temporary forces padding.
        let module = generate("int main() { return 1 + read(); }").unwrap();
        let text = listing(&body(&module));
        assert_eq!(text[..4], ["pushq $1", "subq $8, %rsp", "call read", "addq $8, %rsp"]);

        // Two stack arguments keep an aligned frame aligned.
        let module = generate("int main() { return sum8(1, 2, 3, 4, 5, 6, 7, 8); }").unwrap();
        let text = listing(&body(&module));
        assert_eq!(text[0], "pushq $8");
        assert!(text.contains(&"addq $16, %rsp".to_string()));
    }

    #[test]
    fn unsupported_expressions() {
        let err = generate("int main() { int xs[2]; return xs[0]; }").unwrap_err();
        assert_eq!(err.to_string(), "Array declarations not supported by this code generator");

        let err = generate("int main() { print_f(read_f()); return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "Float values not supported by this code generator");
    }
}
