//! System V AMD64 calling convention as used by the generated code.

/// Size of a stack slot in bytes.
pub const WORD_SIZE: i64 = 8;

/// Required stack alignment at a `call`, in bytes.
pub const STACK_ALIGNMENT: i64 = 16;

pub const RETURN_REGISTER: &str = "%rax";
pub const STACK_POINTER: &str = "%rsp";
pub const FRAME_POINTER: &str = "%rbp";

/// Registers carrying the first six integer arguments, in order.
pub const ARGUMENT_REGISTERS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

/// Registers a function must preserve for its caller.
pub const CALLEE_SAVED_REGISTERS: [&str; 6] = ["%rbx", "%rbp", "%r12", "%r13", "%r14", "%r15"];

/// Registers a call may overwrite.
pub const CALLER_SAVED_REGISTERS: [&str; 9] = [
    "%rax", "%rcx", "%rdx", "%rsi", "%rdi", "%r8", "%r9", "%r10", "%r11",
];

/// Registers the expression templates only use within one block: each is
/// written before it is read and never carries a value past a label.
pub const SCRATCH_REGISTERS: [&str; 3] = ["%r12", "%r13", "%r15"];

/// Where the callee finds argument `index` after its prologue.
///
/// The first six arrive in registers. The rest sit above the return
/// address, the six saved callee-saved registers and the saved frame
/// pointer.
pub fn parameter_location(index: usize) -> String {
    match ARGUMENT_REGISTERS.get(index) {
        Some(register) => (*register).to_string(),
        None => {
            let saved = CALLEE_SAVED_REGISTERS.len() as i64 + 2;
            let offset = WORD_SIZE * (index as i64 - ARGUMENT_REGISTERS.len() as i64 + saved);
            format!("{offset}({FRAME_POINTER})")
        }
    }
}

/// Number of arguments passed on the stack for a call with `arity`
/// arguments.
pub fn stack_argument_count(arity: usize) -> usize {
    arity.saturating_sub(ARGUMENT_REGISTERS.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_locations() {
        assert_eq!(parameter_location(0), "%rdi");
        assert_eq!(parameter_location(5), "%r9");
        assert_eq!(parameter_location(6), "64(%rbp)");
        assert_eq!(parameter_location(7), "72(%rbp)");
    }

    #[test]
    fn stack_arguments() {
        assert_eq!(stack_argument_count(0), 0);
        assert_eq!(stack_argument_count(6), 0);
        assert_eq!(stack_argument_count(8), 2);
    }
}
