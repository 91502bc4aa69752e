//! The three lookup tables produced by semantic analysis.
//!
//! - [`FunctionTable`]: function name to [`FunctionSignature`]
//! - [`SymbolTable`]: variable use node to declaration node
//! - [`TypeTable`]: expression or declaration node to [`Type`]
//!
//! Each table is filled by exactly one pass and only read afterwards.

use std::fmt;

use microc_core::{NodeId, SemanticError, SemanticErrorKind, Span, Type};
use rustc_hash::FxHashMap;

// ============================================================================
// Function table
// ============================================================================

/// Parameter and return types of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
    /// Location of the declaring name. Runtime intrinsics have none.
    pub span: Option<Span>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, params: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Whether this signature was seeded from the runtime support library.
    #[inline]
    pub fn is_intrinsic(&self) -> bool {
        self.span.is_none()
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Function name to signature. Names are unique.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: FxHashMap<String, FunctionSignature>,
}

impl FunctionTable {
    /// An empty table, without the runtime intrinsics.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table seeded with the functions the runtime support library
    /// provides.
    pub fn with_runtime() -> Self {
        let mut table = Self::new();
        let intrinsics = [
            ("print", vec![Type::Int], Type::Void),
            ("read", vec![], Type::Int),
            ("print8", vec![Type::Int; 8], Type::Void),
            ("sum8", vec![Type::Int; 8], Type::Int),
            ("print_f", vec![Type::Float], Type::Void),
            ("print_s", vec![Type::String], Type::Void),
            ("read_f", vec![], Type::Float),
        ];
        for (name, params, return_type) in intrinsics {
            table
                .functions
                .insert(name.to_string(), FunctionSignature::new(name, params, return_type));
        }
        table
    }

    /// Add a signature. A name that is already present is a redefinition
    /// error, reported at the new signature's location.
    pub fn insert(&mut self, signature: FunctionSignature) -> Result<(), SemanticError> {
        if self.functions.contains_key(&signature.name) {
            return Err(SemanticError::new(
                SemanticErrorKind::FunctionRedefinition {
                    name: signature.name,
                },
                signature.span,
            ));
        }
        self.functions.insert(signature.name.clone(), signature);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Signatures ordered by name.
    pub fn sorted(&self) -> Vec<&FunctionSignature> {
        let mut signatures: Vec<_> = self.functions.values().collect();
        signatures.sort_by(|a, b| a.name.cmp(&b.name));
        signatures
    }
}

impl fmt::Display for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for signature in self.sorted() {
            writeln!(f, "{signature}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Symbol table
// ============================================================================

/// Variable use node to the declaration node it resolves to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    bindings: FxHashMap<NodeId, NodeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, use_site: NodeId, declaration: NodeId) {
        self.bindings.insert(use_site, declaration);
    }

    /// The declaration a use resolves to.
    pub fn get(&self, use_site: NodeId) -> Option<NodeId> {
        self.bindings.get(&use_site).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// `(use, declaration)` pairs ordered by use.
    pub fn sorted(&self) -> Vec<(NodeId, NodeId)> {
        let mut bindings: Vec<_> = self.bindings.iter().map(|(u, d)| (*u, *d)).collect();
        bindings.sort_unstable();
        bindings
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (use_site, declaration) in self.sorted() {
            writeln!(f, "{use_site} -> {declaration}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Type table
// ============================================================================

/// Semantic type of every expression and declaration node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeTable {
    types: FxHashMap<NodeId, Type>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the type of a node and hand it back.
    pub fn insert(&mut self, node: NodeId, ty: Type) -> Type {
        self.types.insert(node, ty);
        ty
    }

    pub fn get(&self, node: NodeId) -> Option<Type> {
        self.types.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// `(node, type)` pairs ordered by node.
    pub fn sorted(&self) -> Vec<(NodeId, Type)> {
        let mut types: Vec<_> = self.types.iter().map(|(n, t)| (*n, *t)).collect();
        types.sort_unstable_by_key(|(node, _)| *node);
        types
    }
}

impl fmt::Display for TypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, ty) in self.sorted() {
            writeln!(f, "{node}: {ty}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_intrinsics_are_seeded() {
        let table = FunctionTable::with_runtime();
        assert_eq!(table.len(), 7);

        let print8 = table.get("print8").unwrap();
        assert_eq!(print8.params, vec![Type::Int; 8]);
        assert!(print8.is_intrinsic());
        assert_eq!(table.get("read").unwrap().to_string(), "read() -> int");
        assert_eq!(table.get("print_s").unwrap().to_string(), "print_s(string) -> void");
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut table = FunctionTable::with_runtime();
        let span = Span::new(3, 5, 5);
        let err = table
            .insert(FunctionSignature::new("print", vec![], Type::Void).with_span(span))
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot redefine function 'print'");
        assert_eq!(err.span, Some(span));
        assert_eq!(table.get("print").unwrap().params, vec![Type::Int]);
    }

    #[test]
    fn function_dump_is_sorted() {
        let mut table = FunctionTable::new();
        table
            .insert(FunctionSignature::new("zeta", vec![Type::Int, Type::Float], Type::Int))
            .unwrap();
        table
            .insert(FunctionSignature::new("alpha", vec![], Type::Void))
            .unwrap();
        assert_eq!(table.to_string(), "alpha() -> void\nzeta(int, float) -> int\n");
    }

    #[test]
    fn symbol_and_type_dumps() {
        let mut symbols = SymbolTable::new();
        symbols.insert(NodeId::new(9), NodeId::new(2));
        symbols.insert(NodeId::new(4), NodeId::new(1));
        assert_eq!(symbols.get(NodeId::new(9)), Some(NodeId::new(2)));
        assert_eq!(symbols.to_string(), "#4 -> #1\n#9 -> #2\n");

        let mut types = TypeTable::new();
        types.insert(NodeId::new(3), Type::array(microc_core::ScalarType::Int, 4));
        types.insert(NodeId::new(1), Type::Float);
        assert_eq!(types.to_string(), "#1: float\n#3: int[4]\n");
    }
}
