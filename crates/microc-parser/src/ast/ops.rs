//! Operator definitions for Micro-C expressions.

use crate::lexer::TokenKind;
use std::fmt;

/// Binary operators, from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Assignment (right-associative)
    /// `=`
    Assign,

    // Equality (non-associative)
    /// `==`
    Equal,
    /// `!=`
    NotEqual,

    // Relational (non-associative)
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Additive
    /// `+`
    Add,
    /// `-`
    Sub,

    // Multiplicative
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,

    // Exponent (right-associative)
    /// `^`
    Pow,
}

impl BinaryOp {
    /// Map a token to the binary operator it spells.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Equals => BinaryOp::Assign,
            TokenKind::EqualsEquals => BinaryOp::Equal,
            TokenKind::BangEquals => BinaryOp::NotEqual,
            TokenKind::LessThan => BinaryOp::Less,
            TokenKind::LessThanEquals => BinaryOp::LessEqual,
            TokenKind::GreaterThan => BinaryOp::Greater,
            TokenKind::GreaterThanEquals => BinaryOp::GreaterEqual,
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::Caret => BinaryOp::Pow,
            _ => return None,
        })
    }

    /// `==` and `!=`.
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    /// `<`, `<=`, `>` and `>=`.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual
        )
    }

    /// Operators whose result is an `int` truth value.
    pub fn is_comparison(self) -> bool {
        self.is_equality() || self.is_relational()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Assign => "=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `+`
    Plus,
    /// `-`
    Neg,
}

impl UnaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_classification() {
        assert!(BinaryOp::Equal.is_comparison());
        assert!(BinaryOp::GreaterEqual.is_relational());
        assert!(!BinaryOp::Equal.is_relational());
        assert!(!BinaryOp::Assign.is_comparison());
        assert!(!BinaryOp::Pow.is_comparison());
    }

    #[test]
    fn token_mapping() {
        assert_eq!(BinaryOp::from_token(TokenKind::Caret), Some(BinaryOp::Pow));
        assert_eq!(BinaryOp::from_token(TokenKind::Semicolon), None);
        assert_eq!(UnaryOp::from_token(TokenKind::Minus), Some(UnaryOp::Neg));
        assert_eq!(UnaryOp::from_token(TokenKind::Star), None);
        assert_eq!(BinaryOp::Mod.to_string(), "%");
    }
}
