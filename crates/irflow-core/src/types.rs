use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Bool,
    Int { bits: u16, signed: bool },
    Float(u16),
    Pointer(Box<Type>),
    Reference(Box<Type>),
    Class(String),
    Function(Box<FunctionType>),
    /// Memory whose shape the alias analysis could not determine. A chi
    /// producing this type may have written any escaped variable.
    Unknown,
}

impl Type {
    pub fn int(bits: u16) -> Self {
        Type::Int { bits, signed: true }
    }

    pub fn uint(bits: u16) -> Self {
        Type::Int {
            bits,
            signed: false,
        }
    }

    pub fn pointer_to(ty: Type) -> Self {
        Type::Pointer(Box::new(ty))
    }

    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int { .. } | Type::Float(_))
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) | Type::Reference(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            Type::Void | Type::Unknown => 0,
            Type::Bool => 1,
            Type::Int { bits, .. } | Type::Float(bits) => (*bits as usize + 7) / 8,
            Type::Pointer(_) | Type::Reference(_) | Type::Function(_) => 8,
            Type::Class(_) => 8,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::Int { bits, signed: true } => write!(f, "int{}", bits),
            Type::Int {
                bits,
                signed: false,
            } => write!(f, "uint{}", bits),
            Type::Float(bits) => write!(f, "float{}", bits),
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::Reference(inner) => write!(f, "{}&", inner),
            Type::Class(name) => write!(f, "class {}", name),
            Type::Function(ft) => write!(f, "fn{}", ft),
            Type::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub returns: Type,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "({}) -> {}", params, self.returns)
    }
}
