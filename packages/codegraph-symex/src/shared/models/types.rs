//! JVM-level types, method and field references
//!
//! Types are written the way Java source spells them (`int`, `java.lang.String`,
//! `byte[][]`) and round-trip through serde in that form.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Declared type of a local, field, parameter or expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Type {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
    /// Type of the `null` literal
    Null,
    /// Class or interface type
    Ref(Arc<str>),
    Array(Box<Type>),
}

impl Type {
    pub fn class(name: &str) -> Self {
        Type::Ref(Arc::from(name))
    }

    pub fn array_of(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn string() -> Self {
        Type::class("java.lang.String")
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Boolean
                | Type::Byte
                | Type::Short
                | Type::Char
                | Type::Int
                | Type::Long
                | Type::Float
                | Type::Double
        )
    }

    /// Class, interface, array or null type
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Ref(_) | Type::Array(_) | Type::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "boolean"),
            Type::Byte => write!(f, "byte"),
            Type::Short => write!(f, "short"),
            Type::Char => write!(f, "char"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Ref(name) => write!(f, "{}", name),
            Type::Array(element) => write!(f, "{}[]", element),
        }
    }
}

impl FromStr for Type {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(element) = s.strip_suffix("[]") {
            return Ok(Type::array_of(element.parse()?));
        }
        Ok(match s {
            "boolean" => Type::Boolean,
            "byte" => Type::Byte,
            "short" => Type::Short,
            "char" => Type::Char,
            "int" => Type::Int,
            "long" => Type::Long,
            "float" => Type::Float,
            "double" => Type::Double,
            "void" => Type::Void,
            "null" => Type::Null,
            "" => return Err("empty type name".to_string()),
            name if name.contains(|c: char| c.is_whitespace() || c == '[' || c == ']') => {
                return Err(format!("malformed type name '{}'", name))
            }
            name => Type::class(name),
        })
    }
}

impl TryFrom<String> for Type {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Type> for String {
    fn from(value: Type) -> Self {
        value.to_string()
    }
}

/// Full method signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSignature {
    pub class: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<Type>,
    #[serde(default = "void_type")]
    pub ret: Type,
}

fn void_type() -> Type {
    Type::Void
}

/// Cheap-to-clone method identity
///
/// Equality, ordering and hashing are by signature content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodRef(Arc<MethodSignature>);

impl MethodRef {
    pub fn new(class: &str, name: &str, params: Vec<Type>, ret: Type) -> Self {
        Self(Arc::new(MethodSignature {
            class: class.to_string(),
            name: name.to_string(),
            params,
            ret,
        }))
    }

    pub fn class(&self) -> &str {
        &self.0.class
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn params(&self) -> &[Type] {
        &self.0.params
    }

    pub fn return_type(&self) -> &Type {
        &self.0.ret
    }

    /// `Class.name`, without the parameter list
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.0.class, self.0.name)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.0.params.iter().map(Type::to_string).collect();
        write!(
            f,
            "{}.{}({}){}",
            self.0.class,
            self.0.name,
            params.join(","),
            self.0.ret
        )
    }
}

/// Field reference (declaring class + name + declared type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub class: String,
    pub name: String,
    pub ty: Type,
    #[serde(default)]
    pub is_static: bool,
}

impl FieldRef {
    pub fn instance(class: &str, name: &str, ty: Type) -> Self {
        Self {
            class: class.to_string(),
            name: name.to_string(),
            ty,
            is_static: false,
        }
    }

    pub fn static_field(class: &str, name: &str, ty: Type) -> Self {
        Self {
            is_static: true,
            ..Self::instance(class, name, ty)
        }
    }
}
