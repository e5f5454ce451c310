/// Attribute value kinds as declared by `BA_DEF_` lines in DBC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttrType {
    #[default]
    String,
    Int,
    Hex,
    Float,
    Enum,
}

/// Attribute definition (declared by `BA_DEF_`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeDef {
    /// Attribute name.
    pub name: String,
    /// Attribute kind.
    pub kind: AttrType,
    // optional fields for numbers
    pub int_min: Option<i64>,
    pub int_max: Option<i64>,
    pub hex_min: Option<u64>,
    pub hex_max: Option<u64>,
    pub float_min: Option<f64>,
    pub float_max: Option<f64>,
    // optional vec<String> for enum entries
    pub enum_values: Vec<String>,
}

/// Concrete attribute value stored on DB/Node/Message/Signal entities.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Hex(u64), // memorize as a number, proper display later.
    Float(f64),
    Enum(String),
}

impl AttributeValue {
    /// Numeric view of the value, when it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Hex(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Str(_) | AttributeValue::Enum(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Hex(v) => Some(*v as i64),
            AttributeValue::Float(v) => Some(*v as i64),
            AttributeValue::Str(_) | AttributeValue::Enum(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) | AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }
}

/// Attribute specification pairing an optional definition and a default value.
///
/// - `def` comes from `BA_DEF_`
/// - `default` comes from `BA_DEF_DEF_`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeSpec {
    pub def: Option<AttributeDef>,       // from BA_DEF_
    pub default: Option<AttributeValue>, // from BA_DEF_DEF_
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_views() {
        assert_eq!(AttributeValue::Int(-5).as_f64(), Some(-5.0));
        assert_eq!(AttributeValue::Hex(0x7E0).as_i64(), Some(0x7E0));
        assert_eq!(AttributeValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(AttributeValue::Str("J1939".into()).as_str(), Some("J1939"));
        assert_eq!(AttributeValue::Enum("Yes".into()).as_f64(), None);
    }
}
