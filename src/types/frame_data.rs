use std::ops::Index;

use crate::types::database::Database;
use crate::types::frame_id::FrameId;
use crate::types::node::Node;

/// A signal value as seen by callers: a plain number, an enumerated
/// choice label, or a flag.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Label(String),
    Bool(bool),
}

impl Value {
    /// Numeric view; labels have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64 as f64),
            Value::Label(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(label) => Some(label),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Label(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Label(value)
    }
}

/// An encoded frame: identifier plus payload bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct TxFrame {
    pub frame_id: FrameId,
    pub data: Vec<u8>,
}

impl TxFrame {
    /// Payload as space-separated uppercase hex pairs.
    pub fn hex(&self) -> String {
        self.data
            .iter()
            .map(|byte| format!("{:02X}", byte))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn frame_id_hex(&self) -> String {
        self.frame_id.hex()
    }

    /// Stamps the sending node onto the frame identifier.
    ///
    /// The node's `TpTxIdentifier` overwrites the J1939 source address
    /// or the GM extended source id. Other variants are untouched.
    pub fn set_sending_node(&mut self, node: &Node, db: &Database) {
        let Some(identifier) = node.tp_tx_identifier(db) else {
            return;
        };

        match &mut self.frame_id {
            FrameId::J1939(id) => {
                if (0..=0xFF).contains(&identifier) {
                    id.set_source_address(identifier as u8);
                } else {
                    tracing::warn!(
                        "TpTxIdentifier {} of node {} does not fit the J1939 source address.",
                        identifier,
                        node.name
                    );
                }
            }
            FrameId::GmParameterIdExtended(id) => {
                if (0..=0x1FFF).contains(&identifier) {
                    id.set_source_id(identifier as u16);
                } else {
                    tracing::warn!(
                        "TpTxIdentifier {} of node {} does not fit the GM source id.",
                        identifier,
                        node.name
                    );
                }
            }
            FrameId::Raw(_) | FrameId::GmParameterId(_) => {}
        }
    }
}

/// A decoded frame: signal values in layout order.
///
/// Entries are reachable by position or by signal name; inserting an
/// already-present name overwrites that entry in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RxFrame {
    pub frame_id: FrameId,
    entries: Vec<(String, Value)>,
}

impl RxFrame {
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts a value, overwriting a same-named entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(entry, _)| *entry == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl Index<usize> for RxFrame {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.entries[index].1
    }
}

impl Index<&str> for RxFrame {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(value) => value,
            None => panic!("\"{}\" cannot be found.", name),
        }
    }
}
