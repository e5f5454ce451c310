use std::collections::BTreeMap;

use crate::types::attributes::AttributeValue;
use crate::types::database::{Database, MessageKey, NodeKey, SignalKey};
use crate::types::errors::EncodeError;
use crate::types::frame_data::{TxFrame, Value};

/// Definition of a signal within a CAN message (DBC).
///
/// Describes position/bit-length, endianness, sign, scaling
/// (factor/offset), valid range, unit of measure, value table, receiver
/// nodes and the multiplexing relation.
///
/// Signal bit numbering in a message:
///
/// ```text
/// Byte:       0        1        2        3
///        +--------+--------+--------+--- - -
///        |        |        |        |
///        +--------+--------+--------+--- - -
/// Bit:    7      0 15     8 23    16 31
/// ```
///
/// For Motorola (big-endian) signals `bit_start` is the MSB of the
/// field; for Intel (little-endian) signals it is the LSB.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct Signal {
    /// Parent message key.
    pub message: MessageKey,
    /// Signal name.
    pub name: String,
    /// Bit start in the payload (bit 0 = LSB of the first byte).
    pub bit_start: u16,
    /// Bit length.
    pub bit_length: u16,
    /// Endianness.
    pub endian: Endianness,
    /// Sign, including the IEEE-754 variants set by `SIG_VALTYPE_`.
    pub sign: Signess,
    /// Scaling factor.
    pub factor: f64,
    /// Scaling offset.
    pub offset: f64,
    /// Minimum physical value, when the DBC declares one.
    pub min: Option<f64>,
    /// Maximum physical value, when the DBC declares one.
    pub max: Option<f64>,
    /// Unit of measure.
    pub unit: String,
    /// Receiver nodes.
    pub receiver_nodes: Vec<NodeKey>,
    /// Associated comment (DBC `CM_ SG_` section).
    pub comment: String,
    /// Value-to-text mapping (value table), the signal choices.
    pub value_table: BTreeMap<i64, String>,
    /// Multiplexing role (`MuxRole::None` when unused).
    pub mux_role: MuxRole,
    /// For multiplexed signals, the controlling multiplexer switch.
    pub mux_switch: Option<SignalKey>,
    /// Selector values for which this signal is present (expanded from
    /// `m<id>` tags and `SG_MUL_VAL_` ranges).
    pub mux_ids: Vec<i64>,

    // --- Signal Attribute Entry ---
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Signal {
    /// Linearized start bit on the MSB-first bit stream of the frame.
    ///
    /// Motorola maps the per-byte DBC numbering (`MSB=7`, `LSB=0`) to a
    /// stream position; Intel starts are already linear.
    pub fn start_bit(&self) -> u16 {
        match self.endian {
            Endianness::Motorola => 8 * (self.bit_start / 8) + (7 - self.bit_start % 8),
            Endianness::Intel => self.bit_start,
        }
    }

    /// `true` when the raw value is an IEEE-754 float.
    pub fn is_float(&self) -> bool {
        matches!(self.sign, Signess::IeeeFloat | Signess::IeeeDouble)
    }

    /// Resolves a choice string back to its raw value.
    pub fn choice_to_number(&self, choice: &str) -> Option<i64> {
        self.value_table
            .iter()
            .find(|(_, text)| text.as_str() == choice)
            .map(|(number, _)| *number)
    }

    /// Looks up the signal attribute `name`, falling back to the
    /// database-wide `BA_DEF_DEF_` default.
    pub fn attribute<'a>(&'a self, db: &'a Database, name: &str) -> Option<&'a AttributeValue> {
        self.attributes
            .get(name)
            .or_else(|| db.sig_attr_spec.get(name)?.default.as_ref())
    }

    /// The signal start value (`GenSigStartValue`), as a raw value.
    pub fn gen_sig_start_value(&self, db: &Database) -> Option<f64> {
        self.attribute(db, "GenSigStartValue")?.as_f64()
    }

    /// The signal send type (`GenSigSendType`) as its enum label.
    pub fn gen_sig_send_type(&self, db: &Database) -> Option<String> {
        resolve_enum_label(
            self.attribute(db, "GenSigSendType")?,
            db.sig_attr_spec
                .get("GenSigSendType")
                .and_then(|spec| spec.def.as_ref())
                .map(|def| def.enum_values.as_slice()),
        )
    }

    /// Encodes an entire message through this single signal.
    ///
    /// Every other signal falls back to its start value. When the
    /// signal is multiplexed, the parent multiplexer is set to the
    /// choice selecting this branch, so the produced frame actually
    /// carries the signal.
    pub fn encode(
        &self,
        db: &Database,
        value: Option<Value>,
        scaling: bool,
        padding: bool,
        strict: bool,
    ) -> Result<TxFrame, EncodeError> {
        let message = db
            .get_message_by_key(self.message)
            .ok_or_else(|| EncodeError::NotAttached {
                signal: self.name.clone(),
            })?;

        let mut data: BTreeMap<String, Value> = BTreeMap::new();
        match value {
            Some(value) => {
                data.insert(self.name.clone(), value);
            }
            None => {
                let start = self.gen_sig_start_value(db).ok_or_else(|| {
                    EncodeError::MissingSignal {
                        signal: self.name.clone(),
                        message: message.name.clone(),
                    }
                })?;
                data.insert(self.name.clone(), Value::Float(start + self.offset));
            }
        }

        if let Some(switch_key) = self.mux_switch
            && let Some(switch) = db.get_sig_by_key(switch_key)
            && let Some(&selector) = self.mux_ids.first()
        {
            let value = match switch.value_table.get(&selector) {
                Some(label) => Value::Label(label.clone()),
                None => Value::Integer(selector),
            };
            data.insert(switch.name.clone(), value);
        }

        message.encode(db, &data, scaling, padding, strict)
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Endianness {
    #[default]
    Motorola, // 0
    Intel, // 1
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Signess {
    #[default]
    Unsigned, // +
    Signed,     // -
    IeeeFloat,  // SIG_VALTYPE = 1
    IeeeDouble, // SIG_VALTYPE = 2
}

/// What role (if any) a signal plays in multiplexing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MuxRole {
    /// Not multiplexed (always present).
    #[default]
    None,
    /// This signal is a multiplexer switch (marked as `M` in DBC).
    Multiplexor,
    /// This signal is gated by a multiplexer value (marked as `mX`).
    Multiplexed,
    /// Both at once (`mXM`, extended multiplexing): gated by a parent
    /// switch and itself switching further signals.
    MultiplexedMultiplexor,
}

impl MuxRole {
    pub fn is_multiplexor(&self) -> bool {
        matches!(self, MuxRole::Multiplexor | MuxRole::MultiplexedMultiplexor)
    }

    pub fn is_multiplexed(&self) -> bool {
        matches!(self, MuxRole::Multiplexed | MuxRole::MultiplexedMultiplexor)
    }
}

/// Resolves an enum attribute to its label: integer values index the
/// `BA_DEF_` enum table, label values pass through.
pub(crate) fn resolve_enum_label(
    value: &AttributeValue,
    enum_values: Option<&[String]>,
) -> Option<String> {
    match value {
        AttributeValue::Enum(label) | AttributeValue::Str(label) => Some(label.clone()),
        AttributeValue::Int(index) => enum_values?.get(*index as usize).cloned(),
        AttributeValue::Hex(index) => enum_values?.get(*index as usize).cloned(),
        AttributeValue::Float(_) => None,
    }
}
