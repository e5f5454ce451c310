use std::collections::BTreeMap;

use crate::codec::{self, CodecNode};
use crate::types::attributes::AttributeValue;
use crate::types::database::{Database, NodeKey, SignalKey};
use crate::types::errors::{DecodeError, EncodeError};
use crate::types::frame_data::{RxFrame, TxFrame, Value};
use crate::types::frame_id::{CAN_EFF_FLAG, FrameId};
use crate::types::node::Node;
use crate::types::signal::{Signal, resolve_enum_label};

/// CAN message defined in the database.
///
/// Maintains the numeric ID (`id`), the normalized hexadecimal ID
/// (`id_hex`), the `name`, payload length (`byte_length`), the
/// transmitting nodes (`sender_nodes`), the list of composing signals
/// and the codec tree compiled by `Database::refresh`.
#[derive(Default, Clone, Debug)]
pub struct Message {
    /// ID Format (Standard or Extended)
    pub id_format: IdFormat,
    /// Numeric CAN ID without the extended-frame flag.
    pub id: u32,
    /// **Normalized** hexadecimal CAN ID (`"0x..."`, uppercase).
    pub id_hex: String,
    /// Wire interpretation of the ID, chosen by `Database::refresh`.
    pub frame_id: FrameId,
    /// Message name.
    pub name: String,
    /// Payload length in bytes.
    pub byte_length: u16,
    /// Message type (`"CAN"` or `"CAN FD"`).
    pub msgtype: String,
    /// Transmitting nodes (ECUs) for this message.
    pub sender_nodes: Vec<NodeKey>,
    /// Signals that belong to this message, ordered by start bit.
    pub signals: Vec<SignalKey>,
    /// Associated comment (DBC `CM_ BO_` section).
    pub comment: String,
    /// Signal groups (DBC `SIG_GROUP_` section).
    pub signal_groups: Vec<SignalGroup>,

    // --- Message Attribute Entry ---
    pub attributes: BTreeMap<String, AttributeValue>,

    // Codec tree compiled by refresh; None until then.
    pub(crate) codec: Option<CodecNode>,
}

impl Message {
    /// Convenience iterator over the `Signal`s belonging to this message.
    pub fn signals<'a>(&'a self, db: &'a Database) -> impl Iterator<Item = &'a Signal> + 'a {
        self.signals
            .iter()
            .filter_map(move |&key| db.get_sig_by_key(key))
    }

    pub fn get_signal_by_name<'a>(&'a self, db: &'a Database, name: &str) -> Option<&'a Signal> {
        self.signals(db).find(|signal| signal.name == name)
    }

    /// `true` if any signal of this message is gated by a multiplexer.
    pub fn is_multiplexed(&self) -> bool {
        self.codec
            .as_ref()
            .is_some_and(|codec| codec.is_multiplexed())
    }

    /// The on-wire DBC frame id: the raw id with bit 31 set for
    /// extended frames.
    pub fn dbc_frame_id(&self) -> u32 {
        match self.id_format {
            IdFormat::Extended => self.id | CAN_EFF_FLAG,
            IdFormat::Standard => self.id,
        }
    }

    pub fn is_extended_frame(&self) -> bool {
        self.id_format == IdFormat::Extended
    }

    /// Sender nodes resolved against the database.
    pub fn senders<'a>(&'a self, db: &'a Database) -> impl Iterator<Item = &'a Node> + 'a {
        self.sender_nodes
            .iter()
            .filter_map(move |&key| db.get_node_by_key(key))
    }

    /// Receiver nodes: the union of the receivers of every signal.
    pub fn receivers<'a>(&self, db: &'a Database) -> Vec<&'a Node> {
        let mut keys: Vec<NodeKey> = Vec::new();
        for signal in self.signals(db) {
            for &key in &signal.receiver_nodes {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys.into_iter()
            .filter_map(|key| db.get_node_by_key(key))
            .collect()
    }

    /// Encode given data as a message of this type.
    ///
    /// If `scaling` is `false` no scaling of signals is performed.
    ///
    /// If `padding` is `true` unused bits are encoded as 1.
    ///
    /// If `strict` is `true` all signal values must be within their
    /// allowed ranges, and absent signals fall back to their declared
    /// start values.
    pub fn encode(
        &self,
        db: &Database,
        data: &BTreeMap<String, Value>,
        scaling: bool,
        padding: bool,
        strict: bool,
    ) -> Result<TxFrame, EncodeError> {
        let codec = self.codec.as_ref().ok_or_else(|| EncodeError::MissingCodec {
            message: self.name.clone(),
        })?;

        let bytes =
            codec::encode::encode_message(db, self, codec, data, scaling, padding, strict)?;

        Ok(TxFrame {
            frame_id: self.frame_id,
            data: bytes,
        })
    }

    /// Decode given data as a message of this type.
    ///
    /// If `decode_choices` is `false` scaled values are not converted
    /// to choice strings (if available).
    ///
    /// If `scaling` is `false` no scaling of signals is performed.
    ///
    /// Buffers longer than the declared length are truncated; shorter
    /// buffers are rejected.
    pub fn decode(
        &self,
        db: &Database,
        data: &[u8],
        decode_choices: bool,
        scaling: bool,
    ) -> Result<RxFrame, DecodeError> {
        let codec = self.codec.as_ref().ok_or_else(|| DecodeError::MissingCodec {
            message: self.name.clone(),
        })?;

        let length = self.byte_length as usize;
        if data.len() < length {
            return Err(DecodeError::ShortData {
                message: self.name.clone(),
                expected: length,
                got: data.len(),
            });
        }

        let mut out = RxFrame::new(self.frame_id);
        codec::decode::decode_message(
            db,
            self,
            codec,
            &data[..length],
            decode_choices,
            scaling,
            &mut out,
        )?;
        Ok(out)
    }

    /// Looks up the message attribute `name`, falling back to the
    /// database-wide `BA_DEF_DEF_` default.
    pub fn attribute<'a>(&'a self, db: &'a Database, name: &str) -> Option<&'a AttributeValue> {
        self.attributes
            .get(name)
            .or_else(|| db.msg_attr_spec.get(name)?.default.as_ref())
    }

    /// Fixed periodicity for cyclic transmission, in ms (`GenMsgCycleTime`).
    pub fn gen_msg_cycle_time(&self, db: &Database) -> Option<i64> {
        self.attribute(db, "GenMsgCycleTime")?.as_i64()
    }

    /// Minimum time between two transmissions, in ms (`GenMsgDelayTime`).
    pub fn gen_msg_delay_time(&self, db: &Database) -> Option<i64> {
        self.attribute(db, "GenMsgDelayTime")?.as_i64()
    }

    /// The message send type (`GenMsgSendType`) as its enum label.
    pub fn gen_msg_send_type(&self, db: &Database) -> Option<String> {
        resolve_enum_label(
            self.attribute(db, "GenMsgSendType")?,
            db.msg_attr_spec
                .get("GenMsgSendType")
                .and_then(|spec| spec.def.as_ref())
                .map(|def| def.enum_values.as_slice()),
        )
    }
}

#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
pub enum IdFormat {
    #[default]
    Standard,
    Extended,
}

impl IdFormat {
    pub fn to_str(&self) -> &'static str {
        match self {
            IdFormat::Standard => "Standard",
            IdFormat::Extended => "Extended",
        }
    }
}

/// Signal group (DBC `SIG_GROUP_`): a named set of signals expected to
/// be updated together.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct SignalGroup {
    pub name: String,
    pub repetitions: u32,
    pub signal_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::errors::{DecodeError, EncodeError};

    // A classic OBD-II style pair: a plain request message and a
    // pid-multiplexed response.
    const OBD_DBC: &str = r#"VERSION "1.0"

BS_:

BU_: Tester ECU

BO_ 2015 TX: 8 Tester
 SG_ length_tx : 7|8@0+ (1,0) [0|0] ""  ECU
 SG_ mode : 11|4@0+ (1,0) [0|0] ""  ECU
 SG_ pid : 23|8@0+ (1,0) [0|0] ""  ECU

BO_ 2024 RX: 8 ECU
 SG_ length : 7|8@0+ (1,0) [0|0] ""  Tester
 SG_ response : 15|4@0+ (1,0) [0|0] ""  Tester
 SG_ mode : 11|4@0+ (1,0) [0|0] ""  Tester
 SG_ pid M : 23|8@0+ (1,0) [0|0] ""  Tester
 SG_ EngineRPM m12 : 31|16@0+ (0.25,0) [0|16383.75] "rpm"  Tester
 SG_ VehicleSpeed m13 : 31|8@0+ (1,0) [0|255] "km/h"  Tester

BO_ 256 Limits: 8 ECU
 SG_ bounded : 7|8@0+ (1,0) [0|100] ""  Tester

BA_DEF_ SG_  "GenSigStartValue" INT 0 100000;
BA_DEF_DEF_ "GenSigStartValue" 0;

VAL_ 2024 mode 1 "Live Data" 2 "Freeze Frame" ;
VAL_ 2024 pid 12 "EngineRPM" 13 "VehicleSpeed" 14 "Reserved" ;
"#;

    fn data(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_obd_request_encode() {
        let db = Database::from_string(OBD_DBC).unwrap();

        let frame = db
            .encode_message(
                "TX",
                &data(&[
                    ("length_tx", Value::Integer(2)),
                    ("mode", Value::Integer(1)),
                    ("pid", Value::Integer(0x0D)),
                ]),
                true,
                false,
                true,
            )
            .unwrap();

        assert_eq!(frame.hex(), "02 01 0D 00 00 00 00 00");
        assert_eq!(frame.frame_id_hex(), "0x7DF");
    }

    #[test]
    fn test_obd_response_with_choices() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let input = data(&[
            ("mode", Value::Label("Live Data".to_string())),
            ("response", Value::Integer(2)),
            ("length", Value::Integer(3)),
            ("VehicleSpeed", Value::Integer(200)),
            ("pid", Value::Label("VehicleSpeed".to_string())),
        ]);

        let frame = db.encode_message("RX", &input, true, false, true).unwrap();
        assert_eq!(frame.data[3], 200);
        assert_eq!(frame.hex(), "03 21 0D C8 00 00 00 00");

        // Decoding with choices reproduces the input, including labels.
        let decoded = db
            .decode_message(frame.frame_id.frame_id(), &frame.data, true, true)
            .unwrap();
        assert_eq!(decoded.len(), 5);
        for (name, value) in &input {
            assert_eq!(decoded[name.as_str()], *value, "signal {}", name);
        }
        assert!(!decoded.contains("EngineRPM"));

        // Re-encoding the decoded values is byte-identical.
        let decoded_map: BTreeMap<String, Value> = decoded
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let again = db.encode_message("RX", &decoded_map, true, false, true).unwrap();
        assert_eq!(again.data, frame.data);
    }

    #[test]
    fn test_multiplexer_dispatch() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let base = [
            ("mode", Value::Integer(1)),
            ("response", Value::Integer(4)),
            ("length", Value::Integer(4)),
        ];

        let mut branch_a = data(&base);
        branch_a.insert("pid".to_string(), Value::Integer(13));
        branch_a.insert("VehicleSpeed".to_string(), Value::Integer(10));
        let frame_a = db.encode_message("RX", &branch_a, true, false, true).unwrap();

        let mut branch_b = data(&base);
        branch_b.insert("pid".to_string(), Value::Integer(12));
        branch_b.insert("EngineRPM".to_string(), Value::Integer(5000));
        let frame_b = db.encode_message("RX", &branch_b, true, false, true).unwrap();

        let decoded_a = db.decode_message("RX", &frame_a.data, false, true).unwrap();
        assert!(decoded_a.contains("VehicleSpeed"));
        assert!(!decoded_a.contains("EngineRPM"));
        assert_eq!(decoded_a["VehicleSpeed"], Value::Integer(10));

        let decoded_b = db.decode_message("RX", &frame_b.data, false, true).unwrap();
        assert!(decoded_b.contains("EngineRPM"));
        assert!(!decoded_b.contains("VehicleSpeed"));
        assert_eq!(decoded_b["EngineRPM"], Value::Integer(5000));
    }

    #[test]
    fn test_named_only_branch_encodes() {
        // Branch 14 exists only through the pid value table.
        let db = Database::from_string(OBD_DBC).unwrap();
        let frame = db
            .encode_message(
                "RX",
                &data(&[
                    ("mode", Value::Integer(1)),
                    ("response", Value::Integer(4)),
                    ("length", Value::Integer(1)),
                    ("pid", Value::Label("Reserved".to_string())),
                ]),
                true,
                false,
                true,
            )
            .unwrap();
        assert_eq!(frame.data[2], 14);
    }

    #[test]
    fn test_unknown_multiplexer_id() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let result = db.encode_message(
            "RX",
            &data(&[
                ("mode", Value::Integer(1)),
                ("response", Value::Integer(4)),
                ("length", Value::Integer(1)),
                ("pid", Value::Integer(99)),
            ]),
            true,
            false,
            true,
        );
        match result {
            Err(EncodeError::BadMultiplexerId { expected, got }) => {
                assert_eq!(expected, "12, 13 or 14");
                assert_eq!(got, 99);
            }
            other => panic!("expected BadMultiplexerId, got {:?}", other.map(|f| f.hex())),
        }

        // Same on the decode side.
        let mut bytes = vec![0u8; 8];
        bytes[2] = 99;
        assert!(matches!(
            db.decode_message("RX", &bytes, true, true),
            Err(DecodeError::BadMultiplexerId { .. })
        ));
    }

    #[test]
    fn test_strict_range_rejection() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let result = db.encode_message(
            "Limits",
            &data(&[("bounded", Value::Integer(200))]),
            true,
            false,
            true,
        );
        match result {
            Err(EncodeError::AboveMaximum {
                signal,
                maximum,
                value,
                ..
            }) => {
                assert_eq!(signal, "bounded");
                assert_eq!(maximum, 100.0);
                assert_eq!(value, 200.0);
            }
            other => panic!("expected AboveMaximum, got {:?}", other.map(|f| f.hex())),
        }

        // Non-strict encode lets the value through (truncated to the field).
        let frame = db
            .encode_message(
                "Limits",
                &data(&[("bounded", Value::Integer(200))]),
                true,
                false,
                false,
            )
            .unwrap();
        assert_eq!(frame.data[0], 200);
    }

    #[test]
    fn test_missing_signal_errors() {
        let db = Database::from_string(OBD_DBC).unwrap();
        // Non-strict encode never consults start values, so an empty
        // dictionary is an error.
        let result = db.encode_message(
            "Limits",
            &BTreeMap::new(),
            true,
            false,
            false,
        );
        assert!(matches!(result, Err(EncodeError::MissingSignal { .. })));

        // Strict mode falls back to the declared start values instead.
        let frame = db
            .encode_message("Limits", &BTreeMap::new(), true, false, true)
            .unwrap();
        assert_eq!(frame.data, vec![0u8; 8]);
    }

    #[test]
    fn test_padding_fills_unclaimed_bits() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let input = data(&[
            ("length_tx", Value::Integer(2)),
            ("mode", Value::Integer(1)),
            ("pid", Value::Integer(0x0D)),
        ]);

        let padded = db.encode_message("TX", &input, true, true, true).unwrap();
        assert_eq!(padded.hex(), "02 F1 0D FF FF FF FF FF");

        // Padding is idempotent: already-padded frames do not change.
        let again = db.encode_message("TX", &input, true, true, true).unwrap();
        assert_eq!(again.data, padded.data);

        // And the unpadded frame has zeroes exactly where padding goes.
        let plain = db.encode_message("TX", &input, true, false, true).unwrap();
        for (padded_byte, plain_byte) in padded.data.iter().zip(&plain.data) {
            assert_eq!(plain_byte & padded_byte, *plain_byte);
        }
    }

    #[test]
    fn test_scaled_round_trip_with_decimal_factor() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let input = data(&[
            ("mode", Value::Integer(1)),
            ("response", Value::Integer(4)),
            ("length", Value::Integer(4)),
            ("pid", Value::Integer(12)),
            ("EngineRPM", Value::Float(1000.25)),
        ]);

        let frame = db.encode_message("RX", &input, true, false, true).unwrap();
        // raw = 1000.25 / 0.25 = 4001
        assert_eq!(
            u16::from_be_bytes([frame.data[3], frame.data[4]]),
            4001
        );

        let decoded = db.decode_message("RX", &frame.data, false, true).unwrap();
        assert_eq!(decoded["EngineRPM"], Value::Float(1000.25));
    }

    #[test]
    fn test_unscaled_encode_uses_raw_values() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let input = data(&[
            ("mode", Value::Integer(1)),
            ("response", Value::Integer(4)),
            ("length", Value::Integer(4)),
            ("pid", Value::Integer(12)),
            ("EngineRPM", Value::Integer(4001)),
        ]);

        let frame = db.encode_message("RX", &input, false, false, false).unwrap();
        assert_eq!(u16::from_be_bytes([frame.data[3], frame.data[4]]), 4001);

        let decoded = db.decode_message("RX", &frame.data, false, false).unwrap();
        assert_eq!(decoded["EngineRPM"], Value::Integer(4001));
    }

    #[test]
    fn test_decode_rejects_short_buffers() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let result = db.decode_message("TX", &[0x02, 0x01], true, true);
        match result {
            Err(DecodeError::ShortData {
                expected, got, ..
            }) => {
                assert_eq!(expected, 8);
                assert_eq!(got, 2);
            }
            other => panic!("expected ShortData, got {:?}", other.map(|frame| frame.len())),
        }

        // Longer buffers are truncated to the declared length.
        let mut long = vec![0u8; 12];
        long[0] = 0x02;
        assert!(db.decode_message("TX", &long, true, true).is_ok());
    }

    #[test]
    fn test_signal_level_encode_selects_its_branch() {
        let db = Database::from_string(OBD_DBC).unwrap();
        let speed = db.get_message_by_name("RX").unwrap();
        let speed = speed.get_signal_by_name(&db, "VehicleSpeed").unwrap();

        let frame = speed
            .encode(&db, Some(Value::Integer(99)), true, false, true)
            .unwrap();
        // The pid multiplexer was set to the VehicleSpeed branch.
        assert_eq!(frame.data[2], 13);
        assert_eq!(frame.data[3], 99);

        // Every other signal fell back to its start value (0).
        assert_eq!(frame.data[0], 0);
        assert_eq!(frame.data[1], 0);
    }

    #[test]
    fn test_lookup_by_name_and_frame_id() {
        let db = Database::from_string(OBD_DBC).unwrap();
        assert_eq!(db.get_message("TX").unwrap().id, 2015);
        assert_eq!(db.get_message(2015u32).unwrap().name, "TX");
        assert!(db.get_message("NoSuchMessage").is_none());

        let message = db.get_message_by_name("RX").unwrap();
        assert!(message.is_multiplexed());
        assert!(!db.get_message_by_name("TX").unwrap().is_multiplexed());
        assert_eq!(message.dbc_frame_id(), 2024);

        let receivers = message.receivers(&db);
        assert_eq!(receivers.len(), 1);
        assert_eq!(receivers[0].name, "Tester");
    }
}
