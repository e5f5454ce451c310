//! Database model (SlotMap-backed).
//!
//! Storage uses **SlotMap** arenas with **stable keys**: [`NodeKey`],
//! [`MessageKey`], [`SignalKey`]. Public iteration follows order
//! vectors via `iter_nodes()`, `iter_messages()`, `iter_signals()`.
//!
//! **Lookups** are normalized: `get_message_by_id/_hex/_name`,
//! `get_node_by_name`, `get_signal_by_name`. Names are
//! case-insensitive; hexadecimal IDs use uppercase `0x...` form.
//!
//! `refresh()` re-links multiplexer switches, recomputes every
//! message's frame-id variant, rebuilds the codec trees and (in strict
//! mode) validates the signal layouts. Call it after any structural
//! mutation and before the next encode/decode.

use slotmap::{SlotMap, new_key_type};
use std::collections::{BTreeMap, HashMap};

use crate::codec;
use crate::types::attributes::{AttributeSpec, AttributeValue};
use crate::types::bus::Bus;
use crate::types::errors::{DecodeError, EncodeError, Error, ParseError, SaveError};
use crate::types::frame_data::{RxFrame, TxFrame, Value};
use crate::types::frame_id::{
    CAN_EFF_FLAG, CAN_EFF_MASK, CAN_SFF_MASK, FrameId, GmParameterId, GmParameterIdExtended,
    J1939FrameId,
};
use crate::types::message::{IdFormat, Message};
use crate::types::node::Node;
use crate::types::signal::{Endianness, MuxRole, Signal, Signess};

// --- Stable keys (SlotMap) ---
new_key_type! { pub struct NodeKey; }
new_key_type! { pub struct MessageKey; }
new_key_type! { pub struct SignalKey; }

/// Message selector for the encode/decode entry points: either the
/// message name or a frame id.
#[derive(Clone, Copy, Debug)]
pub enum MessageRef<'a> {
    Name(&'a str),
    Id(u32),
}

impl<'a> From<&'a str> for MessageRef<'a> {
    fn from(name: &'a str) -> Self {
        MessageRef::Name(name)
    }
}

impl From<u32> for MessageRef<'_> {
    fn from(id: u32) -> Self {
        MessageRef::Id(id)
    }
}

impl std::fmt::Display for MessageRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRef::Name(name) => write!(f, "'{}'", name),
            MessageRef::Id(id) => write!(f, "0x{:X}", id),
        }
    }
}

/// In-memory representation of a CAN database (DBC).
///
/// Holds metadata (version, comment), the arenas of
/// nodes/messages/signals (SlotMaps with stable keys), order vectors,
/// buses, the attribute specifications per entity kind and several
/// normalized lookup maps.
#[derive(Clone, Debug)]
pub struct Database {
    // --- General information ---
    /// Database version string.
    pub version: String,
    /// Database comment.
    pub comment: String,
    /// Buses, rebuilt by `refresh` from the DBName/Baudrate attributes.
    pub buses: Vec<Bus>,

    // --- Main storage (stable-key maps) ---
    pub nodes: SlotMap<NodeKey, Node>,
    pub messages: SlotMap<MessageKey, Message>,
    pub signals: SlotMap<SignalKey, Signal>,

    // --- Order "views" ---
    pub nodes_order: Vec<NodeKey>,
    pub messages_order: Vec<MessageKey>,
    pub signals_order: Vec<SignalKey>,

    // --- DB Attribute Entry ---
    pub attributes: BTreeMap<String, AttributeValue>,

    // --- Attributes Spec ---
    pub db_attr_spec: BTreeMap<String, AttributeSpec>,
    pub node_attr_spec: BTreeMap<String, AttributeSpec>,
    pub msg_attr_spec: BTreeMap<String, AttributeSpec>,
    pub sig_attr_spec: BTreeMap<String, AttributeSpec>,

    /// Comments of environment variables (`CM_ EV_`); the variables
    /// themselves are not modeled.
    pub env_var_comments: BTreeMap<String, String>,

    /// Mask applied to frame ids before they enter the id lookup table.
    pub frame_id_mask: u32,
    /// Default strictness of `refresh`.
    pub strict: bool,

    // --- Lookups (case-normalized) ---
    pub(crate) node_key_by_name: HashMap<String, NodeKey>, // lower(name) → NodeKey
    pub(crate) msg_key_by_id: HashMap<u32, MessageKey>,    // masked id → MessageKey
    pub(crate) msg_key_by_hex: HashMap<String, MessageKey>, // "0x..." uppercase → MessageKey
    pub(crate) msg_key_by_name: HashMap<String, MessageKey>, // lower(name) → MessageKey

    // Global map for signals by (lower) name. Beware of collisions if
    // two BO_ carry the same SG_ name: the last one parsed wins here,
    // per-message lookups are unaffected.
    pub(crate) sig_key_by_name: HashMap<String, SignalKey>,

    // Parsing state: last message seen (used by the SG_ decoder)
    pub(crate) current_msg: Option<MessageKey>,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            version: String::new(),
            comment: String::new(),
            buses: Vec::new(),
            nodes: SlotMap::with_key(),
            messages: SlotMap::with_key(),
            signals: SlotMap::with_key(),
            nodes_order: Vec::new(),
            messages_order: Vec::new(),
            signals_order: Vec::new(),
            attributes: BTreeMap::new(),
            db_attr_spec: BTreeMap::new(),
            node_attr_spec: BTreeMap::new(),
            msg_attr_spec: BTreeMap::new(),
            sig_attr_spec: BTreeMap::new(),
            env_var_comments: BTreeMap::new(),
            frame_id_mask: 0xFFFF_FFFF,
            strict: true,
            node_key_by_name: HashMap::new(),
            msg_key_by_id: HashMap::new(),
            msg_key_by_hex: HashMap::new(),
            msg_key_by_name: HashMap::new(),
            sig_key_by_name: HashMap::new(),
            current_msg: None,
        }
    }
}

impl Database {
    /// Reads and parses a `.dbc` file (WINDOWS-1252 encoded).
    pub fn load(path: &str) -> Result<Self, ParseError> {
        crate::parse::from_file(path)
    }

    /// Parses DBC text into a fresh database.
    pub fn from_string(text: &str) -> Result<Self, Error> {
        let mut db = Database::default();
        db.add_string(text)?;
        Ok(db)
    }

    /// Parses DBC text and appends it to this database, then refreshes.
    /// Entities already present keep their identity; duplicates follow
    /// last-write-wins with a warning.
    pub fn add_string(&mut self, text: &str) -> Result<(), Error> {
        crate::parse::parse_into(self, text);
        self.refresh()
    }

    /// Serializes the database as DBC text.
    pub fn as_dbc_string(&self) -> Result<String, SaveError> {
        crate::save::to_dbc_string(self)
    }

    /// Serializes the database and writes it to `path`.
    pub fn save_to_file(&self, path: &str) -> Result<(), SaveError> {
        crate::save::save_to_file(path, self)
    }

    // --------- Nodes --------
    /// Adds a node to the database if not already present and returns
    /// the corresponding `NodeKey`.
    pub fn add_node(&mut self, name: &str) -> NodeKey {
        if let Some(key) = self.get_node_key_by_name(name) {
            return key;
        }
        let key: NodeKey = self.nodes.insert(Node {
            name: name.to_string(),
            ..Default::default()
        });
        self.nodes_order.push(key);
        self.node_key_by_name.insert(name.to_lowercase(), key);
        key
    }

    pub fn get_node_key_by_name(&self, name: &str) -> Option<NodeKey> {
        self.node_key_by_name.get(&name.to_lowercase()).copied()
    }

    pub fn get_node_by_key(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_node_by_key_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Returns a `&Node` given the name (case-insensitive).
    pub fn get_node_by_name(&self, name: &str) -> Option<&Node> {
        let key: NodeKey = self.get_node_key_by_name(name)?;
        self.get_node_by_key(key)
    }

    /// Returns a `&mut Node` given the name (case-insensitive).
    pub fn get_node_by_name_mut(&mut self, name: &str) -> Option<&mut Node> {
        let key: NodeKey = self.get_node_key_by_name(name)?;
        self.get_node_by_key_mut(key)
    }

    /// Finds the node listening on or transmitting with the given
    /// transport-protocol identifier.
    pub fn get_node_by_tp_identifier(&self, identifier: i64) -> Option<&Node> {
        self.iter_nodes().find(|node| {
            node.tp_rx_identifier(self) == Some(identifier)
                || node.tp_tx_identifier(self) == Some(identifier)
        })
    }

    /// Insert `msg_key` in `messages_sent` of node `node_key`, plus the
    /// message signals in `signals_sent`. No duplicates.
    pub fn add_tx_msg_for_node(&mut self, node_key: NodeKey, msg_key: MessageKey) {
        let msg_signals: Vec<SignalKey> = {
            let Some(message) = self.get_message_by_key(msg_key) else {
                return;
            };
            message.signals.clone()
        };

        if let Some(node) = self.get_node_by_key_mut(node_key) {
            if !node.messages_sent.contains(&msg_key) {
                node.messages_sent.push(msg_key);
            }
            for sig_key in msg_signals {
                if !node.signals_sent.contains(&sig_key) {
                    node.signals_sent.push(sig_key);
                }
            }
        }
    }

    // ------------- Messages ------------
    /// Adds a message and indexes its id/name. Also sets `current_msg`
    /// for subsequent SG_ lines. `dbc_id` carries the extended-frame
    /// flag in bit 31, as on the BO_ line.
    pub fn add_message(
        &mut self,
        name: &str,
        dbc_id: u32,
        byte_length: u16,
        sender_name: Option<&str>,
    ) -> MessageKey {
        if let Some(key) = self.get_msg_key_by_name(name) {
            self.current_msg = Some(key);
            return key;
        }

        let id = dbc_id & CAN_EFF_MASK;
        let id_format = if dbc_id & CAN_EFF_FLAG != 0 || id > CAN_SFF_MASK {
            IdFormat::Extended
        } else {
            IdFormat::Standard
        };
        let id_hex = format!("0x{:X}", id);

        let sender_key = sender_name
            .filter(|sender| !sender.is_empty() && *sender != "Vector__XXX")
            .map(|sender| self.add_node(sender));

        let msg_key: MessageKey = self.messages.insert(Message {
            id_format,
            id,
            id_hex: id_hex.clone(),
            frame_id: FrameId::Raw(id),
            name: name.to_string(),
            byte_length,
            msgtype: if byte_length <= 8 {
                "CAN".into()
            } else {
                "CAN FD".into()
            },
            sender_nodes: sender_key.into_iter().collect(),
            ..Default::default()
        });

        self.messages_order.push(msg_key);
        self.msg_key_by_id
            .insert(id & self.frame_id_mask, msg_key);
        self.msg_key_by_hex.insert(id_hex, msg_key);
        self.msg_key_by_name.insert(name.to_lowercase(), msg_key);

        if let Some(node_key) = sender_key
            && let Some(node) = self.nodes.get_mut(node_key)
        {
            node.messages_sent.push(msg_key);
        }

        self.current_msg = Some(msg_key);
        msg_key
    }

    pub fn get_msg_key_by_name(&self, name: &str) -> Option<MessageKey> {
        self.msg_key_by_name.get(&name.to_lowercase()).copied()
    }

    pub fn get_msg_key_by_id(&self, id: u32) -> Option<MessageKey> {
        self.msg_key_by_id.get(&(id & self.frame_id_mask)).copied()
    }

    pub fn get_message_by_key(&self, key: MessageKey) -> Option<&Message> {
        self.messages.get(key)
    }

    pub fn get_message_by_key_mut(&mut self, key: MessageKey) -> Option<&mut Message> {
        self.messages.get_mut(key)
    }

    /// Returns a `&Message` given the numeric CAN ID. Falls back to
    /// variant equality, so e.g. a GM parameter id matches regardless
    /// of the request type.
    pub fn get_message_by_id(&self, id: u32) -> Option<&Message> {
        if let Some(key) = self.get_msg_key_by_id(id) {
            return self.get_message_by_key(key);
        }
        self.iter_messages().find(|message| message.frame_id == id)
    }

    /// Returns a `&Message` given a normalized hexadecimal ID.
    pub fn get_message_by_id_hex(&self, id_hex: &str) -> Option<&Message> {
        let key = self.msg_key_by_hex.get(id_hex).copied()?;
        self.get_message_by_key(key)
    }

    /// Returns a `&Message` given the name (case-insensitive).
    pub fn get_message_by_name(&self, name: &str) -> Option<&Message> {
        let key: MessageKey = self.get_msg_key_by_name(name)?;
        self.get_message_by_key(key)
    }

    /// Returns a `&mut Message` given the name (case-insensitive).
    pub fn get_message_by_name_mut(&mut self, name: &str) -> Option<&mut Message> {
        let key: MessageKey = self.get_msg_key_by_name(name)?;
        self.get_message_by_key_mut(key)
    }

    /// Finds a message by name or frame id.
    pub fn get_message<'a>(&self, message: impl Into<MessageRef<'a>>) -> Option<&Message> {
        match message.into() {
            MessageRef::Name(name) => self.get_message_by_name(name),
            MessageRef::Id(id) => self.get_message_by_id(id),
        }
    }

    /// Finds the bus with the given name.
    pub fn get_bus(&self, name: &str) -> Option<&Bus> {
        self.buses.iter().find(|bus| bus.name == name)
    }

    // -------------- Signals ------------
    /// Adds a signal to the current message. Valid only while building
    /// the database (uses `current_msg`).
    #[allow(clippy::too_many_arguments)]
    pub fn add_signal(
        &mut self,
        name: &str,
        bit_start: u16,
        bit_length: u16,
        endian: Endianness,
        sign: Signess,
        factor: f64,
        offset: f64,
        min: Option<f64>,
        max: Option<f64>,
        unit: &str,
        receiver_nodes: Vec<NodeKey>,
        mux_role: MuxRole,
        mux_ids: Vec<i64>,
    ) -> SignalKey {
        let msg_key: MessageKey = match self.current_msg {
            Some(key) => key,
            // Create a fallback message if an SG_ appears before any BO_ (rare).
            None => self.add_message("_Independent_Signal_", 0, 8, None),
        };

        // If the signal is multiplexed, guess the switch when the
        // message has exactly one multiplexor so far. SG_MUL_VAL_ lines
        // re-target it later for extended multiplexing.
        let inferred_switch: Option<SignalKey> = if mux_role.is_multiplexed() {
            let switches = self.message_multiplexors(msg_key);
            if switches.len() == 1 {
                Some(switches[0])
            } else {
                None
            }
        } else {
            None
        };

        let signal = Signal {
            message: msg_key,
            name: name.to_string(),
            bit_start,
            bit_length,
            endian,
            sign,
            factor,
            offset,
            min,
            max,
            unit: unit.to_string(),
            receiver_nodes: receiver_nodes.clone(),
            mux_role,
            mux_switch: inferred_switch,
            mux_ids,
            ..Default::default()
        };

        let sig_key: SignalKey = self.signals.insert(signal);
        self.signals_order.push(sig_key);
        self.sig_key_by_name.insert(name.to_lowercase(), sig_key);

        if let Some(message) = self.messages.get_mut(msg_key)
            && !message.signals.contains(&sig_key)
        {
            message.signals.push(sig_key);
        }

        // Back-link: each receiver node reads this signal.
        for node_key in receiver_nodes {
            if let Some(node) = self.get_node_by_key_mut(node_key)
                && !node.signals_read.contains(&sig_key)
            {
                node.signals_read.push(sig_key);
            }
        }

        sig_key
    }

    /// Multiplexor switches declared in a message, in signal order.
    pub(crate) fn message_multiplexors(&self, msg_key: MessageKey) -> Vec<SignalKey> {
        let Some(message) = self.get_message_by_key(msg_key) else {
            return Vec::new();
        };
        message
            .signals
            .iter()
            .copied()
            .filter(|&sig_key| {
                self.get_sig_by_key(sig_key)
                    .is_some_and(|signal| signal.mux_role.is_multiplexor())
            })
            .collect()
    }

    pub fn get_sig_key_by_name(&self, name: &str) -> Option<SignalKey> {
        self.sig_key_by_name.get(&name.to_lowercase()).copied()
    }

    pub fn get_sig_by_key(&self, key: SignalKey) -> Option<&Signal> {
        self.signals.get(key)
    }

    pub fn get_sig_by_key_mut(&mut self, key: SignalKey) -> Option<&mut Signal> {
        self.signals.get_mut(key)
    }

    /// Returns a `&Signal` given the name (case-insensitive).
    pub fn get_signal_by_name(&self, name: &str) -> Option<&Signal> {
        let key: SignalKey = self.get_sig_key_by_name(name)?;
        self.get_sig_by_key(key)
    }

    /// Returns a `&mut Signal` given the name (case-insensitive).
    pub fn get_signal_by_name_mut(&mut self, name: &str) -> Option<&mut Signal> {
        let key: SignalKey = self.get_sig_key_by_name(name)?;
        self.get_sig_by_key_mut(key)
    }

    // -------------- Iteration ------------
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_order.iter().filter_map(|&key| self.nodes.get(key))
    }

    pub fn iter_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages_order
            .iter()
            .filter_map(|&key| self.messages.get(key))
    }

    pub fn iter_signals(&self) -> impl Iterator<Item = &Signal> + '_ {
        self.signals_order
            .iter()
            .filter_map(|&key| self.signals.get(key))
    }

    // -------------- Attributes ------------
    /// Looks up the database attribute `name`, falling back to the
    /// `BA_DEF_DEF_` default.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .get(name)
            .or_else(|| self.db_attr_spec.get(name)?.default.as_ref())
    }

    /// The network protocol type (`ProtocolType`), e.g. `"J1939"`.
    pub fn protocol_type(&self) -> Option<&str> {
        self.attribute("ProtocolType")?.as_str()
    }

    /// Whether frame ids carry GM parameter ids (`UseGMParameterIDs`).
    pub fn use_gm_parameter_ids(&self) -> bool {
        match self.attribute("UseGMParameterIDs") {
            Some(AttributeValue::Str(value) | AttributeValue::Enum(value)) => {
                value == "Yes" || value == "1"
            }
            Some(value) => value.as_i64().unwrap_or(0) != 0,
            None => false,
        }
    }

    /// The network type (`BusType`), e.g. `"CAN"`.
    pub fn bus_type(&self) -> Option<&str> {
        self.attribute("BusType")?.as_str()
    }

    /// The database name (`DBName`).
    pub fn db_name(&self) -> Option<&str> {
        self.attribute("DBName")?.as_str()
    }

    /// The OEM (`Manufacturer`).
    pub fn manufacturer(&self) -> Option<&str> {
        self.attribute("Manufacturer")?.as_str()
    }

    // -------------- Codec entry points ------------
    /// Encode given signal data as the message identified by name or
    /// frame id. `data` is a dictionary of signal name-value entries.
    pub fn encode_message<'a>(
        &self,
        message: impl Into<MessageRef<'a>>,
        data: &BTreeMap<String, Value>,
        scaling: bool,
        padding: bool,
        strict: bool,
    ) -> Result<TxFrame, EncodeError> {
        let message_ref = message.into();
        let message =
            self.get_message(message_ref)
                .ok_or_else(|| EncodeError::UnknownMessage {
                    message: message_ref.to_string(),
                })?;
        message.encode(self, data, scaling, padding, strict)
    }

    /// Decode the payload of the message identified by name or frame
    /// id. Returns the decoded signal name-value entries.
    pub fn decode_message<'a>(
        &self,
        message: impl Into<MessageRef<'a>>,
        data: &[u8],
        decode_choices: bool,
        scaling: bool,
    ) -> Result<RxFrame, DecodeError> {
        let message_ref = message.into();
        let message =
            self.get_message(message_ref)
                .ok_or_else(|| DecodeError::UnknownMessage {
                    message: message_ref.to_string(),
                })?;
        message.decode(self, data, decode_choices, scaling)
    }

    // -------------- Refresh ------------
    /// Refresh the internal database state with the configured
    /// strictness. Must be called after modifying messages or signals
    /// and before the next encode/decode.
    pub fn refresh(&mut self) -> Result<(), Error> {
        self.refresh_with(self.strict)
    }

    /// Refresh with an explicit strictness, overriding the configured
    /// one: strict mode fails on the first layout violation, otherwise
    /// violations are logged.
    pub fn refresh_with(&mut self, strict: bool) -> Result<(), Error> {
        self.rebuild_lookup_maps();

        let use_gm = self.use_gm_parameter_ids();
        let j1939 = self.protocol_type() == Some("J1939");

        let msg_keys = self.messages_order.clone();
        for msg_key in msg_keys {
            self.refresh_message(msg_key, strict, use_gm, j1939)?;
        }

        self.rebuild_buses();
        Ok(())
    }

    fn rebuild_lookup_maps(&mut self) {
        self.msg_key_by_id.clear();
        self.msg_key_by_hex.clear();
        self.msg_key_by_name.clear();

        let entries: Vec<(MessageKey, String, u32, String)> = self
            .messages_order
            .iter()
            .filter_map(|&key| {
                self.messages
                    .get(key)
                    .map(|message| (key, message.name.clone(), message.id, message.id_hex.clone()))
            })
            .collect();

        for (key, name, id, id_hex) in entries {
            let lower = name.to_lowercase();
            if let Some(&previous) = self.msg_key_by_name.get(&lower)
                && previous != key
            {
                tracing::warn!(
                    "Overwriting message '{}' in the name to message dictionary.",
                    name
                );
            }

            let masked = id & self.frame_id_mask;
            if let Some(&previous) = self.msg_key_by_id.get(&masked)
                && previous != key
            {
                tracing::warn!(
                    "Overwriting message '{}' in the frame id to message dictionary \
                     because of the identical masked frame id 0x{:x}.",
                    name,
                    masked
                );
            }

            self.msg_key_by_name.insert(lower, key);
            self.msg_key_by_id.insert(masked, key);
            self.msg_key_by_hex.insert(id_hex, key);
        }

        self.sig_key_by_name.clear();
        let signal_names: Vec<(SignalKey, String)> = self
            .signals_order
            .iter()
            .filter_map(|&key| {
                self.signals
                    .get(key)
                    .map(|signal| (key, signal.name.to_lowercase()))
            })
            .collect();
        for (key, name) in signal_names {
            self.sig_key_by_name.insert(name, key);
        }
    }

    fn refresh_message(
        &mut self,
        msg_key: MessageKey,
        strict: bool,
        use_gm: bool,
        j1939: bool,
    ) -> Result<(), Error> {
        let (msg_name, id, extended, signal_keys) = {
            let Some(message) = self.messages.get(msg_key) else {
                return Ok(());
            };
            (
                message.name.clone(),
                message.id,
                message.id_format == IdFormat::Extended,
                message.signals.clone(),
            )
        };

        if extended {
            if id > CAN_EFF_MASK {
                return Err(Error::ExtendedFrameIdTooWide {
                    id,
                    message: msg_name,
                });
            }
        } else if id > CAN_SFF_MASK {
            return Err(Error::StandardFrameIdTooWide {
                id,
                message: msg_name,
            });
        }

        // Signals of zero length reject the message outright.
        for &sig_key in &signal_keys {
            if let Some(signal) = self.signals.get(sig_key)
                && signal.bit_length == 0
            {
                return Err(Error::ZeroBitLength {
                    signal: signal.name.clone(),
                    length: signal.bit_length,
                    message: msg_name.clone(),
                });
            }
        }

        // Late-bound multiplexer switches: a dependent signal parsed
        // before its switch links up once the switch exists.
        let switches = self.message_multiplexors(msg_key);
        let root_switches = switches
            .iter()
            .filter(|&&key| {
                self.signals
                    .get(key)
                    .is_some_and(|signal| signal.mux_switch.is_none())
            })
            .count();
        if root_switches > 1 {
            if strict {
                return Err(Error::MultipleRootMultiplexers { message: msg_name });
            }
            tracing::warn!("Message {} has more than one root multiplexer.", msg_name);
        }
        if switches.len() == 1 {
            let switch = switches[0];
            for &sig_key in &signal_keys {
                if let Some(signal) = self.signals.get_mut(sig_key)
                    && signal.mux_role.is_multiplexed()
                    && signal.mux_switch.is_none()
                    && sig_key != switch
                {
                    signal.mux_switch = Some(switch);
                }
            }
        }

        // Sort the signal list by linearized start bit.
        let mut sorted = signal_keys;
        sorted.sort_by_key(|&sig_key| {
            self.signals
                .get(sig_key)
                .map(|signal| signal.start_bit())
                .unwrap_or(u16::MAX)
        });

        let frame_id = if use_gm {
            if extended {
                FrameId::GmParameterIdExtended(GmParameterIdExtended::from_frame_id(id))
            } else {
                FrameId::GmParameterId(GmParameterId::from_frame_id(id))
            }
        } else if j1939 {
            FrameId::J1939(J1939FrameId::from_frame_id(id)?)
        } else {
            FrameId::Raw(id)
        };

        if let Some(message) = self.messages.get_mut(msg_key) {
            message.signals = sorted;
            message.frame_id = frame_id;
            message.codec = None;
        }

        let codec = {
            let Some(message) = self.messages.get(msg_key) else {
                return Ok(());
            };
            let codec = codec::create_codec(self, message);
            codec::validate::check_message(self, message, &codec, strict)?;
            codec
        };

        if let Some(message) = self.messages.get_mut(msg_key) {
            message.codec = Some(codec);
        }

        Ok(())
    }

    fn rebuild_buses(&mut self) {
        self.buses.clear();
        let name = self.db_name().map(str::to_string);
        let baudrate = self
            .attribute("Baudrate")
            .and_then(AttributeValue::as_i64)
            .and_then(|baudrate| u32::try_from(baudrate).ok());

        if name.is_some() || baudrate.is_some() {
            self.buses.push(Bus {
                name: name.unwrap_or_default(),
                comment: String::new(),
                baudrate,
            });
        }
    }

    /// Clear the database
    pub fn clear(&mut self) {
        *self = Database::default();
    }
}
