//! # can_codec
//!
//! Rust model of **Vector CANdb++ DBC** databases with a full signal
//! codec: encode application signal dictionaries into CAN frame
//! payloads and decode received payloads back into named values.
//!
//! ## Highlights
//! - **DBC parser/writer**: load `.dbc` files (WINDOWS-1252) into a
//!   SlotMap-backed [`Database`](crate::types::database::Database) and
//!   serialize them back out.
//! - **Stable keys**: Nodes/Messages/Signals use SlotMap keys that
//!   remain valid across reordering.
//! - **Signal codec**: bit-exact packing for mixed Motorola/Intel
//!   layouts, signed/unsigned/IEEE-float fields, exact-decimal
//!   scaling, choice labels and hierarchical multiplexing.
//! - **Frame identifiers**: raw 11/29-bit, SAE J1939 and GM parameter
//!   id (standard/extended) interpretations with bit-exact
//!   pack/unpack, selected per database attributes.
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use can_codec::{Database, Value};
//!
//! let db = Database::load("OBDII.dbc").unwrap();
//! let mut data: BTreeMap<String, Value> = BTreeMap::new();
//! data.insert("mode".into(), Value::Integer(1));
//! data.insert("pid".into(), Value::Integer(0x0D));
//! data.insert("length_tx".into(), Value::Integer(2));
//! let frame = db.encode_message("TX", &data, true, false, true).unwrap();
//! let decoded = db.decode_message("TX", &frame.data, true, true).unwrap();
//! assert_eq!(decoded["pid"], Value::Integer(0x0D));
//! ```

pub(crate) mod codec;
pub(crate) mod core;
pub mod parse;
pub mod save;
pub mod types;
pub mod units;

pub use crate::types::database::{Database, MessageKey, MessageRef, NodeKey, SignalKey};
pub use crate::types::errors::{DecodeError, EncodeError, Error, ParseError, SaveError};
pub use crate::types::frame_data::{RxFrame, TxFrame, Value};
pub use crate::types::frame_id::{
    FrameId, GmParameterId, GmParameterIdExtended, J1939FrameId,
};
pub use crate::types::message::{IdFormat, Message, SignalGroup};
pub use crate::types::node::Node;
pub use crate::types::signal::{Endianness, MuxRole, Signal, Signess};
