use std::collections::BTreeMap;

use crate::types::attributes::AttributeValue;
use crate::types::database::{Database, MessageKey, SignalKey};

/// Node/ECU defined in the database.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct Node {
    /// Node/ECU name.
    pub name: String,
    /// Associated comment
    pub comment: String,
    /// Messages transmitted by this node.
    pub messages_sent: Vec<MessageKey>,
    /// Signals transmitted by this node.
    pub signals_sent: Vec<SignalKey>,
    /// Signals read by this node.
    pub signals_read: Vec<SignalKey>,

    // --- Attributes ---
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Node {
    /// Looks up the node attribute `name`, falling back to the
    /// database-wide `BA_DEF_DEF_` default.
    pub fn attribute<'a>(&'a self, db: &'a Database, name: &str) -> Option<&'a AttributeValue> {
        self.attributes
            .get(name)
            .or_else(|| db.node_attr_spec.get(name)?.default.as_ref())
    }

    /// Identifier this node transmits with (`TpTxIdentifier`).
    ///
    /// A sending-node encode writes it into the J1939 source address or
    /// the GM extended source id.
    pub fn tp_tx_identifier(&self, db: &Database) -> Option<i64> {
        self.attribute(db, "TpTxIdentifier")?.as_i64()
    }

    /// Identifier this node listens on (`TpRxIdentifier`).
    pub fn tp_rx_identifier(&self, db: &Database) -> Option<i64> {
        self.attribute(db, "TpRxIdentifier")?.as_i64()
    }

    /// The network-management station address (`NmStationAddress`).
    pub fn nm_station_address(&self, db: &Database) -> Option<i64> {
        self.attribute(db, "NmStationAddress")?.as_i64()
    }
}
