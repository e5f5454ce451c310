use crate::types::database::Database;
use crate::types::frame_id::CAN_EFF_MASK;

/// `BO_TX_BU_ <ID> : <node>,<node>,...;`
///
/// Additional transmitting nodes of a message beyond the BO_ sender.
pub(crate) fn decode(db: &mut Database, line: &str) {
    let content = line.trim_start().trim_start_matches("BO_TX_BU_").trim();

    let mut parts = content.splitn(2, ':');
    let id_str = parts.next().unwrap_or("").trim();
    let nodes_str = parts.next().unwrap_or("").trim().trim_end_matches(';');

    let Ok(dbc_id) = id_str.parse::<u32>() else {
        return;
    };

    let Some(msg_key) = db.get_msg_key_by_id(dbc_id & CAN_EFF_MASK) else {
        return;
    };

    for node_name in nodes_str
        .split(',')
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && *name != "Vector__XXX")
    {
        let node_key = db.add_node(node_name);
        if let Some(message) = db.get_message_by_key_mut(msg_key)
            && !message.sender_nodes.contains(&node_key)
        {
            message.sender_nodes.push(node_key);
        }
        db.add_tx_msg_for_node(node_key, msg_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_nodes() {
        let mut db = Database::default();
        db.add_message("TestMessage", 2549940736, 8, Some("Motor"));

        decode(&mut db, "BO_TX_BU_ 2549940736 : Infotainment,Gateway;");

        let msg = db.get_message_by_name("TestMessage").unwrap();
        assert_eq!(msg.sender_nodes.len(), 3);
        let names: Vec<&str> = msg.senders(&db).map(|node| node.name.as_str()).collect();
        assert!(names.contains(&"Motor"));
        assert!(names.contains(&"Infotainment"));
        assert!(names.contains(&"Gateway"));

        // Adding the same line again must not create duplicates.
        decode(&mut db, "BO_TX_BU_ 2549940736 : Infotainment,Gateway;");
        let msg = db.get_message_by_name("TestMessage").unwrap();
        assert_eq!(msg.sender_nodes.len(), 3);
    }
}
