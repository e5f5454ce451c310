use crate::types::database::Database;

/// `BU_: <node> <node> ...`
pub(crate) fn decode(db: &mut Database, line: &str) {
    let rest = line.trim_start().trim_start_matches("BU_").trim_start();
    let rest = rest.strip_prefix(':').unwrap_or(rest);

    for name in rest.split_ascii_whitespace() {
        if !name.is_empty() && name != "Vector__XXX" {
            db.add_node(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_list() {
        let mut db = Database::default();
        decode(&mut db, "BU_: BCM Gateway Infotainment");
        assert_eq!(db.iter_nodes().count(), 3);
        assert!(db.get_node_by_name("gateway").is_some());
    }
}
