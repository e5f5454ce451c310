/// CAN bus described by the database.
///
/// DBC has no first-class bus entity; `Database::refresh` rebuilds this
/// from the `DBName`, `Baudrate` and `BusType` attributes.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct Bus {
    /// Bus name (the `DBName` attribute).
    pub name: String,
    /// Associated comment.
    pub comment: String,
    /// Nominal baudrate in bit/s, when declared.
    pub baudrate: Option<u32>,
}
