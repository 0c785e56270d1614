//! Network byte-order helpers for the durable record header.
//!
//! Keeping the conversions here scopes the Clippy expectation to the one
//! place that deliberately writes big-endian bytes.

/// Serialise a `u16` in network byte order (big-endian).
///
/// ```
/// use as2relay::byte_order::write_network_u16;
///
/// assert_eq!(write_network_u16(0x0102), [0x01, 0x02]);
/// ```
#[must_use]
pub fn write_network_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Record headers are written in network byte order."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `u16`.
///
/// ```
/// use as2relay::byte_order::read_network_u16;
///
/// assert_eq!(read_network_u16([0x01, 0x02]), 0x0102);
/// ```
#[must_use]
pub fn read_network_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Record headers are written in network byte order."
    )]
    u16::from_be_bytes(bytes)
}
