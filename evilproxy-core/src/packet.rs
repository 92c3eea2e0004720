//! The [`Packet`] type, the atomic unit of simulated transport.

/// A unit of data in flight over a simulated transport.
///
/// A packet carries TCP-shaped control information alongside its payload.
/// This layer attaches no meaning to the fields: producers set whatever the
/// layer above them calls for, nothing is validated, and a packet with
/// contradictory flags is a protocol concern rather than a transport one.
/// Ownership transfers with the packet. A sender gives a packet up when it
/// sends it and the receiver becomes sole owner on delivery, free to mutate
/// the payload in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The control bits for this packet.
    pub flags: Flags,
    /// The sequence number of the first payload byte.
    pub seq: u32,
    /// The next sequence number the sender expects to receive.
    pub ack: u32,
    /// The sender's advertised receive window.
    pub window: u16,
    /// The bytes this packet carries. May be empty, as for a bare SYN.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Creates a data-only packet. No flags are set and the sequence fields
    /// are zeroed.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Creates the empty SYN packet that opens a simulated conversation.
    pub fn syn(seq: u32) -> Self {
        Self {
            flags: Flags::new(true, false, false),
            seq,
            ..Self::default()
        }
    }
}

/// The control bits of a [`Packet`].
#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub struct Flags(u8);

impl Flags {
    /// Create a new set of control bits with the given flags.
    pub const fn new(syn: bool, ack: bool, fin: bool) -> Self {
        Self(syn as u8 | (ack as u8) << 1 | (fin as u8) << 2)
    }

    /// Get whether sequence numbers are being synchronized
    pub const fn syn(self) -> bool {
        self.bit(0)
    }

    /// Set whether sequence numbers are being synchronized
    pub fn set_syn(&mut self, state: bool) {
        self.set_bit(0, state);
    }

    /// Get whether the acknowledgment field is significant
    pub const fn ack(self) -> bool {
        self.bit(1)
    }

    /// Set whether the acknowledgment field is significant
    pub fn set_ack(&mut self, state: bool) {
        self.set_bit(1, state);
    }

    /// Get whether there is no more data to send
    pub const fn fin(self) -> bool {
        self.bit(2)
    }

    /// Set whether there is no more data to send
    pub fn set_fin(&mut self, state: bool) {
        self.set_bit(2, state);
    }

    /// Get the given bit
    const fn bit(self, bit: u8) -> bool {
        (self.0 >> bit) & 0b1 == 1
    }

    /// Set the given bit
    fn set_bit(&mut self, bit: u8, state: bool) {
        self.0 = (self.0 & !(1 << bit)) | ((state as u8) << bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_packet_is_empty() {
        let packet = Packet::default();
        assert_eq!(packet.flags, Flags::default());
        assert_eq!(packet.seq, 0);
        assert_eq!(packet.ack, 0);
        assert_eq!(packet.window, 0);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn data_packet_carries_only_payload() {
        let packet = Packet::new(b"stuff".to_vec());
        assert_eq!(packet.payload, b"stuff");
        assert_eq!(packet.flags, Flags::default());
    }

    #[test]
    fn syn_packet() {
        let packet = Packet::syn(42);
        assert!(packet.flags.syn());
        assert!(!packet.flags.ack());
        assert!(!packet.flags.fin());
        assert_eq!(packet.seq, 42);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn flags_set_and_clear() {
        let mut flags = Flags::default();
        flags.set_ack(true);
        flags.set_fin(true);
        assert!(flags.ack());
        assert!(flags.fin());
        assert!(!flags.syn());
        flags.set_ack(false);
        assert!(!flags.ack());
        assert!(flags.fin());
    }

    #[test]
    fn multiple_flags_may_coexist() {
        // SYN+FIN is nonsense at the protocol layer but not at this one
        let flags = Flags::new(true, false, true);
        assert!(flags.syn());
        assert!(flags.fin());
    }
}
