use common::messages::cops::{CopsObject, Packet};

pub fn test_write<T: CopsObject>(object: &T, bytes: &[u8]) {
    let data = object.to_bytes().unwrap();
    assert_eq!(data, bytes, "write failed");
    assert_eq!(data.len() % 4, 0, "object not padded");
}

pub fn test_packet(bytes: &[u8]) -> Packet {
    let packet = Packet::read(bytes).unwrap();
    assert_eq!(packet.to_bytes().unwrap(), bytes, "to_bytes failed");
    packet
}
