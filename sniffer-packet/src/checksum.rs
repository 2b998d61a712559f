//! RFC 1071 Internet checksum, used when synthesizing frames

/// One's complement sum of big-endian 16-bit words, folded to 16 bits
fn ones_complement_sum(initial: u32, data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    let mut sum = chunks
        .by_ref()
        .fold(initial, |acc, w| acc + u16::from_be_bytes([w[0], w[1]]) as u32);

    // Odd trailing byte is padded with zero
    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum
}

/// Internet checksum over `data`
pub fn internet_checksum(data: &[u8]) -> u16 {
    !(ones_complement_sum(0, data) as u16)
}

/// TCP/UDP checksum including the IPv4 pseudo-header
pub fn transport_checksum(src_ip: &[u8; 4], dst_ip: &[u8; 4], protocol: u8, data: &[u8]) -> u16 {
    let mut pseudo = [0u8; 12];
    pseudo[0..4].copy_from_slice(src_ip);
    pseudo[4..8].copy_from_slice(dst_ip);
    pseudo[9] = protocol;
    pseudo[10..12].copy_from_slice(&(data.len() as u16).to_be_bytes());

    let sum = ones_complement_sum(ones_complement_sum(0, &pseudo), data);
    !(sum as u16)
}

/// True when `data`, checksum field included, sums to all ones
pub fn is_valid(data: &[u8]) -> bool {
    matches!(internet_checksum(data), 0 | 0xFFFF)
}
