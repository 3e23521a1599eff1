/// The crc32 checksum of a payload, used to tag media writes in logs.
#[inline]
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
