/// Hex md5 of a published sprite. Readers compare it to notice that the sprite changed.
pub fn revision(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}
