use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub(crate) const JOIN_CODE_LEN: usize = 8;

/// Random classroom join code; the alphabet leaves out look-alike characters.
pub(crate) fn generate_join_code() -> String {
    let mut rng = rand::thread_rng();
    let mut output = String::with_capacity(JOIN_CODE_LEN);
    for _ in 0..JOIN_CODE_LEN {
        let index = rng.gen_range(0..ALPHABET.len());
        output.push(ALPHABET[index] as char);
    }
    output
}

pub(crate) fn normalize_join_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
