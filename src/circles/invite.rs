//! Invite codes in the same shape the backend issues them.

use rand::Rng;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 8;

/// Eight characters from `A-Z0-9`, e.g. `AB12CD34`.
pub fn generate() -> String {
  let mut rng = rand::thread_rng();
  (0..CODE_LENGTH)
    .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
    .collect()
}

/// The same code split for reading aloud, e.g. `AB12-CD34`.
pub fn generate_readable() -> String {
  let code = generate();
  format!("{}-{}", &code[..4], &code[4..])
}

pub fn is_valid(code: &str) -> bool {
  let normalized: String = code.chars().filter(|c| *c != '-').collect();
  normalized.len() == CODE_LENGTH
    && normalized
      .chars()
      .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
