/// Alphabet for generated public names. Visually ambiguous characters
/// (`l`, `o`, `O`, `I`, `0`, `1`) are left out.
pub const PUBLIC_NAME_ALPHABET: &[u8] =
    b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of the random token part of a public name.
pub const PUBLIC_NAME_TOKEN_LEN: usize = 8;

/// Group id seeded by the initial migration.
pub const DEFAULT_GROUP_ID: i32 = 0;

pub const MAX_QUALITY: i32 = 100;
pub const MAX_EFFORT: i32 = 10;
