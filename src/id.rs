use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

static FIELD_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldId(pub u64);

impl FieldId {
    pub fn next() -> Self {
        Self(FIELD_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FieldId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "field-{}", self.0)
    }
}

/// Per-field `autocomplete` token used when the form turns autocomplete off. Browsers ignore
/// `off` on many inputs but will not autofill an attribute value they have never seen.
pub fn autocomplete_token(name: &str, id: FieldId) -> String {
    let seed = format!("{name}:{}", id.0);
    format!("ac-{:012x}", fnv1a64(seed.as_bytes()) & 0xffff_ffff_ffff)
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x00000100000001b3;

    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_stable_for_same_field() {
        let id = FieldId::next();
        assert_eq!(autocomplete_token("email", id), autocomplete_token("email", id));
    }

    #[test]
    fn token_differs_between_fields() {
        let first = autocomplete_token("email", FieldId::next());
        let second = autocomplete_token("email", FieldId::next());
        assert_ne!(first, second);
        assert!(first.starts_with("ac-"));
        assert_eq!(first.len(), 15);
    }
}
