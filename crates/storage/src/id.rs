use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of every generated id.
pub const ID_LENGTH: usize = 22;

/// Generate an opaque 22-character alphanumeric id.
pub fn generate_id() -> String {
    generate_id_with(&mut rand::thread_rng())
}

/// Generate an id from the given random source.
pub fn generate_id_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ids_are_alphanumeric_and_fixed_length() {
        let id = generate_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let a = generate_id_with(&mut StdRng::seed_from_u64(7));
        let b = generate_id_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
