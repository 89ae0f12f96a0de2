use rand::Rng;

pub const BOOKING_CODE_LEN: usize = 5;
pub const BOOKING_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const PAYMENT_CODE_DIGITS: usize = 16;

/// Source of payment and booking codes.
///
/// Uniqueness is ultimately enforced by the store; callers regenerate on
/// `ConflictError`.
pub trait CodeGenerator: Send + Sync {
    /// Numeric payment reference, `PAYMENT_CODE_DIGITS` long, no leading zero.
    fn payment_code(&self) -> String;

    /// `BOOKING_CODE_LEN` characters drawn uniformly from `BOOKING_CODE_ALPHABET`.
    fn booking_code(&self) -> String;
}

/// Backed by the thread-local generator, which is seeded from the OS once per thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn payment_code(&self) -> String {
        let mut rng = rand::thread_rng();
        let mut code = String::with_capacity(PAYMENT_CODE_DIGITS);
        code.push(char::from(b'0' + rng.gen_range(1..=9u8)));
        for _ in 1..PAYMENT_CODE_DIGITS {
            code.push(char::from(b'0' + rng.gen_range(0..=9u8)));
        }
        code
    }

    fn booking_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..BOOKING_CODE_LEN)
            .map(|_| char::from(BOOKING_CODE_ALPHABET[rng.gen_range(0..BOOKING_CODE_ALPHABET.len())]))
            .collect()
    }
}

pub fn is_booking_code(candidate: &str) -> bool {
    candidate.len() == BOOKING_CODE_LEN && candidate.bytes().all(|b| BOOKING_CODE_ALPHABET.contains(&b))
}
