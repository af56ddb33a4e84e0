// src/services/order_number.rs

use chrono::Utc;
use rand::Rng;
use rand::rngs::OsRng;

pub const ORDER_PREFIX: &str = "LT";

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RANDOM_LEN: usize = 8;

/// Genera un número de pedido `LT-YYMMDD-XXXXXXXX` (fecha UTC).
///
/// El sufijo sale de `OsRng`: el número de pedido es la clave pública de
/// consulta del cliente y no puede ser adivinable. La unicidad real la
/// garantiza la restricción UNIQUE de `orders.order_number`; una colisión
/// se manifiesta como error de conflicto, nunca como sobreescritura.
pub fn generate_order_number() -> String {
    let date = Utc::now().format("%y%m%d");
    let mut rng = OsRng;
    let suffix: String = (0..RANDOM_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{ORDER_PREFIX}-{date}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // Patrón esperado: LT-\d{6}-[A-Z0-9]{8}
    #[test]
    fn matches_expected_pattern() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ORDER_PREFIX);
        assert_eq!(parts[1].len(), 6);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn ten_thousand_generations_without_collision() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_order_number()));
        }
    }
}
