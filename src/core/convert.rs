//! Conversion between the local and the foreign currency.
//!
//! `rate` is the price of one foreign unit in local units and must be positive;
//! the rate cache never hands out anything else.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToForeign,
    ToLocal,
}

pub fn to_foreign(amount: f64, rate: f64) -> f64 {
    amount / rate
}

pub fn to_local(amount: f64, rate: f64) -> f64 {
    amount * rate
}

pub fn convert(amount: f64, rate: f64, direction: Direction) -> f64 {
    match direction {
        Direction::ToForeign => to_foreign(amount, rate),
        Direction::ToLocal => to_local(amount, rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_directions() {
        assert_eq!(to_foreign(1175.0, 117.5), 10.0);
        assert_eq!(to_local(10.0, 117.5), 1175.0);
        assert_eq!(convert(234.46, 117.23, Direction::ToForeign), 2.0);
        assert_eq!(convert(2.0, 117.23, Direction::ToLocal), 234.46);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let rates = [0.0001, 0.92, 1.0, 117.23, 117.5, 15_000.0];
        let amounts = [0.01, 1.0, 99.99, 12_345.678, 1e9];

        for rate in rates {
            for amount in amounts {
                let back = to_local(to_foreign(amount, rate), rate);
                assert!(
                    ((back - amount) / amount).abs() < 1e-12,
                    "round trip of {amount} at {rate} gave {back}"
                );
            }
        }
    }
}
