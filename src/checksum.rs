//! Check digit algorithms used by carrier tracking numbers
//!
//! Every function takes the serial portion of a tracking number and the
//! check character as captured from it, and reports whether they agree.
//! Inputs are expected to be whitespace-free; letters are expected in
//! uppercase.

use serde::{Deserialize, Serialize};

/// Checksum algorithm and its parameters, as declared by a catalog definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ChecksumSpec {
    /// Serial as an integer, modulo 7 (DHL Express)
    Mod7,

    /// Weighted digit sum, modulo 10
    Mod10(Mod10Options),

    /// UPU S10 international item identifier
    S10,

    /// Positional weights followed by two successive moduli (FedEx Express)
    SumProductWithWeightingsAndModulo(WeightedModulo),

    /// ISO 7064 hybrid system with alphanumeric check character (DPD)
    #[serde(rename = "mod_37_36")]
    Mod3736,

    /// Luhn over the reversed digit sequence
    Luhn,
}

/// Largest multiplier or weight a definition may declare
pub const MAX_WEIGHT: u32 = 1_000;

/// Parameters of the mod 10 algorithm
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mod10Options {
    /// Walk the serial from its last character
    pub reverse: bool,

    /// Multiplier for odd (0-indexed) positions
    pub odds_multiplier: Option<u32>,

    /// Multiplier for even (0-indexed) positions
    pub evens_multiplier: Option<u32>,
}

/// Parameters of the weighted sum with double modulo algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedModulo {
    pub weightings: Vec<u32>,
    pub modulo1: u32,
    pub modulo2: u32,
}

impl ChecksumSpec {
    /// Run the algorithm against a serial and its check character
    #[must_use]
    pub fn validates(&self, serial: &str, check_digit: &str) -> bool {
        match self {
            Self::Mod7 => mod7(serial, check_digit),
            Self::Mod10(options) => mod10(serial, check_digit, options),
            Self::S10 => s10(serial, check_digit),
            Self::SumProductWithWeightingsAndModulo(params) => {
                sum_product_with_weightings_and_modulo(serial, check_digit, params)
            }
            Self::Mod3736 => mod_37_36(serial, check_digit),
            Self::Luhn => luhn(serial, check_digit),
        }
    }

    /// Reject parameters no real carrier uses: zero moduli and multipliers
    /// or weights above [`MAX_WEIGHT`].
    pub fn check_parameters(&self) -> std::result::Result<(), String> {
        let weights: Vec<u32> = match self {
            Self::Mod10(options) => options
                .odds_multiplier
                .into_iter()
                .chain(options.evens_multiplier)
                .collect(),
            Self::SumProductWithWeightingsAndModulo(params) => {
                if params.modulo1 == 0 || params.modulo2 == 0 {
                    return Err(format!("{} modulus must be non-zero", self.name()));
                }
                params.weightings.clone()
            }
            Self::Mod7 | Self::S10 | Self::Mod3736 | Self::Luhn => Vec::new(),
        };

        match weights.iter().find(|&&w| w > MAX_WEIGHT) {
            Some(w) => Err(format!("{} weight {w} exceeds {MAX_WEIGHT}", self.name())),
            None => Ok(()),
        }
    }

    /// Catalog name of the algorithm
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mod7 => "mod7",
            Self::Mod10(_) => "mod10",
            Self::S10 => "s10",
            Self::SumProductWithWeightingsAndModulo(_) => "sum_product_with_weightings_and_modulo",
            Self::Mod3736 => "mod_37_36",
            Self::Luhn => "luhn",
        }
    }
}

/// Numeric value of a check digit. Letters never satisfy a numeric algorithm.
fn check_value(check_digit: &str) -> Option<u32> {
    if check_digit.is_empty() || !check_digit.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    check_digit.parse().ok()
}

fn digit_or_zero(c: char) -> u32 {
    c.to_digit(10).unwrap_or(0)
}

/// Complement of a digit sum to the next multiple of ten; a sum already
/// divisible by ten yields 0, not 10.
#[must_use]
pub const fn mod10_complement(total: u32) -> u32 {
    (10 - total % 10) % 10
}

/// `serial mod 7 == check digit`. A serial with non-digit characters fails.
#[must_use]
pub fn mod7(serial: &str, check_digit: &str) -> bool {
    let Some(expected) = check_value(check_digit) else {
        return false;
    };

    let mut remainder = 0;
    for c in serial.chars() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        remainder = (remainder * 10 + digit) % 7;
    }

    remainder == expected
}

/// Mod 10 with optional reversal and position multipliers.
///
/// Letters map to `(codepoint - 3) mod 10`, which is how UPS folds its
/// alphanumeric shipper IDs into the digit sum.
#[must_use]
pub fn mod10(serial: &str, check_digit: &str, options: &Mod10Options) -> bool {
    let Some(expected) = check_value(check_digit) else {
        return false;
    };

    let mut chars: Vec<char> = serial.chars().collect();
    if options.reverse {
        chars.reverse();
    }

    let total = chars.iter().enumerate().try_fold(0u32, |total, (i, &c)| {
        let value = c
            .to_digit(10)
            .unwrap_or_else(|| u32::from(c).saturating_sub(3) % 10);

        let weighted = match (i % 2 == 1, options.odds_multiplier, options.evens_multiplier) {
            (true, Some(multiplier), _) | (false, _, Some(multiplier)) => {
                value.checked_mul(multiplier)?
            }
            _ => value,
        };
        total.checked_add(weighted)
    });

    // overflow never validates
    total.is_some_and(|total| mod10_complement(total) == expected)
}

const S10_WEIGHTS: [u32; 8] = [8, 6, 4, 2, 3, 5, 9, 7];

/// UPU S10: weights `[8,6,4,2,3,5,9,7]` over the first eight digits, modulo 11.
#[must_use]
pub fn s10(serial: &str, check_digit: &str) -> bool {
    let Some(expected) = check_value(check_digit) else {
        return false;
    };

    let total: u32 = serial
        .chars()
        .zip(S10_WEIGHTS)
        .map(|(c, weight)| digit_or_zero(c) * weight)
        .sum();

    let check = match total % 11 {
        1 => 0,
        0 => 5,
        remainder => 11 - remainder,
    };

    check == expected
}

/// Positional weights over as many characters as weights are given, then
/// `(sum mod modulo1) mod modulo2`.
#[must_use]
pub fn sum_product_with_weightings_and_modulo(
    serial: &str,
    check_digit: &str,
    params: &WeightedModulo,
) -> bool {
    let Some(expected) = check_value(check_digit) else {
        return false;
    };
    if params.modulo1 == 0 || params.modulo2 == 0 {
        return false;
    }

    let total = serial
        .chars()
        .zip(&params.weightings)
        .try_fold(0u32, |total, (c, weight)| {
            total.checked_add(digit_or_zero(c).checked_mul(*weight)?)
        });

    total.is_some_and(|total| total % params.modulo1 % params.modulo2 == expected)
}

/// ISO 7064 MOD 37,36. The computed check character is a digit for
/// values below 10 and `A`..=`Z` for 10..=35.
#[must_use]
pub fn mod_37_36(serial: &str, check_digit: &str) -> bool {
    const MODULUS: u32 = 36;

    let mut acc = MODULUS;
    for c in serial.chars() {
        let value = if c.is_ascii_alphabetic() {
            u32::from(c.to_ascii_uppercase()) - u32::from('A') + 10
        } else {
            digit_or_zero(c)
        };

        acc += value;
        if acc > MODULUS {
            acc -= MODULUS;
        }
        acc *= 2;
        if acc > MODULUS {
            acc -= MODULUS + 1;
        }
    }

    let mut computed = (MODULUS + 1).saturating_sub(acc);
    if computed == MODULUS {
        computed = 0;
    }

    // 36 never survives the mapping above; anything larger has no character
    char::from_digit(computed, 36).is_some_and(|c| {
        let mut buf = [0; 4];
        check_digit == c.to_ascii_uppercase().encode_utf8(&mut buf)
    })
}

/// Luhn: reverse the digits, double every even position, fold values above 9.
#[must_use]
pub fn luhn(serial: &str, check_digit: &str) -> bool {
    let Some(expected) = check_value(check_digit) else {
        return false;
    };

    let total: u32 = serial
        .chars()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let mut value = digit_or_zero(c);
            if i % 2 == 0 {
                value *= 2;
            }
            if value > 9 {
                value -= 9;
            }
            value
        })
        .sum();

    mod10_complement(total) == expected
}
