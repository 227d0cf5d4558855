//! Physical dimension vectors

use std::fmt;

/// Number of base dimensions tracked
pub const BASE_DIMENSIONS: usize = 8;

/// One of the base dimensions a [`Dimension`] is expressed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseDimension {
    Length = 0,
    Mass = 1,
    Time = 2,
    Current = 3,
    Temperature = 4,
    Amount = 5,
    Luminosity = 6,
    Count = 7,
}

impl BaseDimension {
    /// All base dimensions in vector order
    pub const ALL: [BaseDimension; BASE_DIMENSIONS] = [
        BaseDimension::Length,
        BaseDimension::Mass,
        BaseDimension::Time,
        BaseDimension::Current,
        BaseDimension::Temperature,
        BaseDimension::Amount,
        BaseDimension::Luminosity,
        BaseDimension::Count,
    ];

    fn symbol(self) -> &'static str {
        match self {
            BaseDimension::Length => "L",
            BaseDimension::Mass => "M",
            BaseDimension::Time => "T",
            BaseDimension::Current => "I",
            BaseDimension::Temperature => "Θ",
            BaseDimension::Amount => "N",
            BaseDimension::Luminosity => "J",
            BaseDimension::Count => "#",
        }
    }
}

/// Exponent vector over the base dimensions.
///
/// Two quantities can be added or subtracted iff their dimensions are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension([i8; BASE_DIMENSIONS]);

impl Dimension {
    /// The dimensionless vector (all exponents zero)
    pub const NONE: Dimension = Dimension([0; BASE_DIMENSIONS]);

    /// Create from a raw exponent array
    pub const fn from_exponents(exponents: [i8; BASE_DIMENSIONS]) -> Self {
        Self(exponents)
    }

    /// A single base dimension raised to the first power
    pub const fn base(base: BaseDimension) -> Self {
        let mut exponents = [0; BASE_DIMENSIONS];
        exponents[base as usize] = 1;
        Self(exponents)
    }

    /// Exponent of one base dimension
    pub fn exponent(&self, base: BaseDimension) -> i8 {
        self.0[base as usize]
    }

    /// Raw exponent array
    pub fn exponents(&self) -> [i8; BASE_DIMENSIONS] {
        self.0
    }

    /// Dimension of a product
    pub fn multiply(&self, other: &Dimension) -> Dimension {
        let mut out = self.0;
        for (o, e) in out.iter_mut().zip(other.0.iter()) {
            *o = o.saturating_add(*e);
        }
        Dimension(out)
    }

    /// Dimension of a quotient
    pub fn divide(&self, other: &Dimension) -> Dimension {
        let mut out = self.0;
        for (o, e) in out.iter_mut().zip(other.0.iter()) {
            *o = o.saturating_sub(*e);
        }
        Dimension(out)
    }

    /// Dimension raised to an integer power
    pub fn pow(&self, power: i32) -> Dimension {
        let mut out = self.0;
        for o in out.iter_mut() {
            *o = (*o as i32 * power).clamp(i8::MIN as i32, i8::MAX as i32) as i8;
        }
        Dimension(out)
    }

    /// True when every exponent is zero
    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    /// True when only the count exponent is non-zero
    pub fn is_pure_count(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, &e)| (i == BaseDimension::Count as usize) == (e != 0))
    }

    /// The base dimension this vector consists of, if it is exactly one base to the first power
    pub fn single_base(&self) -> Option<BaseDimension> {
        let mut found = None;
        for base in BaseDimension::ALL {
            match self.exponent(base) {
                0 => {}
                1 if found.is_none() => found = Some(base),
                _ => return None,
            }
        }
        found
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return f.write_str("1");
        }
        let parts: Vec<String> = BaseDimension::ALL
            .iter()
            .filter(|b| self.exponent(**b) != 0)
            .map(|b| match self.exponent(*b) {
                1 => b.symbol().to_string(),
                e => format!("{}^{}", b.symbol(), e),
            })
            .collect();
        f.write_str(&parts.join("·"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_divide() {
        let length = Dimension::base(BaseDimension::Length);
        let time = Dimension::base(BaseDimension::Time);
        let speed = length.divide(&time);
        assert_eq!(speed.exponent(BaseDimension::Length), 1);
        assert_eq!(speed.exponent(BaseDimension::Time), -1);
        assert_eq!(speed.multiply(&time), length);
        assert!(length.divide(&length).is_dimensionless());
    }

    #[test]
    fn test_pure_count() {
        let count = Dimension::base(BaseDimension::Count);
        assert!(count.is_pure_count());
        assert!(!Dimension::NONE.is_pure_count());
        assert!(!count.multiply(&Dimension::base(BaseDimension::Mass)).is_pure_count());
    }

    #[test]
    fn test_single_base() {
        assert_eq!(
            Dimension::base(BaseDimension::Time).single_base(),
            Some(BaseDimension::Time)
        );
        assert_eq!(Dimension::base(BaseDimension::Time).pow(2).single_base(), None);
        assert_eq!(Dimension::NONE.single_base(), None);
    }

    #[test]
    fn test_display() {
        let accel = Dimension::base(BaseDimension::Length)
            .divide(&Dimension::base(BaseDimension::Time).pow(2));
        assert_eq!(accel.to_string(), "L·T^-2");
    }
}
