//! Built-in unit table

use super::dimension::Dimension;
use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Definition of a unit symbol
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDef {
    /// Canonical symbol used in composite units and display
    pub symbol: &'static str,
    /// Alternate spellings accepted in input
    pub aliases: &'static [&'static str],
    /// Physical dimension
    pub dimension: Dimension,
    /// Multiplier to the coherent SI unit of the same dimension
    pub factor: f64,
    /// Additive offset to the coherent SI unit (affine temperature scales only)
    pub offset: f64,
}

impl UnitDef {
    /// True for units whose conversion needs an offset
    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }
}

const fn dim(l: i8, m: i8, t: i8, i: i8, th: i8, n: i8, j: i8, c: i8) -> Dimension {
    Dimension::from_exponents([l, m, t, i, th, n, j, c])
}

const LENGTH: Dimension = dim(1, 0, 0, 0, 0, 0, 0, 0);
const MASS: Dimension = dim(0, 1, 0, 0, 0, 0, 0, 0);
const TIME: Dimension = dim(0, 0, 1, 0, 0, 0, 0, 0);
const CURRENT: Dimension = dim(0, 0, 0, 1, 0, 0, 0, 0);
const TEMPERATURE: Dimension = dim(0, 0, 0, 0, 1, 0, 0, 0);
const AMOUNT: Dimension = dim(0, 0, 0, 0, 0, 1, 0, 0);
const LUMINOSITY: Dimension = dim(0, 0, 0, 0, 0, 0, 1, 0);
const COUNT: Dimension = dim(0, 0, 0, 0, 0, 0, 0, 1);
const AREA: Dimension = dim(2, 0, 0, 0, 0, 0, 0, 0);
const VOLUME: Dimension = dim(3, 0, 0, 0, 0, 0, 0, 0);
const SPEED: Dimension = dim(1, 0, -1, 0, 0, 0, 0, 0);
const FREQUENCY: Dimension = dim(0, 0, -1, 0, 0, 0, 0, 0);
const FORCE: Dimension = dim(1, 1, -2, 0, 0, 0, 0, 0);
const PRESSURE: Dimension = dim(-1, 1, -2, 0, 0, 0, 0, 0);
const ENERGY: Dimension = dim(2, 1, -2, 0, 0, 0, 0, 0);
const POWER: Dimension = dim(2, 1, -3, 0, 0, 0, 0, 0);
const VOLTAGE: Dimension = dim(2, 1, -3, -1, 0, 0, 0, 0);
const RESISTANCE: Dimension = dim(2, 1, -3, -2, 0, 0, 0, 0);

macro_rules! unit {
    ($symbol:expr, [$($alias:expr),*], $dimension:expr, $factor:expr) => {
        unit!($symbol, [$($alias),*], $dimension, $factor, 0.0)
    };
    ($symbol:expr, [$($alias:expr),*], $dimension:expr, $factor:expr, $offset:expr) => {
        UnitDef {
            symbol: $symbol,
            aliases: &[$($alias),*],
            dimension: $dimension,
            factor: $factor,
            offset: $offset,
        }
    };
}

/// Every unit the engine understands
pub static UNITS: &[UnitDef] = &[
    // Length
    unit!("m", ["meter", "meters", "metre", "metres"], LENGTH, 1.0),
    unit!("km", ["kilometer", "kilometers", "kilometre", "kilometres"], LENGTH, 1000.0),
    unit!("cm", ["centimeter", "centimeters", "centimetre", "centimetres"], LENGTH, 0.01),
    unit!("mm", ["millimeter", "millimeters", "millimetre", "millimetres"], LENGTH, 0.001),
    unit!("µm", ["um", "micrometer", "micrometers", "micron", "microns"], LENGTH, 1e-6),
    unit!("nm", ["nanometer", "nanometers"], LENGTH, 1e-9),
    unit!("mi", ["mile", "miles"], LENGTH, 1609.344),
    unit!("yd", ["yard", "yards"], LENGTH, 0.9144),
    unit!("ft", ["foot", "feet"], LENGTH, 0.3048),
    unit!("inch", ["inches"], LENGTH, 0.0254),
    unit!("nmi", [], LENGTH, 1852.0),
    // Mass
    unit!("kg", ["kilogram", "kilograms", "kilo", "kilos"], MASS, 1.0),
    unit!("g", ["gram", "grams", "gramme", "grammes"], MASS, 0.001),
    unit!("mg", ["milligram", "milligrams"], MASS, 1e-6),
    unit!("t", ["tonne", "tonnes"], MASS, 1000.0),
    unit!("lb", ["lbs", "pound", "pounds"], MASS, 0.45359237),
    unit!("oz", ["ounce", "ounces"], MASS, 0.028349523125),
    // Time
    unit!("s", ["sec", "secs", "second", "seconds"], TIME, 1.0),
    unit!("ms", ["millisecond", "milliseconds"], TIME, 0.001),
    unit!("min", ["mins", "minute", "minutes"], TIME, 60.0),
    unit!("h", ["hr", "hrs", "hour", "hours"], TIME, 3600.0),
    unit!("day", ["d", "days"], TIME, 86_400.0),
    unit!("week", ["wk", "wks", "weeks"], TIME, 604_800.0),
    unit!("month", ["months", "mo"], TIME, 2_629_800.0),
    unit!("year", ["yr", "yrs", "years"], TIME, 31_557_600.0),
    // Current
    unit!("A", ["amp", "amps", "ampere", "amperes"], CURRENT, 1.0),
    unit!("mA", ["milliamp", "milliamps"], CURRENT, 0.001),
    // Temperature
    unit!("K", ["kelvin"], TEMPERATURE, 1.0),
    unit!("°C", ["C", "degC", "celsius"], TEMPERATURE, 1.0, 273.15),
    unit!("°F", ["F", "degF", "fahrenheit"], TEMPERATURE, 5.0 / 9.0, 459.67 * 5.0 / 9.0),
    // Amount of substance
    unit!("mol", ["mole", "moles"], AMOUNT, 1.0),
    // Luminous intensity
    unit!("cd", ["candela", "candelas"], LUMINOSITY, 1.0),
    // Count
    unit!("pcs", ["pc", "piece", "pieces"], COUNT, 1.0),
    unit!("item", ["items"], COUNT, 1.0),
    unit!("dozen", ["dozens"], COUNT, 12.0),
    // Area
    unit!("ha", ["hectare", "hectares"], AREA, 10_000.0),
    unit!("acre", ["acres"], AREA, 4_046.856_422_4),
    // Volume
    unit!("L", ["l", "liter", "liters", "litre", "litres"], VOLUME, 0.001),
    unit!("mL", ["ml", "milliliter", "milliliters", "millilitre", "millilitres"], VOLUME, 1e-6),
    unit!("gal", ["gallon", "gallons"], VOLUME, 0.003_785_411_784),
    // Speed
    unit!("mph", [], SPEED, 0.44704),
    unit!("kph", ["kmh"], SPEED, 1.0 / 3.6),
    unit!("knot", ["knots", "kn"], SPEED, 1852.0 / 3600.0),
    // Frequency
    unit!("Hz", ["hertz"], FREQUENCY, 1.0),
    unit!("kHz", ["kilohertz"], FREQUENCY, 1e3),
    unit!("MHz", ["megahertz"], FREQUENCY, 1e6),
    unit!("GHz", ["gigahertz"], FREQUENCY, 1e9),
    // Force
    unit!("N", ["newton", "newtons"], FORCE, 1.0),
    unit!("kN", ["kilonewton", "kilonewtons"], FORCE, 1000.0),
    // Pressure
    unit!("Pa", ["pascal", "pascals"], PRESSURE, 1.0),
    unit!("kPa", ["kilopascal", "kilopascals"], PRESSURE, 1000.0),
    unit!("bar", ["bars"], PRESSURE, 100_000.0),
    unit!("atm", [], PRESSURE, 101_325.0),
    unit!("psi", [], PRESSURE, 6_894.757_293_168),
    // Energy
    unit!("J", ["joule", "joules"], ENERGY, 1.0),
    unit!("kJ", ["kilojoule", "kilojoules"], ENERGY, 1000.0),
    unit!("cal", ["calorie", "calories"], ENERGY, 4.184),
    unit!("kcal", ["kilocalorie", "kilocalories"], ENERGY, 4184.0),
    unit!("Wh", [], ENERGY, 3600.0),
    unit!("kWh", [], ENERGY, 3_600_000.0),
    // Power
    unit!("W", ["watt", "watts"], POWER, 1.0),
    unit!("kW", ["kilowatt", "kilowatts"], POWER, 1000.0),
    unit!("MW", ["megawatt", "megawatts"], POWER, 1e6),
    unit!("hp", ["horsepower"], POWER, 745.699_871_582_270_2),
    // Electric potential
    unit!("V", ["volt", "volts"], VOLTAGE, 1.0),
    unit!("kV", ["kilovolt", "kilovolts"], VOLTAGE, 1000.0),
    unit!("mV", ["millivolt", "millivolts"], VOLTAGE, 0.001),
    // Resistance
    unit!("Ω", ["ohm", "ohms"], RESISTANCE, 1.0),
];

/// Named derived units offered when displaying multi-factor composites
pub static NAMED_DERIVED: &[&str] = &["Hz", "N", "Pa", "J", "W", "V", "Ω"];

static INDEX: Lazy<AHashMap<&'static str, &'static UnitDef>> = Lazy::new(|| {
    let mut index = AHashMap::with_capacity(UNITS.len() * 4);
    for def in UNITS {
        index.insert(def.symbol, def);
        for alias in def.aliases {
            index.entry(*alias).or_insert(def);
        }
    }
    index
});

/// Look up a unit by symbol or alias.
///
/// Symbols are case-sensitive (`m` vs `M`); long-form names of four or more
/// characters are also matched case-insensitively (`Hours` matches, `KM` does not).
pub fn lookup(symbol: &str) -> Option<&'static UnitDef> {
    if let Some(def) = INDEX.get(symbol) {
        return Some(def);
    }
    if symbol.chars().count() >= 4 {
        return INDEX.get(symbol.to_lowercase().as_str()).copied();
    }
    None
}

/// True if the text names a unit
pub fn is_unit(symbol: &str) -> bool {
    lookup(symbol).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_symbol_and_alias() {
        assert_eq!(lookup("km").map(|u| u.factor), Some(1000.0));
        assert_eq!(lookup("hours").map(|u| u.symbol), Some("h"));
        assert_eq!(lookup("Minutes").map(|u| u.symbol), Some("min"));
        assert!(lookup("M").is_none());
        assert!(lookup("b").is_none());
    }

    #[test]
    fn test_symbols_unique() {
        let mut seen = std::collections::HashSet::new();
        for def in UNITS {
            assert!(seen.insert(def.symbol), "duplicate symbol {}", def.symbol);
        }
    }

    #[test]
    fn test_named_derived_registered() {
        for symbol in NAMED_DERIVED {
            assert!(is_unit(symbol), "{symbol} missing from unit table");
        }
    }

    #[test]
    fn test_affine() {
        assert!(lookup("°C").is_some_and(|u| u.is_affine()));
        assert!(!lookup("K").is_some_and(|u| u.is_affine()));
    }
}
