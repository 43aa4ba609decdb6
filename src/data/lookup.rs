//! Fixed state tables: full name, postal abbreviation and FIPS code for the
//! 50 states and the District of Columbia.

/// (name, abbreviation, FIPS)
static STATES: [(&str, &str, u8); 51] = [
    ("Alabama", "AL", 1),
    ("Alaska", "AK", 2),
    ("Arizona", "AZ", 4),
    ("Arkansas", "AR", 5),
    ("California", "CA", 6),
    ("Colorado", "CO", 8),
    ("Connecticut", "CT", 9),
    ("Delaware", "DE", 10),
    ("District of Columbia", "DC", 11),
    ("Florida", "FL", 12),
    ("Georgia", "GA", 13),
    ("Hawaii", "HI", 15),
    ("Idaho", "ID", 16),
    ("Illinois", "IL", 17),
    ("Indiana", "IN", 18),
    ("Iowa", "IA", 19),
    ("Kansas", "KS", 20),
    ("Kentucky", "KY", 21),
    ("Louisiana", "LA", 22),
    ("Maine", "ME", 23),
    ("Maryland", "MD", 24),
    ("Massachusetts", "MA", 25),
    ("Michigan", "MI", 26),
    ("Minnesota", "MN", 27),
    ("Mississippi", "MS", 28),
    ("Missouri", "MO", 29),
    ("Montana", "MT", 30),
    ("Nebraska", "NE", 31),
    ("Nevada", "NV", 32),
    ("New Hampshire", "NH", 33),
    ("New Jersey", "NJ", 34),
    ("New Mexico", "NM", 35),
    ("New York", "NY", 36),
    ("North Carolina", "NC", 37),
    ("North Dakota", "ND", 38),
    ("Ohio", "OH", 39),
    ("Oklahoma", "OK", 40),
    ("Oregon", "OR", 41),
    ("Pennsylvania", "PA", 42),
    ("Rhode Island", "RI", 44),
    ("South Carolina", "SC", 45),
    ("South Dakota", "SD", 46),
    ("Tennessee", "TN", 47),
    ("Texas", "TX", 48),
    ("Utah", "UT", 49),
    ("Vermont", "VT", 50),
    ("Virginia", "VA", 51),
    ("Washington", "WA", 53),
    ("West Virginia", "WV", 54),
    ("Wisconsin", "WI", 55),
    ("Wyoming", "WY", 56),
];

/// Every (name, abbreviation, FIPS) entry, alphabetical by name.
pub fn all_states() -> &'static [(&'static str, &'static str, u8)] {
    &STATES
}

/// Postal abbreviation for a full state name. Exact, case-sensitive match.
pub fn state_abbr(name: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, abbr, _)| *abbr)
}

/// FIPS code for a postal abbreviation.
pub fn fips_code(abbr: &str) -> Option<u8> {
    STATES
        .iter()
        .find(|(_, a, _)| *a == abbr)
        .map(|(_, _, fips)| *fips)
}

/// Full name for a postal abbreviation.
pub fn state_name(abbr: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(_, a, _)| *a == abbr)
        .map(|(name, _, _)| *name)
}
