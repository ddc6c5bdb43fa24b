/// testlib checkers that every judge ships, by short name.
pub const STANDARD_CHECKERS: [&str; 10] = [
    "ncmp", "fcmp", "hcmp", "lcmp", "nyesno", "rcmp4", "rcmp6", "rcmp9", "wcmp", "yesno",
];

pub const CUSTOM_CHECKER: &str = "custom";

/// Map a checker file name to the stored checker type.
///
/// `std::ncmp.cpp` becomes `ncmp`; anything outside [`STANDARD_CHECKERS`] is `custom`.
pub fn normalize_checker(raw: &str) -> &'static str {
    let name = raw.trim();
    let name = name.strip_prefix("std::").unwrap_or(name);
    let name = name.strip_suffix(".cpp").unwrap_or(name);

    STANDARD_CHECKERS
        .iter()
        .find(|std| **std == name)
        .copied()
        .unwrap_or(CUSTOM_CHECKER)
}
