//! Display formatting for geocoded addresses.

/// Shorten a geocoder's full address for drivers and receipts.
///
/// The address is split on commas. Everything from the first part that
/// contains a four-digit postcode onwards is dropped; without a postcode
/// the last part (the country) is dropped instead. `locality` is appended
/// when no remaining part mentions it.
///
/// ```
/// use nightowl_core::address::format_address;
///
/// assert_eq!(
///     format_address("12 Rue Lavaud, Akaroa 7520, New Zealand", "Akaroa"),
///     "12 Rue Lavaud, Akaroa",
/// );
/// assert_eq!(
///     format_address("3 Beach Road, Canterbury, New Zealand", "Akaroa"),
///     "3 Beach Road, Canterbury, Akaroa",
/// );
/// ```
#[must_use]
pub fn format_address(address: &str, locality: &str) -> String {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();

    let keep = parts
        .iter()
        .position(|part| has_postcode(part))
        .unwrap_or_else(|| parts.len().saturating_sub(1));

    let mut kept: Vec<&str> = parts
        .into_iter()
        .take(keep)
        .filter(|p| !p.is_empty())
        .collect();

    if !locality.is_empty() && !kept.iter().any(|p| p.contains(locality)) {
        kept.push(locality);
    }

    kept.join(", ")
}

fn has_postcode(part: &str) -> bool {
    let mut run = 0;
    for c in part.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run == 4 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
