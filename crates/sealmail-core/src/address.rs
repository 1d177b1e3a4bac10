//! Mail address syntax.
//!
//! A pragmatic subset of RFC 5321: dot-atom local part, DNS hostname domain
//! with at least two labels. Quoted local parts and address literals are
//! rejected. Addresses are compared case-insensitively after trimming.

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

/// Canonical form used as the recipient key: trimmed, lowercased.
pub fn normalize(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Whether `address` is syntactically valid.
///
/// Surrounding whitespace is ignored.
pub fn is_valid_address(address: &str) -> bool {
    let address = address.trim();
    if address.is_empty() || address.len() > MAX_ADDRESS_LEN {
        return false;
    }

    let Some((local, domain)) = address.rsplit_once('@') else {
        return false;
    };

    is_valid_local(local) && is_valid_domain(domain)
}

fn is_valid_local(local: &str) -> bool {
    if local.is_empty() || local.len() > MAX_LOCAL_LEN {
        return false;
    }

    local.split('.').all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~-".contains(c)
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let tld_is_alpha =
        labels.last().is_some_and(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()));

    tld_is_alpha && labels.iter().all(|label| is_valid_label(label))
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
