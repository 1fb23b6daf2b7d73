use std::net::IpAddr;

use crate::index::column::{f64_to_u64, i64_to_u64};

/// Term-byte encodings. Numeric terms use the order-preserving u64
/// mapping in big-endian form so the term dictionary sorts numerically,
/// which is what indexed-only range fallback scans rely on.

pub fn text_term(token: &str) -> Vec<u8> {
    token.as_bytes().to_vec()
}

pub fn u64_term(v: u64) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub fn i64_term(v: i64) -> Vec<u8> {
    i64_to_u64(v).to_be_bytes().to_vec()
}

pub fn f64_term(v: f64) -> Vec<u8> {
    f64_to_u64(v).to_be_bytes().to_vec()
}

pub fn bool_term(v: bool) -> Vec<u8> {
    i64_term(v as i64)
}

pub fn date_term(epoch_secs: i64) -> Vec<u8> {
    i64_term(epoch_secs)
}

/// IPv4 addresses are indexed through their IPv6-mapped form so the
/// dictionary holds a single 16-byte key space.
pub fn ip_term(ip: &IpAddr) -> Vec<u8> {
    ip_to_u128(ip).to_be_bytes().to_vec()
}

pub fn ip_to_u128(ip: &IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(v4.to_ipv6_mapped()),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

pub fn bytes_term(bytes: &[u8]) -> Vec<u8> {
    bytes.to_vec()
}

pub fn facet_term(path: &str) -> Vec<u8> {
    path.as_bytes().to_vec()
}

/// Terms of an indexed json field: the dotted leaf path, a NUL, then
/// the leaf token. NUL cannot occur in a json key path.
pub fn json_term(path: &str, token: &str) -> Vec<u8> {
    let mut term = Vec::with_capacity(path.len() + 1 + token.len());
    term.extend_from_slice(path.as_bytes());
    term.push(0u8);
    term.extend_from_slice(token.as_bytes());
    term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_terms_sort_numerically() {
        let mut terms = vec![i64_term(-10), i64_term(-1), i64_term(0), i64_term(99)];
        let sorted = terms.clone();
        terms.sort();
        assert_eq!(terms, sorted);

        let mut fterms = vec![f64_term(-2.5), f64_term(0.0), f64_term(9.99), f64_term(49.99)];
        let fsorted = fterms.clone();
        fterms.sort();
        assert_eq!(fterms, fsorted);
    }

    #[test]
    fn test_ipv4_maps_into_v6_space() {
        let v4: IpAddr = "127.0.0.1".parse().unwrap();
        let v6: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        assert_eq!(ip_term(&v4), ip_term(&v6));
    }
}
