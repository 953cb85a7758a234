//! Object identifier decoding and well-known names.

/// Decodes the body of an OBJECT IDENTIFIER (or RELATIVE-OID when `relative`
/// is set) into dotted form. Returns `None` for empty or truncated input and
/// for arcs that overflow 64 bits.
pub fn decode_oid(body: &[u8], relative: bool) -> Option<String> {
    let mut arcs: Vec<u64> = Vec::new();
    let mut value: u64 = 0;
    let mut in_progress = false;

    for &byte in body {
        if value > (u64::MAX >> 7) {
            return None;
        }
        value = (value << 7) | (byte & 0x7F) as u64;
        in_progress = true;
        if byte & 0x80 == 0 {
            arcs.push(value);
            value = 0;
            in_progress = false;
        }
    }
    if arcs.is_empty() || in_progress {
        return None;
    }

    let mut parts: Vec<String> = Vec::with_capacity(arcs.len() + 1);
    let mut rest = arcs.as_slice();
    if !relative {
        let first = arcs[0];
        let (a, b) = match first {
            0..=39 => (0, first),
            40..=79 => (1, first - 40),
            _ => (2, first - 80),
        };
        parts.push(a.to_string());
        parts.push(b.to_string());
        rest = &arcs[1..];
    }
    parts.extend(rest.iter().map(u64::to_string));
    Some(parts.join("."))
}

/// Returns a short name for a well-known object identifier
pub fn oid_name(dotted: &str) -> Option<&'static str> {
    let name = match dotted {
        // PKCS #1
        "1.2.840.113549.1.1.1" => "rsaEncryption",
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.113549.1.1.10" => "rsassaPss",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        // PKCS #5, #7, #9
        "1.2.840.113549.1.5.12" => "pbkdf2",
        "1.2.840.113549.1.5.13" => "pbes2",
        "1.2.840.113549.1.7.1" => "data",
        "1.2.840.113549.1.7.2" => "signedData",
        "1.2.840.113549.1.9.1" => "emailAddress",
        "1.2.840.113549.1.9.14" => "extensionRequest",
        // Elliptic curves
        "1.2.840.10045.2.1" => "ecPublicKey",
        "1.2.840.10045.3.1.7" => "prime256v1",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.3.132.0.34" => "secp384r1",
        "1.3.132.0.35" => "secp521r1",
        "1.3.101.110" => "X25519",
        "1.3.101.112" => "ED25519",
        // X.520 attributes
        "2.5.4.3" => "commonName",
        "2.5.4.5" => "serialNumber",
        "2.5.4.6" => "countryName",
        "2.5.4.7" => "localityName",
        "2.5.4.8" => "stateOrProvinceName",
        "2.5.4.10" => "organizationName",
        "2.5.4.11" => "organizationalUnitName",
        // X.509 extensions
        "2.5.29.14" => "subjectKeyIdentifier",
        "2.5.29.15" => "keyUsage",
        "2.5.29.17" => "subjectAltName",
        "2.5.29.19" => "basicConstraints",
        "2.5.29.31" => "cRLDistributionPoints",
        "2.5.29.32" => "certificatePolicies",
        "2.5.29.35" => "authorityKeyIdentifier",
        "2.5.29.37" => "extKeyUsage",
        "1.3.6.1.5.5.7.1.1" => "authorityInfoAccess",
        "1.3.6.1.5.5.7.3.1" => "serverAuth",
        "1.3.6.1.5.5.7.3.2" => "clientAuth",
        // NIST algorithms
        "2.16.840.1.101.3.4.1.2" => "aes128-CBC",
        "2.16.840.1.101.3.4.1.42" => "aes256-CBC",
        "2.16.840.1.101.3.4.2.1" => "sha256",
        "2.16.840.1.101.3.4.2.2" => "sha384",
        "2.16.840.1.101.3.4.2.3" => "sha512",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_oid() {
        let body = [0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0B];
        assert_eq!(decode_oid(&body, false).as_deref(), Some("1.2.840.113549.1.1.11"));
        assert_eq!(decode_oid(&[0x55, 0x04, 0x03], false).as_deref(), Some("2.5.4.3"));
        assert_eq!(decode_oid(&[0x88, 0x37], false).as_deref(), Some("2.999"));
    }

    #[test]
    fn test_relative_oid() {
        assert_eq!(decode_oid(&[0x01, 0x81, 0x00], true).as_deref(), Some("1.128"));
    }

    #[test]
    fn test_malformed_oid() {
        assert_eq!(decode_oid(&[], false), None);
        assert_eq!(decode_oid(&[0x2A, 0x86], false), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(oid_name("1.2.840.113549.1.1.11"), Some("sha256WithRSAEncryption"));
        assert_eq!(oid_name("1.2.3.4"), None);
    }
}
