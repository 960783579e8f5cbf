use regex::Regex;
use url::Url;

pub fn has_valid_tld(domain: &str) -> bool {
    if domain.is_empty() || domain.len() < 3 || !domain.contains('.') {
        return false;
    }

    if let Some(last_dot) = domain.rfind('.') {
        if last_dot == domain.len() - 1 {
            return false;
        }
        let tld = &domain[last_dot + 1..];
        tld.len() >= 2
            && tld
                .chars()
                .all(|c| c.is_ascii_lowercase() && c.is_ascii_alphabetic())
    } else {
        false
    }
}

/// Reduces a host to its registrable domain.
///
/// The first pattern whose capture group 1 matches wins, which is how
/// multi-label suffixes such as `co.uk` are kept intact. Without a match the
/// last two labels are used.
pub fn normalize_domain(host: &str, patterns: &[Regex]) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    for pattern in patterns {
        if let Some(captures) = pattern.captures(&host) {
            if let Some(matched) = captures.get(1) {
                return matched.as_str().to_string();
            }
        }
    }

    if host.matches('.').count() <= 1 {
        return host;
    }
    let parts: Vec<&str> = host.split('.').collect();
    parts[parts.len() - 2..].join(".")
}

/// Registrable domain of `url`, or `None` for unparsable URLs and hosts
/// without a usable TLD (IP addresses, `localhost`, ...).
pub fn extract_domain(url: &str, patterns: &[Regex]) -> Option<String> {
    let url = Url::parse(url.trim()).ok()?;
    let host = url.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if !has_valid_tld(&host) {
        return None;
    }

    let domain = normalize_domain(&host, patterns);
    has_valid_tld(&domain).then_some(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffix_patterns() -> Vec<Regex> {
        vec![Regex::new(r"^(?:.+\.)?([^.]+\.co\.uk)$").unwrap()]
    }

    #[test]
    fn keeps_two_labels() {
        assert_eq!(
            extract_domain("https://www.shop.example.com/item?id=1", &[]),
            Some("example.com".to_string())
        );
        assert_eq!(
            extract_domain("http://Example.ORG./", &[]),
            Some("example.org".to_string())
        );
    }

    #[test]
    fn patterns_keep_multi_label_suffix() {
        let patterns = suffix_patterns();
        assert_eq!(
            extract_domain("https://www.shop.example.co.uk/x", &patterns),
            Some("example.co.uk".to_string())
        );
        assert_eq!(
            extract_domain("https://example.co.uk", &patterns),
            Some("example.co.uk".to_string())
        );
    }

    #[test]
    fn rejects_hosts_without_tld() {
        assert_eq!(extract_domain("http://127.0.0.1/", &[]), None);
        assert_eq!(extract_domain("http://localhost:8080/", &[]), None);
        assert_eq!(extract_domain("not a url", &[]), None);
        assert_eq!(extract_domain("mailto:someone@example.com", &[]), None);
    }

    #[test]
    fn tld_validation() {
        assert!(has_valid_tld("example.com"));
        assert!(!has_valid_tld("example.c"));
        assert!(!has_valid_tld("example."));
        assert!(!has_valid_tld("10.0.0.1"));
        assert!(!has_valid_tld("com"));
    }
}
