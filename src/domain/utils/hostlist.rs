use crate::error::{Error, Result};

/// Largest number of hosts a single bracketed range may expand to.
const MAX_RANGE: u64 = 65536;

/// A host name split into its alphabetic stem and an optional numeric suffix.
/// `width` is the number of digits in the original name, so `node007` keeps
/// its zero padding when it is rendered back.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HostName<'a> {
    prefix: &'a str,
    suffix: Option<(u64, usize)>,
}

impl<'a> HostName<'a> {
    fn split(name: &'a str) -> Self {
        let digits = name.bytes().rev().take_while(|b| b.is_ascii_digit()).count();
        let (prefix, tail) = name.split_at(name.len() - digits);

        // Suffixes too long for u64 are treated as part of the stem.
        let suffix = if tail.is_empty() { None } else { tail.parse::<u64>().ok().map(|n| (n, digits)) };

        match suffix {
            Some(_) => HostName { prefix, suffix },
            None => HostName { prefix: name, suffix: None },
        }
    }
}

fn digit_count(number: u64) -> usize {
    number.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// True if `number` was written with `width` digits and no leading zeros.
fn is_unpadded(number: u64, width: usize) -> bool {
    digit_count(number) == width
}

/// Consecutive names sharing a prefix, in the order they were given.
struct HostGroup<'a> {
    prefix: &'a str,
    numbers: Vec<(u64, usize)>,
}

impl HostGroup<'_> {
    fn render(&self) -> String {
        if self.numbers.is_empty() {
            return self.prefix.to_string();
        }

        let mut ranges: Vec<(u64, u64, usize)> = Vec::new();
        for &(number, width) in &self.numbers {
            match ranges.last_mut() {
                Some((lo, hi, w)) if hi.checked_add(1) == Some(number) && (*w == width || (is_unpadded(*lo, *w) && is_unpadded(number, width))) => {
                    *hi = number
                }
                _ => ranges.push((number, number, width)),
            }
        }

        if ranges.len() == 1 && ranges[0].0 == ranges[0].1 {
            let (number, _, width) = ranges[0];
            return format!("{}{:0width$}", self.prefix, number, width = width);
        }

        let body = ranges
            .iter()
            .map(|&(lo, hi, width)| {
                if lo == hi {
                    format!("{:0width$}", lo, width = width)
                } else {
                    format!("{:0width$}-{:0width$}", lo, hi, width = width)
                }
            })
            .collect::<Vec<_>>()
            .join(",");

        format!("{}[{}]", self.prefix, body)
    }
}

/// Compresses host names into a hostlist expression, e.g.
/// `node01,node02,node03,login` becomes `node[01-03],login`.
///
/// Input order is preserved: only runs of adjacent names with the same prefix
/// are folded together.
pub fn compress<S: AsRef<str>>(names: &[S]) -> String {
    let mut groups: Vec<HostGroup> = Vec::new();

    for name in names {
        let host = HostName::split(name.as_ref());

        match (groups.last_mut(), host.suffix) {
            (Some(group), Some(suffix)) if group.prefix == host.prefix && !group.numbers.is_empty() => {
                group.numbers.push(suffix);
            }
            _ => groups.push(HostGroup { prefix: host.prefix, numbers: host.suffix.into_iter().collect() }),
        }
    }

    groups.iter().map(HostGroup::render).collect::<Vec<_>>().join(",")
}

/// Expands a hostlist expression into individual host names.
///
/// Supports comma separated entries, each either a plain name or
/// `prefix[a,b-c,...]`. Zero padding of the lower bound is applied to every
/// generated number.
pub fn expand(expression: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for token in split_top_level(expression)? {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.find('[') {
            None => {
                if token.contains(']') {
                    return Err(Error::InvalidArgument(format!("Unbalanced ']' in hostlist entry '{}'", token)));
                }
                names.push(token.to_string());
            }
            Some(open) => {
                let prefix = &token[..open];
                let body = token[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| Error::InvalidArgument(format!("Hostlist entry '{}' must end with ']'", token)))?;

                if body.contains('[') || body.contains(']') {
                    return Err(Error::InvalidArgument(format!("Nested brackets in hostlist entry '{}'", token)));
                }

                for range in body.split(',') {
                    expand_range(prefix, range.trim(), token, &mut names)?;
                }
            }
        }
    }

    Ok(names)
}

fn expand_range(prefix: &str, range: &str, token: &str, names: &mut Vec<String>) -> Result<()> {
    let invalid = || Error::InvalidArgument(format!("Invalid range '{}' in hostlist entry '{}'", range, token));

    let (lo_text, hi_text) = match range.split_once('-') {
        Some((lo, hi)) => (lo.trim(), hi.trim()),
        None => (range, range),
    };

    if lo_text.is_empty() || !lo_text.bytes().all(|b| b.is_ascii_digit()) || !hi_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let lo: u64 = lo_text.parse().map_err(|_| invalid())?;
    let hi: u64 = hi_text.parse().map_err(|_| invalid())?;
    if hi < lo {
        return Err(invalid());
    }
    if hi - lo >= MAX_RANGE {
        return Err(Error::InvalidArgument(format!(
            "Range '{}' in hostlist entry '{}' names more than {} hosts",
            range, token, MAX_RANGE
        )));
    }

    let width = lo_text.len();
    for number in lo..=hi {
        names.push(format!("{}{:0width$}", prefix, number, width = width));
    }

    Ok(())
}

/// Splits on commas that are not enclosed in brackets.
fn split_top_level(expression: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::InvalidArgument(format!("Unbalanced ']' in hostlist '{}'", expression)))?;
            }
            ',' if depth == 0 => {
                parts.push(&expression[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(Error::InvalidArgument(format!("Unclosed '[' in hostlist '{}'", expression)));
    }

    parts.push(&expression[start..]);
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_consecutive_range() {
        assert_eq!(compress(&["node0", "node1", "node2", "node3"]), "node[0-3]");
    }

    #[test]
    fn test_compress_keeps_padding_and_gaps() {
        assert_eq!(compress(&["n01", "n02", "n04", "login"]), "n[01-02,04],login");
    }

    #[test]
    fn test_compress_single_host_has_no_brackets() {
        assert_eq!(compress(&["node7"]), "node7");
        assert_eq!(compress::<&str>(&[]), "");
    }

    #[test]
    fn test_compress_merges_across_digit_counts() {
        assert_eq!(compress(&["n8", "n9", "n10"]), "n[8-10]");
        assert_eq!(compress(&expand("n[98-101]").unwrap()), "n[98-101]");
        assert_eq!(expand("n[8-10]").unwrap(), vec!["n8", "n9", "n10"]);

        // Padded numbers only merge with the same width.
        assert_eq!(compress(&["n09", "n10", "n100"]), "n[09-10,100]");
    }

    #[test]
    fn test_expand_rejects_oversized_range() {
        assert!(matches!(expand("node[0-99999999999]"), Err(Error::InvalidArgument(_))));
        assert!(matches!(expand("n[0-65536]"), Err(Error::InvalidArgument(_))));
        assert_eq!(expand("n[1-65536]").unwrap().len(), 65536);
    }

    #[test]
    fn test_compress_does_not_reorder() {
        assert_eq!(compress(&["a3", "b1", "a4"]), "a3,b1,a4");
    }

    #[test]
    fn test_expand_inverse_of_compress() {
        let names: Vec<String> = vec!["rack1-n08", "rack1-n09", "rack1-n10", "gpu2"].into_iter().map(String::from).collect();
        let expr = compress(&names);

        assert_eq!(expr, "rack1-n[08-10],gpu2");
        assert_eq!(expand(&expr).unwrap(), names);
    }

    #[test]
    fn test_expand_mixed_entries() {
        let names = expand("node[1,3-4], head ,").unwrap();
        assert_eq!(names, vec!["node1", "node3", "node4", "head"]);
    }

    #[test]
    fn test_expand_rejects_malformed_input() {
        assert!(matches!(expand("node[1-3"), Err(Error::InvalidArgument(_))));
        assert!(matches!(expand("node1-3]"), Err(Error::InvalidArgument(_))));
        assert!(matches!(expand("node[3-1]"), Err(Error::InvalidArgument(_))));
        assert!(matches!(expand("node[a-b]"), Err(Error::InvalidArgument(_))));
    }
}
