use fixedbitset::FixedBitSet;

use crate::error::{Error, Result};

/// Renders the set bits of `bitmap` as a range list, e.g. `0-3,8,10-11`.
pub fn format(bitmap: &FixedBitSet) -> String {
    let mut ranges: Vec<(usize, usize)> = Vec::new();

    for bit in bitmap.ones() {
        match ranges.last_mut() {
            Some((_, hi)) if *hi + 1 == bit => *hi = bit,
            _ => ranges.push((bit, bit)),
        }
    }

    ranges
        .iter()
        .map(|&(lo, hi)| if lo == hi { lo.to_string() } else { format!("{}-{}", lo, hi) })
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a range list produced by [`format`] into a bitmap of `len` bits.
pub fn parse(text: &str, len: usize) -> Result<FixedBitSet> {
    let mut bitmap = FixedBitSet::with_capacity(len);

    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let invalid = || Error::InvalidArgument(format!("Malformed bit range '{}'", part));

        let (lo, hi) = match part.split_once('-') {
            Some((lo, hi)) => (lo.trim().parse::<usize>().map_err(|_| invalid())?, hi.trim().parse::<usize>().map_err(|_| invalid())?),
            None => {
                let bit = part.parse::<usize>().map_err(|_| invalid())?;
                (bit, bit)
            }
        };

        if hi < lo {
            return Err(invalid());
        }
        if hi >= len {
            return Err(Error::out_of_range("bit", hi, len));
        }

        bitmap.insert_range(lo..hi + 1);
    }

    Ok(bitmap)
}
