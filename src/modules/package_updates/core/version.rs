// Package version ordering as pacman understands it.
//
// Purpose
// - Compare `[epoch:]version[-release]` strings the way `vercmp` does, so that
//   `1.10` sorts after `1.9` and `1:0.1` sorts after `2.0`.
//
// Responsibilities
// - Split epoch, version and release, then compare segment by segment.
// - Never allocate; the comparison walks the byte slices directly.

use std::cmp::Ordering;

/// Compare two full package versions (`epoch:version-release`).
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (epoch_a, version_a, release_a) = parse_evr(a);
    let (epoch_b, version_b, release_b) = parse_evr(b);

    segment_cmp(epoch_a, epoch_b)
        .then_with(|| segment_cmp(version_a, version_b))
        .then_with(|| match (release_a, release_b) {
            (Some(ra), Some(rb)) => segment_cmp(ra, rb),
            _ => Ordering::Equal,
        })
}

/// `true` when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    vercmp(candidate, current) == Ordering::Greater
}

fn parse_evr(evr: &str) -> (&str, &str, Option<&str>) {
    let digits = evr.bytes().take_while(u8::is_ascii_digit).count();
    let (epoch, rest) = match evr[digits..].strip_prefix(':') {
        Some(rest) if digits == 0 => ("0", rest),
        Some(rest) => (&evr[..digits], rest),
        None => ("0", evr),
    };
    match rest.rfind('-') {
        Some(idx) => (epoch, &rest[..idx], Some(&rest[idx + 1..])),
        None => (epoch, rest, None),
    }
}

/// rpm-style comparison of a single version component.
fn segment_cmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let one = a.as_bytes();
    let two = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    while i < one.len() && j < two.len() {
        let sep_start_i = i;
        let sep_start_j = j;
        while i < one.len() && !one[i].is_ascii_alphanumeric() {
            i += 1;
        }
        while j < two.len() && !two[j].is_ascii_alphanumeric() {
            j += 1;
        }
        if i >= one.len() || j >= two.len() {
            break;
        }
        // Differing separator runs decide on their own.
        let (sep_i, sep_j) = (i - sep_start_i, j - sep_start_j);
        if sep_i != sep_j {
            return sep_i.cmp(&sep_j);
        }

        let numeric = one[i].is_ascii_digit();
        let end_i = scan(one, i, numeric);
        let end_j = scan(two, j, numeric);

        if j == end_j {
            // Numeric segments beat alpha ones.
            return if numeric { Ordering::Greater } else { Ordering::Less };
        }

        let mut seg_a = &one[i..end_i];
        let mut seg_b = &two[j..end_j];
        if numeric {
            seg_a = trim_leading_zeros(seg_a);
            seg_b = trim_leading_zeros(seg_b);
            match seg_a.len().cmp(&seg_b.len()) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        match seg_a.cmp(seg_b) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        i = end_i;
        j = end_j;
    }

    let rest_a = &one[i.min(one.len())..];
    let rest_b = &two[j.min(two.len())..];
    if rest_a.is_empty() && rest_b.is_empty() {
        return Ordering::Equal;
    }
    // A trailing alpha segment never beats an empty one.
    let b_is_alpha = rest_b.first().is_some_and(u8::is_ascii_alphabetic);
    let a_is_alpha = rest_a.first().is_some_and(u8::is_ascii_alphabetic);
    if (rest_a.is_empty() && !b_is_alpha) || a_is_alpha {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn scan(bytes: &[u8], start: usize, numeric: bool) -> usize {
    let mut end = start;
    while end < bytes.len()
        && if numeric {
            bytes[end].is_ascii_digit()
        } else {
            bytes[end].is_ascii_alphabetic()
        }
    {
        end += 1;
    }
    end
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let zeros = bytes.iter().take_while(|b| **b == b'0').count();
    &bytes[zeros..]
}
