use anyhow::{Result, bail};
use std::collections::HashSet;

const DEFAULT_SEED: u64 = 1337;

/// Resolve a list of CLI seed arguments into canonical seeds.
///
/// Accepts signed or unsigned integers and `0x`-prefixed hex. Duplicates are
/// dropped keeping first-seen order; an empty list falls back to 1337.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let Some(seed) = parse_seed(token) else {
            bail!("Unrecognized seed token: {token}");
        };
        if seen.insert(seed) {
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

fn parse_seed(token: &str) -> Option<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    if let Ok(value) = token.parse::<i64>() {
        return Some(value.unsigned_abs());
    }
    token.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_numeric_and_hex() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xff", "18446744073709551615"]))
            .unwrap();
        assert_eq!(seeds, vec![42, 7, 255, u64::MAX]);
    }

    #[test]
    fn drops_duplicates_in_order() {
        let seeds = resolve_seed_inputs(&tokens(&["9", "0x9", "-9", "3"])).unwrap();
        assert_eq!(seeds, vec![9, 3]);
    }

    #[test]
    fn empty_input_uses_default() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
        assert_eq!(resolve_seed_inputs(&tokens(&[""])).unwrap(), vec![DEFAULT_SEED]);
    }

    #[test]
    fn rejects_unknown_tokens() {
        let err = resolve_seed_inputs(&tokens(&["banana"])).unwrap_err();
        assert!(err.to_string().contains("banana"));
    }
}
