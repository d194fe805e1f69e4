//! Syntactic SMILES checks
//!
//! This does not perceive chemistry (valences, aromaticity, stereo
//! consistency); it rejects strings that could never parse as SMILES so a
//! typo fails fast instead of costing a backend round trip.

use crate::error::{DsError, Result};

/// Atoms allowed outside brackets
const ORGANIC_SUBSET: &[&str] = &["Cl", "Br", "B", "C", "N", "O", "P", "S", "F", "I"];
const AROMATIC_SUBSET: &[char] = &['b', 'c', 'n', 'o', 'p', 's'];
const BONDS: &[char] = &['-', '=', '#', '$', ':', '/', '\\', '.'];

fn invalid(smiles: &str) -> DsError {
  DsError::invalid_molecule(smiles)
}

/// Validate bracket atom contents such as `NH4+`, `13C@@H` or `Fe+2`
fn valid_bracket_atom(atom: &str) -> bool {
  let rest = atom.trim_start_matches(|c: char| c.is_ascii_digit());
  let mut chars = rest.chars().peekable();

  match chars.next() {
    Some('*') => {}
    Some(c) if c.is_ascii_uppercase() => {
      if chars.peek().is_some_and(|c| c.is_ascii_lowercase()) {
        chars.next();
      }
    }
    Some(c) if c.is_ascii_lowercase() => {
      // Aromatic two-letter symbols: se, as, te
      if chars.peek().is_some_and(|n| matches!((c, *n), ('s', 'e') | ('a', 's') | ('t', 'e'))) {
        chars.next();
      }
    }
    _ => return false,
  }

  chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '+' | '-' | ':'))
}

/// Check that a SMILES string is well formed
pub fn validate(smiles: &str) -> Result<()> {
  let smiles_trimmed = smiles.trim();
  if smiles_trimmed.is_empty() || smiles_trimmed.contains(char::is_whitespace) {
    return Err(invalid(smiles));
  }

  let chars: Vec<char> = smiles_trimmed.chars().collect();
  let mut open_rings: Vec<u32> = Vec::new();
  let mut depth = 0usize;
  let mut atoms = 0usize;
  let mut i = 0;

  while i < chars.len() {
    let c = chars[i];
    match c {
      '[' => {
        let end = chars[i + 1..].iter().position(|&c| c == ']').ok_or_else(|| invalid(smiles))?;
        let atom: String = chars[i + 1..i + 1 + end].iter().collect();
        if !valid_bracket_atom(&atom) {
          return Err(invalid(smiles));
        }
        atoms += 1;
        i += end + 2;
        continue;
      }
      '(' => {
        if atoms == 0 {
          return Err(invalid(smiles));
        }
        depth += 1;
      }
      ')' => {
        if depth == 0 {
          return Err(invalid(smiles));
        }
        depth -= 1;
      }
      '%' => {
        let digits: String = chars.iter().skip(i + 1).take(2).collect();
        if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) || atoms == 0 {
          return Err(invalid(smiles));
        }
        toggle_ring(&mut open_rings, digits.parse().map_err(|_| invalid(smiles))?);
        i += 3;
        continue;
      }
      d if d.is_ascii_digit() => {
        if atoms == 0 {
          return Err(invalid(smiles));
        }
        toggle_ring(&mut open_rings, d.to_digit(10).unwrap_or_default());
      }
      '*' => atoms += 1,
      c if AROMATIC_SUBSET.contains(&c) => atoms += 1,
      c if BONDS.contains(&c) => {}
      c if c.is_ascii_uppercase() => {
        let two: String = chars.iter().skip(i).take(2).collect();
        if two.len() == 2 && ORGANIC_SUBSET.contains(&two.as_str()) {
          i += 2;
          atoms += 1;
          continue;
        }
        if !ORGANIC_SUBSET.contains(&c.to_string().as_str()) {
          return Err(invalid(smiles));
        }
        atoms += 1;
      }
      _ => return Err(invalid(smiles)),
    }
    i += 1;
  }

  if depth != 0 || !open_rings.is_empty() || atoms == 0 {
    return Err(invalid(smiles));
  }
  Ok(())
}

fn toggle_ring(open: &mut Vec<u32>, label: u32) {
  match open.iter().position(|&r| r == label) {
    Some(pos) => {
      open.remove(pos);
    }
    None => open.push(label),
  }
}
