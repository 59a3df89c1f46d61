use regex::Regex;
use serde::{Deserialize, Serialize};

/// One candidate product as returned by the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProduct {
    pub formula: String,
    #[serde(default)]
    pub energy_per_atom: f64,
}

impl CandidateProduct {
    pub fn new(formula: impl Into<String>, energy_per_atom: f64) -> Self {
        CandidateProduct {
            formula: formula.into(),
            energy_per_atom,
        }
    }

    pub fn yield_percent(&self) -> u32 {
        fabricated_yield(self.energy_per_atom)
    }
}

/// Non-empty, ordered set of products for one reactant pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSet(Vec<CandidateProduct>);

impl ProductSet {
    pub fn new(products: Vec<CandidateProduct>) -> Option<Self> {
        if products.is_empty() {
            None
        } else {
            Some(ProductSet(products))
        }
    }

    pub fn get(&self, index: usize) -> Option<&CandidateProduct> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateProduct> {
        self.0.iter()
    }
}

/// Matches a formula made only of the given reactant, optionally followed
/// by a count (`O`, `O2`, `O3` for `O`).
#[derive(Debug, Clone)]
pub struct BareReactantMatcher {
    first: Regex,
    second: Regex,
}

impl BareReactantMatcher {
    pub fn new(element_a: &str, element_b: &str) -> Result<Self, regex::Error> {
        Ok(BareReactantMatcher {
            first: bare_pattern(element_a)?,
            second: bare_pattern(element_b)?,
        })
    }

    pub fn is_bare(&self, formula: &str) -> bool {
        self.first.is_match(formula) || self.second.is_match(formula)
    }
}

fn bare_pattern(identifier: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"^{}\d*$", regex::escape(identifier)))
}

/// Picks the products worth showing for a pair. Compounds win: when at
/// least one candidate is not a bare reactant, leftovers are dropped.
/// With no compound at all the full list is kept as-is.
///
/// Returns `Ok(None)` for an empty candidate list.
pub fn effective_products(
    candidates: Vec<CandidateProduct>,
    element_a: &str,
    element_b: &str,
) -> Result<Option<ProductSet>, regex::Error> {
    let matcher = BareReactantMatcher::new(element_a, element_b)?;
    let compounds: Vec<CandidateProduct> = candidates
        .iter()
        .filter(|p| !matcher.is_bare(&p.formula))
        .cloned()
        .collect();

    if compounds.is_empty() {
        Ok(ProductSet::new(candidates))
    } else {
        Ok(ProductSet::new(compounds))
    }
}

/// Display-only yield figure. Not a physical quantity.
pub fn fabricated_yield(energy_per_atom: f64) -> u32 {
    (energy_per_atom.abs() * 40.0 + 50.0).floor().min(100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formulas(set: &ProductSet) -> Vec<&str> {
        set.iter().map(|p| p.formula.as_str()).collect()
    }

    #[test]
    fn yield_formula_matches_reference_points() {
        assert_eq!(fabricated_yield(-1.5), 100);
        assert_eq!(fabricated_yield(0.0), 50);
        assert_eq!(fabricated_yield(-3.0), 100);
        assert_eq!(fabricated_yield(-1.2), 98);
        assert_eq!(fabricated_yield(0.25), 60);
    }

    #[test]
    fn bare_matcher_accepts_counts_only() {
        let matcher = BareReactantMatcher::new("O", "Mg").expect("patterns");
        assert!(matcher.is_bare("O"));
        assert!(matcher.is_bare("O2"));
        assert!(matcher.is_bare("O3"));
        assert!(matcher.is_bare("Mg"));
        assert!(!matcher.is_bare("MgO"));
        assert!(!matcher.is_bare("Os"));
        assert!(!matcher.is_bare("Mg2O"));
    }

    #[test]
    fn compounds_replace_leftovers() {
        let candidates = vec![
            CandidateProduct::new("Mg", 0.0),
            CandidateProduct::new("MgO", -1.2),
            CandidateProduct::new("O2", 0.0),
            CandidateProduct::new("MgO2", -0.8),
        ];
        let set = effective_products(candidates, "Mg", "O")
            .expect("patterns")
            .expect("non-empty");
        assert_eq!(formulas(&set), vec!["MgO", "MgO2"]);

        let matcher = BareReactantMatcher::new("Mg", "O").expect("patterns");
        assert!(set.iter().all(|p| !matcher.is_bare(&p.formula)));
    }

    #[test]
    fn only_leftovers_keeps_full_list() {
        let candidates = vec![
            CandidateProduct::new("Mg", 0.0),
            CandidateProduct::new("K", 0.0),
        ];
        let set = effective_products(candidates, "Mg", "K")
            .expect("patterns")
            .expect("non-empty");
        assert_eq!(formulas(&set), vec!["Mg", "K"]);
    }

    #[test]
    fn empty_candidates_yield_no_set() {
        let set = effective_products(Vec::new(), "Na", "Cl").expect("patterns");
        assert!(set.is_none());
    }

    #[test]
    fn identifiers_are_escaped() {
        let matcher = BareReactantMatcher::new("C+", "O").expect("patterns");
        assert!(matcher.is_bare("C+2"));
        assert!(!matcher.is_bare("CC"));
    }

    #[test]
    fn missing_energy_defaults_to_zero() {
        let product: CandidateProduct =
            serde_json::from_str(r#"{"formula":"K","is_stable":true}"#).expect("decode");
        assert_eq!(product.energy_per_atom, 0.0);
        assert_eq!(product.yield_percent(), 50);
    }
}
