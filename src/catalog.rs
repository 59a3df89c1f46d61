use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// A selectable reactant tile as presented by the selection surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub identifier: String,
    pub display_name: String,
    pub image_ref: String,
}

impl Tile {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Tile {
            identifier: identifier.into(),
            display_name: display_name.into(),
            image_ref: image_ref.into(),
        }
    }
}

const TILE_IMAGE_BASE: &str = "https://placehold.co/100x100/1f2630/e6e6e6?text=";

// (identifier, display name)
const TILES: [(&str, &str); 16] = [
    ("H2", "Hydrogen"),
    ("Li", "Lithium"),
    ("C", "Carbon"),
    ("N2", "Nitrogen"),
    ("O2", "Oxygen"),
    ("F2", "Fluorine"),
    ("Na", "Sodium"),
    ("Mg", "Magnesium"),
    ("Al", "Aluminium"),
    ("S", "Sulfur"),
    ("Cl2", "Chlorine"),
    ("K", "Potassium"),
    ("Ca", "Calcium"),
    ("Fe", "Iron"),
    ("Cu", "Copper"),
    ("Zn", "Zinc"),
];

static CATALOG: Lazy<Vec<Tile>> = Lazy::new(|| {
    TILES
        .iter()
        .map(|&(id, name)| Tile::new(id, name, format!("{TILE_IMAGE_BASE}{id}")))
        .collect()
});

static CATALOG_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    TILES
        .iter()
        .enumerate()
        .map(|(i, &(id, _))| (id, i))
        .collect()
});

pub fn tiles() -> &'static [Tile] {
    &CATALOG
}

pub fn find_tile(identifier: &str) -> Option<&'static Tile> {
    CATALOG_INDEX
        .get(identifier)
        .and_then(|&i| CATALOG.get(i))
}

/// Strips every ASCII digit from a tile identifier, e.g. `Cl2` becomes `Cl`.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_ascii_digit()).collect()
}

pub fn is_element_symbol(symbol: &str) -> bool {
    ELEMENT_SYMBOLS.contains(&symbol)
}

const ELEMENT_SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca",
    "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
    "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr",
    "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn",
    "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd",
    "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb",
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th",
    "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm",
    "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds",
    "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_subscript_counts() {
        assert_eq!(normalize_identifier("Cl2"), "Cl");
        assert_eq!(normalize_identifier("O2"), "O");
        assert_eq!(normalize_identifier("Mg"), "Mg");
        assert_eq!(normalize_identifier("C60"), "C");
        assert_eq!(normalize_identifier("123"), "");
    }

    #[test]
    fn every_tile_normalizes_to_a_known_symbol() {
        for tile in tiles() {
            let symbol = normalize_identifier(&tile.identifier);
            assert!(is_element_symbol(&symbol), "{} -> {symbol}", tile.identifier);
        }
    }

    #[test]
    fn find_tile_by_identifier() {
        let tile = find_tile("Cl2").expect("chlorine tile");
        assert_eq!(tile.display_name, "Chlorine");
        assert!(tile.image_ref.ends_with("Cl2"));
        assert!(find_tile("Xx").is_none());
    }
}
