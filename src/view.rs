use serde::Serialize;
use std::fmt;

use crate::catalog::Tile;
use crate::controller::{PairState, Phase};

pub const EMPTY_SLOT: &str = "Empty";
pub const UNKNOWN_PRODUCT: &str = "Unknown";
pub const STATUS_WAITING: &str = "Waiting for input...";
pub const STATUS_ONE_MORE: &str = "Select one more reactant...";
pub const STATUS_PREDICTING: &str = "Consulting prediction engine...";
pub const STATUS_SUCCESS: &str = "Reaction Successful!";
pub const STATUS_NO_REACTION: &str = "These elements do not react.";
pub const STATUS_ERROR: &str = "Check the prediction backend (is the service running?)";
pub const NO_SIDE_PRODUCTS: &str = "No side products.";

const PRODUCT_IMAGE_BASE: &str = "https://placehold.co/150x150/8A2BE2/white?text=";
const ALTERNATE_IMAGE_BASE: &str = "https://placehold.co/80x80/555555/white?text=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Idle,
    Filled,
    Product,
    Muted,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub name: String,
    pub image: Option<String>,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductBox {
    Glyph { text: String },
    Image { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternateView {
    pub index: usize,
    pub formula: String,
    pub image: String,
}

/// Everything the display surface needs to draw the current pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub phase: &'static str,
    pub generation: u64,
    pub first: SlotView,
    pub second: SlotView,
    pub product_box: ProductBox,
    pub product_label: String,
    pub product_tone: Tone,
    pub yield_text: String,
    pub status: String,
    pub detail: Option<String>,
    pub alternates: Vec<AlternateView>,
    pub side_note: Option<String>,
}

fn slot(tile: Option<&Tile>) -> SlotView {
    match tile {
        Some(tile) => SlotView {
            name: tile.display_name.clone(),
            image: Some(tile.image_ref.clone()),
            tone: Tone::Filled,
        },
        None => SlotView {
            name: EMPTY_SLOT.to_string(),
            image: None,
            tone: Tone::Idle,
        },
    }
}

fn glyph(text: &str) -> ProductBox {
    ProductBox::Glyph {
        text: text.to_string(),
    }
}

pub fn render(state: &PairState) -> View {
    let phase = state.phase();
    let (first, second) = phase.reactants();
    let mut view = View {
        phase: phase.name(),
        generation: state.generation(),
        first: slot(first),
        second: slot(second),
        product_box: glyph("?"),
        product_label: UNKNOWN_PRODUCT.to_string(),
        product_tone: Tone::Idle,
        yield_text: "0%".to_string(),
        status: STATUS_WAITING.to_string(),
        detail: None,
        alternates: Vec::new(),
        side_note: None,
    };

    match phase {
        Phase::Empty => {}
        Phase::FirstSelected { .. } => view.status = STATUS_ONE_MORE.to_string(),
        Phase::Predicting { .. } => view.status = STATUS_PREDICTING.to_string(),
        Phase::Resolved {
            products, swapped, ..
        } => {
            if let Some(primary) = state.selected_product() {
                view.product_box = ProductBox::Image {
                    url: format!("{PRODUCT_IMAGE_BASE}{}", primary.formula),
                };
                view.product_label = primary.formula.clone();
                view.product_tone = Tone::Product;
                view.yield_text = format!("{}%", primary.yield_percent());
                view.status = if *swapped {
                    format!("Selected Product: {}", primary.formula)
                } else {
                    STATUS_SUCCESS.to_string()
                };
            }
            if products.len() > 1 {
                view.alternates = state
                    .alternates()
                    .into_iter()
                    .map(|(index, p)| AlternateView {
                        index,
                        formula: p.formula.clone(),
                        image: format!("{ALTERNATE_IMAGE_BASE}{}", p.formula),
                    })
                    .collect();
            } else {
                view.side_note = Some(NO_SIDE_PRODUCTS.to_string());
            }
        }
        Phase::NoReaction { .. } => {
            view.product_box = glyph("X");
            view.product_label = "No Reaction".to_string();
            view.product_tone = Tone::Muted;
            view.status = STATUS_NO_REACTION.to_string();
        }
        Phase::Error { reason, .. } => {
            view.product_box = glyph("!");
            view.product_label = "Error".to_string();
            view.product_tone = Tone::Error;
            view.status = STATUS_ERROR.to_string();
            view.detail = Some(reason.clone());
        }
    }
    view
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} + {}", self.first.name, self.second.name)?;
        writeln!(f, "Product: {} ({})", self.product_label, self.yield_text)?;
        writeln!(f, "Status:  {}", self.status)?;
        if let Some(detail) = &self.detail {
            writeln!(f, "Detail:  {detail}")?;
        }
        if !self.alternates.is_empty() {
            let formulas: Vec<&str> = self.alternates.iter().map(|a| a.formula.as_str()).collect();
            writeln!(f, "Other products: {}", formulas.join(", "))?;
        } else if let Some(note) = &self.side_note {
            writeln!(f, "{note}")?;
        }
        Ok(())
    }
}
