use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Tile;
use crate::prediction::{PredictionError, PredictionRequest, PredictionResponse};
use crate::products::{effective_products, CandidateProduct, ProductSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Empty,
    FirstSelected {
        first: Tile,
    },
    Predicting {
        first: Tile,
        second: Tile,
    },
    Resolved {
        first: Tile,
        second: Tile,
        products: ProductSet,
        selected: usize,
        swapped: bool,
    },
    NoReaction {
        first: Tile,
        second: Tile,
    },
    Error {
        first: Tile,
        second: Tile,
        reason: String,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Empty => "empty",
            Phase::FirstSelected { .. } => "first_selected",
            Phase::Predicting { .. } => "predicting",
            Phase::Resolved { .. } => "resolved",
            Phase::NoReaction { .. } => "no_reaction",
            Phase::Error { .. } => "error",
        }
    }

    pub fn reactants(&self) -> (Option<&Tile>, Option<&Tile>) {
        match self {
            Phase::Empty => (None, None),
            Phase::FirstSelected { first } => (Some(first), None),
            Phase::Predicting { first, second }
            | Phase::Resolved { first, second, .. }
            | Phase::NoReaction { first, second }
            | Phase::Error { first, second, .. } => (Some(first), Some(second)),
        }
    }
}

/// State of the current reactant pair. Transitions never mutate in place;
/// each one returns the next value.
///
/// `generation` advances on every reset, so a prediction issued for an
/// older pair can be recognised and dropped when it completes.
#[derive(Debug, Clone, PartialEq)]
pub struct PairState {
    generation: u64,
    phase: Phase,
}

/// A prediction the caller must perform, tagged with the pair generation
/// that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPrediction {
    pub generation: u64,
    pub request: PredictionRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PairState,
    pub prediction: Option<PendingPrediction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("no resolved products to choose from")]
    NotResolved,
    #[error("product {index} is outside the current set of {len}")]
    UnknownProduct { index: usize, len: usize },
}

impl Default for PairState {
    fn default() -> Self {
        PairState::new()
    }
}

impl PairState {
    pub fn new() -> Self {
        PairState {
            generation: 0,
            phase: Phase::Empty,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    fn with_phase(&self, phase: Phase) -> PairState {
        PairState {
            generation: self.generation,
            phase,
        }
    }

    /// Handles a tile click. Once both slots are full, a click resets the
    /// pair and the clicked tile becomes the new first reactant.
    pub fn select(&self, tile: &Tile) -> Transition {
        match &self.phase {
            Phase::Empty => {
                debug!(identifier = %tile.identifier, "first reactant selected");
                Transition {
                    state: self.with_phase(Phase::FirstSelected { first: tile.clone() }),
                    prediction: None,
                }
            }
            Phase::FirstSelected { first } => {
                let request = PredictionRequest::from_identifiers(&first.identifier, &tile.identifier);
                info!(
                    element_a = %request.element_a,
                    element_b = %request.element_b,
                    generation = self.generation,
                    "pair complete, requesting prediction"
                );
                Transition {
                    state: self.with_phase(Phase::Predicting {
                        first: first.clone(),
                        second: tile.clone(),
                    }),
                    prediction: Some(PendingPrediction {
                        generation: self.generation,
                        request,
                    }),
                }
            }
            _ => {
                debug!(phase = self.phase.name(), "pair full, starting over");
                self.reset().select(tile)
            }
        }
    }

    /// Clears both slots and the product set.
    pub fn reset(&self) -> PairState {
        PairState {
            generation: self.generation.wrapping_add(1),
            phase: Phase::Empty,
        }
    }

    /// Applies a finished prediction. Results for a pair that has since
    /// been reset, or that arrive outside `Predicting`, leave the state as is.
    pub fn resolve(
        &self,
        pending: &PendingPrediction,
        outcome: Result<PredictionResponse, PredictionError>,
    ) -> PairState {
        let (first, second) = match &self.phase {
            Phase::Predicting { first, second } if pending.generation == self.generation => {
                (first.clone(), second.clone())
            }
            _ => {
                debug!(
                    stale = pending.generation,
                    current = self.generation,
                    phase = self.phase.name(),
                    "discarding prediction for an old pair"
                );
                return self.clone();
            }
        };

        let candidates = match outcome {
            Ok(response) => response.stable_products.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "prediction failed");
                return self.with_phase(Phase::Error {
                    first,
                    second,
                    reason: err.to_string(),
                });
            }
        };

        let request = &pending.request;
        match effective_products(candidates, &request.element_a, &request.element_b) {
            Ok(Some(products)) => {
                info!(
                    count = products.len(),
                    primary = products.get(0).map(|p| p.formula.as_str()).unwrap_or_default(),
                    "reaction resolved"
                );
                self.with_phase(Phase::Resolved {
                    first,
                    second,
                    products,
                    selected: 0,
                    swapped: false,
                })
            }
            Ok(None) => {
                info!("no reaction");
                self.with_phase(Phase::NoReaction { first, second })
            }
            Err(err) => {
                warn!(error = %err, "could not build reactant patterns");
                self.with_phase(Phase::Error {
                    first,
                    second,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Promotes another member of the current product set to primary.
    pub fn swap(&self, index: usize) -> Result<PairState, ControllerError> {
        let Phase::Resolved {
            first,
            second,
            products,
            ..
        } = &self.phase
        else {
            return Err(ControllerError::NotResolved);
        };
        if products.get(index).is_none() {
            return Err(ControllerError::UnknownProduct {
                index,
                len: products.len(),
            });
        }
        Ok(self.with_phase(Phase::Resolved {
            first: first.clone(),
            second: second.clone(),
            products: products.clone(),
            selected: index,
            swapped: true,
        }))
    }

    pub fn selected_product(&self) -> Option<&CandidateProduct> {
        match &self.phase {
            Phase::Resolved {
                products, selected, ..
            } => products.get(*selected),
            _ => None,
        }
    }

    /// Every product whose formula differs from the primary one, with its
    /// index in the product set.
    pub fn alternates(&self) -> Vec<(usize, &CandidateProduct)> {
        let Some(primary) = self.selected_product() else {
            return Vec::new();
        };
        let Phase::Resolved { products, .. } = &self.phase else {
            return Vec::new();
        };
        products
            .iter()
            .enumerate()
            .filter(|(_, p)| p.formula != primary.formula)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn tile(id: &str) -> Tile {
        Tile::new(id, format!("{id} tile"), format!("img/{id}"))
    }

    fn products(list: &[(&str, f64)]) -> PredictionResponse {
        PredictionResponse {
            stable_products: Some(
                list.iter()
                    .map(|&(f, e)| CandidateProduct::new(f, e))
                    .collect(),
            ),
            ..PredictionResponse::default()
        }
    }

    fn predicting(a: &str, b: &str) -> (PairState, PendingPrediction) {
        let first = PairState::new().select(&tile(a));
        let second = first.state.select(&tile(b));
        (second.state, second.prediction.expect("prediction issued"))
    }

    #[test]
    fn first_click_fills_slot_one_without_request() {
        let t = PairState::new().select(&tile("Mg"));
        assert!(t.prediction.is_none());
        assert_eq!(
            t.state.phase(),
            &Phase::FirstSelected { first: tile("Mg") }
        );
    }

    #[test]
    fn second_click_requests_digit_stripped_pair() {
        let (state, pending) = predicting("Mg", "O2");
        assert_eq!(state.phase().name(), "predicting");
        assert_eq!(pending.request.element_a, "Mg");
        assert_eq!(pending.request.element_b, "O");
        assert_eq!(pending.generation, state.generation());
    }

    #[test]
    fn magnesium_oxide_scenario() {
        let (state, pending) = predicting("Mg", "O2");
        let state = state.resolve(&pending, Ok(products(&[("MgO", -1.2)])));
        let primary = state.selected_product().expect("primary");
        assert_eq!(primary.formula, "MgO");
        assert_eq!(primary.yield_percent(), 98);
        assert!(state.alternates().is_empty());
    }

    #[test]
    fn bare_only_response_keeps_everything() {
        let (state, pending) = predicting("Mg", "K");
        let state = state.resolve(&pending, Ok(products(&[("Mg", 0.0), ("K", 0.0)])));
        assert_eq!(state.selected_product().map(|p| p.formula.as_str()), Some("Mg"));
        let alternates: Vec<&str> = state
            .alternates()
            .into_iter()
            .map(|(_, p)| p.formula.as_str())
            .collect();
        assert_eq!(alternates, vec!["K"]);
    }

    #[test]
    fn leftovers_are_dropped_when_a_compound_forms() {
        let (state, pending) = predicting("Na", "Cl2");
        let state = state.resolve(
            &pending,
            Ok(products(&[("Cl2", 0.0), ("NaCl", -2.0), ("Na", 0.0), ("NaCl3", -0.4)])),
        );
        let Phase::Resolved { products, .. } = state.phase() else {
            panic!("expected resolved, got {}", state.phase().name());
        };
        let formulas: Vec<&str> = products.iter().map(|p| p.formula.as_str()).collect();
        assert_eq!(formulas, vec!["NaCl", "NaCl3"]);
    }

    #[test]
    fn empty_or_absent_products_mean_no_reaction() {
        let (state, pending) = predicting("He", "Ne");
        let empty = state.resolve(&pending, Ok(products(&[])));
        assert_eq!(empty.phase().name(), "no_reaction");

        let absent = state.resolve(&pending, Ok(PredictionResponse::default()));
        assert_eq!(absent.phase().name(), "no_reaction");
    }

    #[test]
    fn service_failure_is_an_error_state() {
        let (state, pending) = predicting("Fe", "S");
        let state = state.resolve(
            &pending,
            Err(PredictionError::Status(StatusCode::BAD_GATEWAY)),
        );
        let Phase::Error { reason, .. } = state.phase() else {
            panic!("expected error, got {}", state.phase().name());
        };
        assert!(reason.contains("502"));
    }

    #[test]
    fn click_after_resolution_starts_new_pair() {
        let (state, pending) = predicting("Mg", "O2");
        let resolved = state.resolve(&pending, Ok(products(&[("MgO", -1.2)])));

        let t = resolved.select(&tile("Na"));
        assert!(t.prediction.is_none());
        assert_eq!(t.state.phase(), &Phase::FirstSelected { first: tile("Na") });
        assert!(t.state.generation() > resolved.generation());
        assert!(t.state.selected_product().is_none());
    }

    #[test]
    fn late_response_after_reset_is_ignored() {
        let (state, pending) = predicting("Mg", "O2");
        let restarted = state.select(&tile("Na")).state;
        let after = restarted.resolve(&pending, Ok(products(&[("MgO", -1.2)])));
        assert_eq!(after, restarted);

        // Same phase shape again, but a newer generation.
        let again = restarted.select(&tile("Cl2")).state;
        let stale = again.resolve(&pending, Ok(products(&[("MgO", -1.2)])));
        assert_eq!(stale.phase().name(), "predicting");
    }

    #[test]
    fn swap_promotes_alternate() {
        let (state, pending) = predicting("Fe", "O2");
        let resolved = state.resolve(
            &pending,
            Ok(products(&[("FeO", -1.0), ("Fe2O3", -1.7), ("Fe3O4", -1.6)])),
        );
        let swapped = resolved.swap(1).expect("swap");
        assert_eq!(swapped.selected_product().map(|p| p.formula.as_str()), Some("Fe2O3"));
        assert_eq!(swapped.selected_product().map(|p| p.yield_percent()), Some(100));
        let alternates: Vec<usize> = swapped.alternates().into_iter().map(|(i, _)| i).collect();
        assert_eq!(alternates, vec![0, 2]);
        assert_eq!(swapped.generation(), resolved.generation());
    }

    #[test]
    fn swap_rejects_bad_requests() {
        assert_eq!(PairState::new().swap(0), Err(ControllerError::NotResolved));

        let (state, pending) = predicting("Mg", "O2");
        let resolved = state.resolve(&pending, Ok(products(&[("MgO", -1.2)])));
        assert_eq!(
            resolved.swap(3),
            Err(ControllerError::UnknownProduct { index: 3, len: 1 })
        );
    }
}
