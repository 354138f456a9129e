use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::models::DisciplineName;

/// A dependent part of a classification selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SelectionField {
    Division,
    Weight,
}

impl fmt::Display for SelectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionField::Division => f.write_str("division"),
            SelectionField::Weight => f.write_str("weight"),
        }
    }
}

/// The discipline → division → weight choice a caller is building up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct Selection {
    pub discipline_name: String,
    pub division_id: Option<String>,
    pub weight_item_id: Option<String>,
}

/// Result of changing an upstream part of a selection. `invalidated` lists
/// every dependent field that held a value and was reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectionUpdate {
    pub selection: Selection,
    pub invalidated: Vec<SelectionField>,
}

impl SelectionUpdate {
    pub fn is_invalidated(&self) -> bool {
        !self.invalidated.is_empty()
    }
}

impl Selection {
    pub fn new(discipline_name: impl Into<String>) -> Self {
        Self {
            discipline_name: discipline_name.into(),
            division_id: None,
            weight_item_id: None,
        }
    }

    /// Changing the discipline resets both the division and the weight.
    /// Re-selecting the same discipline (compared case-insensitively) keeps them.
    pub fn change_discipline(&self, discipline_name: &str) -> SelectionUpdate {
        if DisciplineName::new(&self.discipline_name).matches(discipline_name) {
            return SelectionUpdate {
                selection: self.clone(),
                invalidated: Vec::new(),
            };
        }

        let mut invalidated = Vec::new();
        if self.division_id.is_some() {
            invalidated.push(SelectionField::Division);
        }
        if self.weight_item_id.is_some() {
            invalidated.push(SelectionField::Weight);
        }

        SelectionUpdate {
            selection: Selection::new(discipline_name),
            invalidated,
        }
    }

    /// Changing the division resets only the weight.
    pub fn change_division(&self, division_id: Option<&str>) -> SelectionUpdate {
        if self.division_id.as_deref() == division_id {
            return SelectionUpdate {
                selection: self.clone(),
                invalidated: Vec::new(),
            };
        }

        let invalidated = if self.weight_item_id.is_some() {
            vec![SelectionField::Weight]
        } else {
            Vec::new()
        };

        SelectionUpdate {
            selection: Selection {
                discipline_name: self.discipline_name.clone(),
                division_id: division_id.map(String::from),
                weight_item_id: None,
            },
            invalidated,
        }
    }

    pub fn select_weight(&self, weight_item_id: Option<&str>) -> Selection {
        Selection {
            weight_item_id: weight_item_id.map(String::from),
            ..self.clone()
        }
    }
}
