pub mod association;
pub mod dependent_record;
pub mod discipline;
pub mod division;
pub mod normalized_name;
pub mod reference;
pub mod selection;
pub mod weight_category;

pub use association::{AthleteDisciplineAssociation, Promotion, PromotionSelector, derive_current_rank};
pub use dependent_record::{DependentRecord, RecordKind, WeightSnapshot};
pub use discipline::Discipline;
pub use division::{Division, Gender, GenderParseError, infer_gender, sort_divisions};
pub use normalized_name::DisciplineName;
pub use reference::{FamilyMember, Identified, Reference, canonical_id, normalize_id};
pub use selection::{Selection, SelectionField, SelectionUpdate};
pub use weight_category::{
    WeightCategory, WeightItem, WeightUnit, WeightUnitParseError, check_item_labels,
    parse_label_limit,
};
