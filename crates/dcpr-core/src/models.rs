pub mod conversation;
pub mod filter;
pub mod passage;

pub use conversation::{Role, Turn};
pub use filter::{
    Comparator, Comparison, FilterExpr, Operation, Operator, Predicate, PredicateOp,
    StructuredQuery,
};
pub use passage::{MetadataValue, Passage, PassageId, PassageMetadata, ScoredPassage};
