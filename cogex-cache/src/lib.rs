mod cache;

pub use cache::{Atom, StimulusCatalog};
