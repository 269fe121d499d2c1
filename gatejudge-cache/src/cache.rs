use lazy_static::lazy_static;
use std::sync::{PoisonError, RwLock};
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref LABELS: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Intern a screen label and return its stable id
pub fn intern_label(s: &str) -> usize {
    let atom = Atom::from(s);
    let mut labels = LABELS.write().unwrap_or_else(PoisonError::into_inner);
    match labels.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            labels.push(atom);
            labels.len() - 1
        }
    }
}

pub fn label(id: usize) -> Option<Atom> {
    LABELS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(id)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern_label("Play video");
        let b = intern_label("Watch again");
        assert_ne!(a, b);
        assert_eq!(intern_label("Play video"), a);
        assert_eq!(label(b).as_deref(), Some("Watch again"));
        assert!(label(usize::MAX).is_none());
    }
}
