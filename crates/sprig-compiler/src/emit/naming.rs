//! Result name assignment.

use sprig_core::Function;

/// Pick the name for a new instruction result.
///
/// Empty names leave the value unnamed. A name already taken in the
/// function, by a value or a block label, gets the first free numeric
/// suffix (`result`, `result1`, ...).
pub(crate) fn unique_name(function: &Function, requested: &str) -> Option<String> {
    if requested.is_empty() {
        return None;
    }
    let taken =
        |name: &str| function.has_local_named(name) || function.block_by_label(name).is_some();
    if !taken(requested) {
        return Some(requested.to_string());
    }
    (1u32..)
        .map(|n| format!("{requested}{n}"))
        .find(|candidate| !taken(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::{LocalDef, Linkage, Signature, primitives};

    fn func_with(names: &[&str]) -> Function {
        let mut f = Function::new(
            "f",
            Signature::new(primitives::VOID, vec![], false),
            Linkage::External,
        );
        for name in names {
            f.add_local(Some(name.to_string()), primitives::I32, LocalDef::Param(0));
        }
        f
    }

    #[test]
    fn empty_is_unnamed() {
        assert_eq!(unique_name(&func_with(&[]), ""), None);
    }

    #[test]
    fn free_name_kept() {
        assert_eq!(unique_name(&func_with(&["x"]), "result"), Some("result".into()));
    }

    #[test]
    fn taken_name_suffixed() {
        let f = func_with(&["result", "result1"]);
        assert_eq!(unique_name(&f, "result"), Some("result2".into()));
    }

    #[test]
    fn block_label_is_taken() {
        let mut f = func_with(&[]);
        f.add_block("loop");
        assert_eq!(unique_name(&f, "loop"), Some("loop1".into()));
    }
}
