//! Per-run interpreter state
//!
//! Everything derived from the sketch text lives in one [`InterpreterState`]
//! value that is rebuilt from scratch on every start, so nothing from a
//! previous run (functions, globals, statement sequences) can leak into the
//! next one.

use crate::memory::Scopes;
use crate::parser::ast::{Block, Function};
use crate::parser::extract::extract;
use crate::parser::statements::lower_block;
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct InterpreterState {
    pub scopes: Scopes,
    pub functions: FxHashMap<String, Rc<Function>>,
    pub setup: Block,
    pub loop_body: Block,
}

impl InterpreterState {
    /// Extract and lower a sketch. Never fails; missing pieces are empty.
    pub fn parse(source: &str) -> Self {
        let sketch = extract(source);
        let functions = sketch
            .functions
            .iter()
            .map(|f| {
                let function = Function {
                    name: f.name.clone(),
                    params: f.params.clone(),
                    body: lower_block(&f.body),
                    location: f.location,
                };
                (f.name.clone(), Rc::new(function))
            })
            .collect();

        InterpreterState {
            scopes: Scopes::new(sketch.globals),
            functions,
            setup: lower_block(&sketch.setup),
            loop_body: lower_block(&sketch.loop_body),
        }
    }

    pub fn empty() -> Self {
        InterpreterState {
            scopes: Scopes::default(),
            functions: FxHashMap::default(),
            setup: Rc::from(Vec::new()),
            loop_body: Rc::from(Vec::new()),
        }
    }
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Value;
    use crate::parser::ast::StmtKind;

    #[test]
    fn test_parse_builds_everything() {
        let state = InterpreterState::parse(
            "int led = 2;\n\
             void setup() { pinMode(led, OUTPUT); }\n\
             void loop() { toggle(); delay(100); }\n\
             void toggle() { digitalWrite(led, !digitalRead(led)); }\n",
        );
        assert_eq!(state.scopes.lookup("led"), Some(&Value::Number(2.0)));
        assert_eq!(state.setup.len(), 1);
        assert_eq!(state.loop_body.len(), 2);
        assert!(matches!(state.loop_body[0].kind, StmtKind::Call { .. }));
        let toggle = state.functions.get("toggle").map(|f| f.body.len());
        assert_eq!(toggle, Some(1));
    }

    #[test]
    fn test_garbage_parses_to_nothing() {
        let state = InterpreterState::parse("}{ not a sketch ((");
        assert!(state.setup.is_empty());
        assert!(state.loop_body.is_empty());
        assert!(state.functions.is_empty());
    }
}
