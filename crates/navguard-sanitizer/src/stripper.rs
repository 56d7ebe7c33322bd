//! Whole-statement removal of navigation-redirect assignments.
//!
//! Every statement list in the tree (program body, blocks, function bodies,
//! switch cases, static blocks) is scanned one element at a time. An element
//! that contains a matching assignment, outside any statement list nested
//! inside it, is removed from its list by index. Matches inside nested lists
//! are removed at that inner level instead, so `if (ok) { location = x; }`
//! keeps the `if` and loses only the inner statement.
//!
//! Single-statement slots (`if` branches, loop bodies, `with` and label
//! bodies) have no list to remove from. A matching slot is replaced with an
//! empty block, so `if (c) location = x; else run();` keeps its test and its
//! `else` branch.

use oxc_allocator::{Allocator, Vec as ArenaVec};
use oxc_ast::ast::{
    ArrowFunctionExpression, AssignmentExpression, DoWhileStatement, ForInStatement,
    ForOfStatement, ForStatement, IfStatement, LabeledStatement, Program, Statement,
    WhileStatement, WithStatement,
};
use oxc_ast::AstBuilder;
use oxc_ast_visit::{walk_mut, VisitMut};
use oxc_span::GetSpan;

use crate::classifier::NavigationClassifier;

/// Tree pass that deletes statements writing the navigation location.
pub struct NavigationStripper<'a, 'c> {
    classifier: &'c NavigationClassifier,
    ast: AstBuilder<'a>,
    /// Set when a match is seen in the statement currently being scanned.
    pending: bool,
    removed: usize,
}

impl<'a, 'c> NavigationStripper<'a, 'c> {
    /// Create a pass driven by `classifier`. Replacement nodes are allocated
    /// in `allocator`, which must own the tree being stripped.
    pub fn new(classifier: &'c NavigationClassifier, allocator: &'a Allocator) -> Self {
        Self {
            classifier,
            ast: AstBuilder::new(allocator),
            pending: false,
            removed: 0,
        }
    }

    /// Strip `program` in place and return how many statements were removed.
    pub fn strip(mut self, program: &mut Program<'a>) -> usize {
        self.visit_program(program);
        self.removed
    }

    fn statement_writes_location(&mut self, stmt: &mut Statement<'a>) -> bool {
        let outer = std::mem::replace(&mut self.pending, false);
        self.visit_statement(stmt);
        std::mem::replace(&mut self.pending, outer)
    }

    /// Empty a single-statement slot whose statement writes the location.
    fn strip_slot(&mut self, slot: &mut Statement<'a>) {
        if self.statement_writes_location(slot) {
            let span = slot.span();
            tracing::debug!(
                start = span.start,
                end = span.end,
                "emptying navigation-redirect statement slot"
            );
            *slot = self.ast.statement_block(span, self.ast.vec());
            self.removed += 1;
        }
    }
}

impl<'a> VisitMut<'a> for NavigationStripper<'a, '_> {
    fn visit_statements(&mut self, it: &mut ArenaVec<'a, Statement<'a>>) {
        let mut index = 0;
        while index < it.len() {
            if self.statement_writes_location(&mut it[index]) {
                let span = it[index].span();
                tracing::debug!(
                    start = span.start,
                    end = span.end,
                    "removing navigation-redirect statement"
                );
                it.remove(index);
                self.removed += 1;
            } else {
                index += 1;
            }
        }
    }

    // Heads are visited normally: a match there still removes the whole
    // statement. Bodies are slots.

    fn visit_if_statement(&mut self, it: &mut IfStatement<'a>) {
        self.visit_expression(&mut it.test);
        self.strip_slot(&mut it.consequent);
        if let Some(alternate) = &mut it.alternate {
            self.strip_slot(alternate);
        }
    }

    fn visit_while_statement(&mut self, it: &mut WhileStatement<'a>) {
        self.visit_expression(&mut it.test);
        self.strip_slot(&mut it.body);
    }

    fn visit_do_while_statement(&mut self, it: &mut DoWhileStatement<'a>) {
        self.strip_slot(&mut it.body);
        self.visit_expression(&mut it.test);
    }

    fn visit_for_statement(&mut self, it: &mut ForStatement<'a>) {
        if let Some(init) = &mut it.init {
            self.visit_for_statement_init(init);
        }
        if let Some(test) = &mut it.test {
            self.visit_expression(test);
        }
        if let Some(update) = &mut it.update {
            self.visit_expression(update);
        }
        self.strip_slot(&mut it.body);
    }

    fn visit_for_in_statement(&mut self, it: &mut ForInStatement<'a>) {
        self.visit_for_statement_left(&mut it.left);
        self.visit_expression(&mut it.right);
        self.strip_slot(&mut it.body);
    }

    fn visit_for_of_statement(&mut self, it: &mut ForOfStatement<'a>) {
        self.visit_for_statement_left(&mut it.left);
        self.visit_expression(&mut it.right);
        self.strip_slot(&mut it.body);
    }

    fn visit_with_statement(&mut self, it: &mut WithStatement<'a>) {
        self.visit_expression(&mut it.object);
        self.strip_slot(&mut it.body);
    }

    fn visit_labeled_statement(&mut self, it: &mut LabeledStatement<'a>) {
        self.strip_slot(&mut it.body);
    }

    fn visit_assignment_expression(&mut self, it: &mut AssignmentExpression<'a>) {
        if self.classifier.is_navigation_write(&it.left) {
            self.pending = true;
        }
        walk_mut::walk_assignment_expression(self, it);
    }

    fn visit_arrow_function_expression(&mut self, it: &mut ArrowFunctionExpression<'a>) {
        walk_mut::walk_arrow_function_expression(self, it);
        // `() => location = x` loses its only statement; print it as `() => {}`.
        if it.expression && it.body.statements.is_empty() {
            it.expression = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    /// Returns (removed count, generated code).
    fn strip(source: &str) -> (usize, String) {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
        assert!(ret.errors.is_empty(), "test input must parse: {source}");
        let mut program = ret.program;
        let classifier = NavigationClassifier::default();
        let removed = NavigationStripper::new(&classifier, &allocator).strip(&mut program);
        (removed, Codegen::new().build(&program).code)
    }

    #[test]
    fn removes_top_level_statements() {
        let (removed, code) = strip("a();\nlocation = \"x\";\nb();\nwindow.location.href = \"y\";\n");
        assert_eq!(removed, 2);
        assert!(!code.contains("location"), "got: {code}");
        assert!(code.contains("a()"));
        assert!(code.contains("b()"));
    }

    #[test]
    fn keeps_sibling_order() {
        let (_, code) = strip("first();\nlocation.href = \"x\";\nsecond();\n");
        let first = code.find("first()").unwrap();
        let second = code.find("second()").unwrap();
        assert!(first < second);
    }

    #[test]
    fn removes_inside_nested_blocks_only() {
        let (removed, code) = strip("if (ok) { location = \"x\"; keep(); }\nafter();\n");
        assert_eq!(removed, 1);
        assert!(code.contains("if (ok)"), "got: {code}");
        assert!(code.contains("keep()"));
        assert!(code.contains("after()"));
        assert!(!code.contains("location"));
    }

    #[test]
    fn removes_inside_function_bodies() {
        let (removed, code) =
            strip("function go() {\n  prepare();\n  this.location = \"x\";\n}\ngo();\n");
        assert_eq!(removed, 1);
        assert!(code.contains("function go()"));
        assert!(code.contains("prepare()"));
        assert!(!code.contains("location"));
    }

    #[test]
    fn unbraced_slot_becomes_empty_block() {
        let (removed, code) = strip("if (c) location = \"x\";\nother();\n");
        assert_eq!(removed, 1);
        assert!(!code.contains("location"), "got: {code}");
        assert!(code.contains("if (c)"), "got: {code}");
        assert!(code.contains("other()"));
    }

    #[test]
    fn else_branch_survives_emptied_consequent() {
        let (removed, code) = strip("if (c) location = \"x\";\nelse safe();\n");
        assert_eq!(removed, 1);
        assert!(!code.contains("location"), "got: {code}");
        assert!(code.contains("if (c)"), "got: {code}");
        assert!(code.contains("else"), "got: {code}");
        assert!(code.contains("safe()"), "got: {code}");
    }

    #[test]
    fn loop_bodies_are_emptied_not_removed() {
        for source in [
            "while (next()) location.href = \"x\";\n",
            "do window.location = \"x\"; while (next());\n",
            "for (let i = 0; i < n; i++) location = i;\n",
            "for (const k in o) location = k;\n",
            "for (const v of list) location = v;\n",
        ] {
            let (removed, code) = strip(source);
            assert_eq!(removed, 1, "source: {source}");
            assert!(!code.contains("location"), "got: {code}");
            assert!(code.contains("next()") || code.contains("for ("), "got: {code}");
        }
    }

    #[test]
    fn labeled_body_is_emptied() {
        let (removed, code) = strip("outer: location = \"x\";\nrest();\n");
        assert_eq!(removed, 1);
        assert!(code.contains("outer:"), "got: {code}");
        assert!(!code.contains("location"), "got: {code}");
    }

    #[test]
    fn match_in_statement_head_removes_whole_statement() {
        let (removed, code) = strip("if (location = \"x\") run();\nafter();\n");
        assert_eq!(removed, 1);
        assert!(!code.contains("run()"), "got: {code}");
        assert!(code.contains("after()"));
    }

    #[test]
    fn chained_assignment_removes_statement() {
        let (removed, code) = strip("a = location.href = \"x\";\n");
        assert_eq!(removed, 1);
        assert!(!code.contains("location"));
    }

    #[test]
    fn expression_arrow_becomes_empty_block() {
        let (removed, code) = strip("const go = () => location.href = \"x\";\ngo();\n");
        assert_eq!(removed, 1);
        assert!(code.contains("const go = () =>"), "got: {code}");
        assert!(code.contains("{}"), "got: {code}");
        assert!(!code.contains("location"));
    }

    #[test]
    fn switch_case_statements_are_scanned() {
        let (removed, code) =
            strip("switch (k) {\n  case 1:\n    location = \"x\";\n    break;\n}\n");
        assert_eq!(removed, 1);
        assert!(code.contains("break"));
        assert!(!code.contains("location"));
    }

    #[test]
    fn clean_program_reports_zero() {
        let (removed, _) = strip("const x = 5; console.log(\"ok\");");
        assert_eq!(removed, 0);
    }
}
