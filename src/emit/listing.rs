use std::collections::BTreeSet;
use std::fmt;

use crate::emit::ir::{EmittedBlock, EmittedProgram};
use crate::lang::{ControlShape, LineNumber};

/// Print the listing of an emitted program.
pub fn print_listing(program: &EmittedProgram) {
    print!("{}", Listing(program));
}

/// Render an emitted program as a dispatch-table listing.
pub fn render_listing(program: &EmittedProgram) -> String {
    Listing(program).to_string()
}

/// Dispatch-table view of an emitted program.
///
/// Lines that some transfer can land on are marked with `►`.
pub struct Listing<'a>(pub &'a EmittedProgram);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.0;
        let targets = collect_targets(program);

        writeln!(f, "════════════════════════════════════════")?;
        writeln!(f, " mode: {}", program.mode)?;
        writeln!(f, " {} blocks", program.blocks.len())?;
        if !program.resources.is_empty() {
            writeln!(f, " resources:")?;
            for r in &program.resources {
                writeln!(f, "   {:<12} init at line {}", r.resource_key, r.first_use_line)?;
            }
        }
        writeln!(f, "════════════════════════════════════════")?;

        for block in &program.blocks {
            write_block(f, block, targets.contains(&block.number()))?;
        }

        Ok(())
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &EmittedBlock, is_target: bool) -> fmt::Result {
    if is_target {
        writeln!(f, "      ┌──────────────────────────────────")?;
    }

    let marker = if is_target { "► " } else { "  " };
    write!(f, "{:05} {}{:<10}", block.number(), marker, block.shape.name())?;

    match &block.shape {
        ControlShape::UnconditionalJump { target } | ControlShape::Call { target } => {
            write!(f, " -> {}", target)?;
        }
        ControlShape::ConditionalJump { target, predicate } => {
            write!(f, " -> {} when ({})", target, predicate)?;
        }
        ControlShape::Fallthrough | ControlShape::Return => {}
    }
    if let Some(handler) = block.error_handler_update {
        write!(f, " [on error -> {}]", handler)?;
    }
    if block.init.resource_key().is_some() {
        write!(f, " [{}]", block.init)?;
    }
    writeln!(f)?;

    for stmt in &block.statements {
        writeln!(f, "        {}", stmt)?;
    }

    Ok(())
}

fn collect_targets(program: &EmittedProgram) -> BTreeSet<LineNumber> {
    let mut targets = BTreeSet::new();

    for block in &program.blocks {
        targets.extend(block.shape.target());
        targets.extend(block.error_handler_update);

        // where a call resumes
        if matches!(block.shape, ControlShape::Call { .. }) {
            targets.extend(program.successor(block.number()));
        }
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::compile::Compiler;
    use crate::emit::translator::EchoTranslator;
    use indoc::indoc;

    fn listing(source: &str) -> String {
        let compilation = Compiler::new()
            .compile(source, &EchoTranslator)
            .expect("compile failed");
        render_listing(&compilation.program)
    }

    #[test]
    fn test_listing_marks_targets() {
        let out = listing(indoc! {r#"
            10 goto 40
            20 print "skip"
            40 print "here"
        "#});

        assert!(out.contains("mode: dispatch"));
        assert!(out.contains("00010   goto"));
        assert!(out.contains("00040 ► fallthrough"));
        assert!(out.contains("next_line = 40"));
    }

    #[test]
    fn test_listing_marks_call_resume_point() {
        let out = listing("10 call 30\n20 print back\n30 return");
        assert!(out.contains("00020 ► "));
        assert!(out.contains("00030 ► return"));
    }

    #[test]
    fn test_listing_display_matches_render() {
        let compilation = Compiler::new()
            .compile("10 goto 30\n20 skipped\n30 done", &EchoTranslator)
            .expect("compile failed");

        let shown = format!("{}", Listing(&compilation.program));
        assert_eq!(shown, render_listing(&compilation.program));
        assert!(shown.contains("00030 ► fallthrough"));
    }

    #[test]
    fn test_listing_shows_resources() {
        let out = listing("10 (redis) get\n20 (redis) set");
        assert!(out.contains("mode: linear"));
        assert!(out.contains("redis"));
        assert!(out.contains("init at line 10"));
        assert!(out.contains("[init redis]"));
        assert!(out.contains("[reuse redis]"));
    }
}
