use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::analysis::{
    DispatchMode, ModuleContext, ResourceTable, Warning, cfg, classify, resources, select_mode,
};
use crate::emit::compile_error::CompileError;
use crate::emit::ir::{EmittedBlock, EmittedProgram};
use crate::emit::translator::{
    ProgramContext, TranslateError, TranslationRequest, Translator,
};
use crate::frontend::parser::Parser;
use crate::lang::{ClassifiedLine, Line, Program};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

/// Shared cancellation switch for an in-flight compilation.
///
/// Cloning shares the flag. Cancelling stops every translation request that
/// has not started yet; the compilation then fails with `Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Issue translation requests concurrently.
    pub parallel: bool,
    pub resource_table: ResourceTable,
    pub cancel: Option<CancelFlag>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            parallel: true,
            resource_table: ResourceTable::builtin(),
            cancel: None,
        }
    }
}

/// Output of every static pass, before any translation.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub program: Program,
    /// One entry per line, in program order.
    pub classified: Vec<ClassifiedLine>,
    pub graph: cfg::ControlFlowGraph,
    pub mode: DispatchMode,
    pub context: ModuleContext,
    pub warnings: Vec<Warning>,
}

/// A finished compilation.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub program: EmittedProgram,
    pub warnings: Vec<Warning>,
}

/// Compiler driver.
///
/// Runs parse → classify → CFG → mode selection → resource tracking, then
/// fans translation requests out to a [`Translator`] and joins the results
/// back in line order.
pub struct Compiler {
    options: CompileOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Compiler { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Runs the static passes only.
    ///
    /// # Errors
    /// Parse errors fail immediately. Classification and target errors are
    /// collected over the whole program and returned together.
    #[instrument(skip_all)]
    pub fn analyze(&self, source: &str) -> Result<Analysis, CompileError> {
        let program = Parser::new(source).parse()?;
        let (classified, mut errors) = classify::classify_all(&program);

        // unresolved targets are reported alongside classification errors
        let built = cfg::build(&program, &classified);
        let cfg::CfgAnalysis { graph, warnings } = match built {
            Ok(analysis) if errors.is_empty() => analysis,
            Ok(_) => return Err(errors.into()),
            Err(unresolved) => {
                errors.extend(unresolved);
                errors.sort_by_key(|e| e.line());
                return Err(errors.into());
            }
        };
        let mode = select_mode(&graph);
        let context = resources::track(&program, &self.options.resource_table);

        info!(
            lines = program.len(),
            edges = graph.edges().len(),
            %mode,
            resources = context.entries.len(),
            warnings = warnings.len(),
            "analysis complete"
        );

        Ok(Analysis {
            program,
            classified,
            graph,
            mode,
            context,
            warnings,
        })
    }

    /// Analyzes and translates a program.
    ///
    /// # Errors
    /// Any failed or malformed translation fails the whole compilation; so
    /// does cancellation.
    pub fn compile(
        &self,
        source: &str,
        translator: &dyn Translator,
    ) -> Result<Compilation, CompileError> {
        let analysis = self.analyze(source)?;
        self.compile_analysis(analysis, translator)
    }

    /// Translates an already analyzed program.
    #[instrument(skip_all, fields(mode = %analysis.mode))]
    pub fn compile_analysis(
        &self,
        analysis: Analysis,
        translator: &dyn Translator,
    ) -> Result<Compilation, CompileError> {
        let context = ProgramContext {
            mode: analysis.mode,
            entry: analysis.program.entry().unwrap_or_default(),
            lines: analysis.program.numbers().collect(),
            resources: analysis.context.entries.clone(),
        };

        let jobs: Vec<(&Line, &ClassifiedLine)> = analysis
            .program
            .lines()
            .iter()
            .zip(analysis.classified.iter())
            .collect();

        let translate = |(line, classified): &(&Line, &ClassifiedLine)| {
            self.translate_line(&analysis, &context, line, classified, translator)
        };

        let blocks: Vec<EmittedBlock> = if self.options.parallel {
            jobs.par_iter().map(translate).collect::<Result<_, _>>()?
        } else {
            jobs.iter().map(translate).collect::<Result<_, _>>()?
        };

        // a cancel that raced the last request still discards the result
        self.check_cancelled()?;

        info!(blocks = blocks.len(), "translation complete");

        Ok(Compilation {
            program: EmittedProgram {
                mode: analysis.mode,
                resources: analysis.context.entries,
                blocks,
            },
            warnings: analysis.warnings,
        })
    }

    fn translate_line(
        &self,
        analysis: &Analysis,
        context: &ProgramContext,
        line: &Line,
        classified: &ClassifiedLine,
        translator: &dyn Translator,
    ) -> Result<EmittedBlock, CompileError> {
        self.check_cancelled()?;

        let init = analysis.context.requirement(line.number);
        let request = TranslationRequest {
            line,
            control_shape: &classified.shape,
            error_handler_update: classified.error_handler_update,
            init_requirement: init,
            successor: analysis.program.successor(line.number),
            program_context: context,
        };

        let translation = translator
            .translate(&request)
            .and_then(|t| {
                if t.statements.is_empty() && !line.text.is_empty() {
                    Err(TranslateError::Malformed("no statements returned".to_string()))
                } else {
                    Ok(t)
                }
            })
            .map_err(|source| CompileError::Translation {
                line: line.number,
                source,
            })?;

        debug!(line = line.number, statements = translation.statements.len(), "line translated");

        Ok(EmittedBlock {
            line: line.clone(),
            shape: classified.shape.clone(),
            error_handler_update: classified.error_handler_update,
            init: init.clone(),
            statements: translation.statements,
        })
    }

    fn check_cancelled(&self) -> Result<(), CompileError> {
        match &self.options.cancel {
            Some(flag) if flag.is_cancelled() => Err(CompileError::Cancelled),
            _ => Ok(()),
        }
    }
}
